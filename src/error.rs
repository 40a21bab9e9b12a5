// src/error.rs

use std::io;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the calculation core.
///
/// Only `InvalidRange` and `UnresolvableLocalTime` abort a run; the remaining
/// variants describe a single group that is skipped by its caller.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("end instant {end} precedes start instant {start}")]
    InvalidRange { start: String, end: String },

    #[error("local time {time} does not resolve to a single instant in {tz}")]
    UnresolvableLocalTime { time: NaiveDateTime, tz: Tz },

    #[error("volume-weighted median requested for an empty group")]
    EmptyInput,

    #[error("volume-weighted median requested for a group with total size {0}")]
    NonPositiveVolume(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed trade batch for {date}: {source}")]
    Malformed {
        date: NaiveDate,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether another attempt at the same read could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Io { .. } | SourceError::Http { .. } => true,
            SourceError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            SourceError::Malformed { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("index output {0} is written by more than one run")]
    SharedOutput(PathBuf),

    #[error("failed to serialize output frame: {0}")]
    Polars(#[from] PolarsError),
}
