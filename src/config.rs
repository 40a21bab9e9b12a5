// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_WINDOW_LENGTH_MINUTES: u32 = 60;
pub const DEFAULT_PARTITION_LENGTH_MINUTES: u32 = 5;
pub const DEFAULT_PED_PARAMETER: f64 = 10.0;
pub const DEFAULT_CLOSE_HOUR: u32 = 16;

/// Exchanges are only removed from a window once at least this many are flagged.
/// A single flagged exchange is reported but kept.
pub const MIN_EXCLUDED_FOR_REMOVAL: usize = 2;

pub const MAX_RETRIES: u32 = 5;
pub const BASE_BACKOFF_MS: u64 = 1000;
pub const MAX_CONCURRENT_READS: usize = 8;
pub const REQUESTS_PER_SECOND: u32 = 10;
pub const MAX_BURST_REQUESTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Days,
    Hours,
    Minutes,
}

impl Frequency {
    pub fn unit_seconds(&self) -> i64 {
        match self {
            Frequency::Days => 86_400,
            Frequency::Hours => 3_600,
            Frequency::Minutes => 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    pub index: IndexSpec,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub calculation: CalculationConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSpec {
    pub asset: String,
    pub quote: String,
}

impl IndexSpec {
    /// Published name of the index, e.g. `LTCUSD_RR`.
    pub fn name(&self) -> String {
        format!("{}{}_RR", self.asset.to_uppercase(), self.quote.to_uppercase())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub freq: Frequency,
    pub tz: Tz,
    #[serde(default = "default_close_hour")]
    pub close: u32,
}

/// Parameters of the per-instant computation. Everything the pure pipeline
/// needs and nothing it doesn't.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalculationConfig {
    #[serde(default = "default_window_length")]
    pub window_length: u32,
    #[serde(default = "default_partition_length")]
    pub partition_length: u32,
    #[serde(default = "default_ped_parameter")]
    pub ped_parameter: f64,
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default)]
    pub exclude_flagged: bool,
    #[serde(default)]
    pub save_first_last: bool,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        CalculationConfig {
            window_length: DEFAULT_WINDOW_LENGTH_MINUTES,
            partition_length: DEFAULT_PARTITION_LENGTH_MINUTES,
            ped_parameter: DEFAULT_PED_PARAMETER,
            markets: Vec::new(),
            exclude_flagged: false,
            save_first_last: false,
        }
    }
}

impl CalculationConfig {
    pub fn window_length_ms(&self) -> i64 {
        i64::from(self.window_length) * 60_000
    }

    pub fn partition_length_ms(&self) -> i64 {
        i64::from(self.partition_length) * 60_000
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Local {
        read_path: PathBuf,
    },
    Remote {
        base_url: String,
        #[serde(default = "default_requests_per_second")]
        requests_per_second: u32,
        #[serde(default = "default_max_burst")]
        max_burst: u32,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub save_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: MAX_RETRIES,
            base_backoff_ms: BASE_BACKOFF_MS,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

fn default_window_length() -> u32 {
    DEFAULT_WINDOW_LENGTH_MINUTES
}

fn default_partition_length() -> u32 {
    DEFAULT_PARTITION_LENGTH_MINUTES
}

fn default_ped_parameter() -> f64 {
    DEFAULT_PED_PARAMETER
}

fn default_close_hour() -> u32 {
    DEFAULT_CLOSE_HOUR
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_base_backoff_ms() -> u64 {
    BASE_BACKOFF_MS
}

fn default_max_concurrent_reads() -> usize {
    MAX_CONCURRENT_READS
}

fn default_requests_per_second() -> u32 {
    REQUESTS_PER_SECOND
}

fn default_max_burst() -> u32 {
    MAX_BURST_REQUESTS
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let calc = &self.calculation;

        if calc.window_length == 0 {
            return Err(invalid("window_length must be positive"));
        }
        if calc.partition_length == 0 {
            return Err(invalid("partition_length must be positive"));
        }
        if calc.window_length % calc.partition_length != 0 {
            return Err(invalid(format!(
                "partition_length {} does not divide window_length {}",
                calc.partition_length, calc.window_length
            )));
        }
        if !calc.ped_parameter.is_finite() || calc.ped_parameter < 0.0 {
            return Err(invalid(format!(
                "ped_parameter must be a non-negative percentage, got {}",
                calc.ped_parameter
            )));
        }
        if self.schedule.close >= 24 {
            return Err(invalid(format!("close hour {} is not a valid hour", self.schedule.close)));
        }
        if self.max_concurrent_reads == 0 {
            return Err(invalid("max_concurrent_reads must be positive"));
        }
        if let SourceConfig::Remote {
            requests_per_second,
            max_burst,
            ..
        } = &self.source
        {
            if *requests_per_second == 0 || *max_burst == 0 {
                return Err(invalid("requests_per_second and max_burst must be positive"));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Parses a YAML run configuration and validates it.
pub fn parse_config(content: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_yaml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading run configuration from: {:?}", path);

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Config file content length: {} bytes", content.len());

    let config = parse_config(&content)?;
    info!(index = %config.index.name(), "Run configuration loaded");
    Ok(config)
}
