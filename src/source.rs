// src/source.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::SourceError;
use crate::session::HttpSession;
use crate::trade::DayBatch;

/// Where a day's raw trades come from.
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// The raw batch for `date`, or `Ok(None)` when the source has none.
    async fn fetch(&self, date: NaiveDate) -> Result<Option<DayBatch>, SourceError>;

    fn describe(&self) -> String;
}

/// Name of the batch object holding `date`'s trades.
pub fn batch_file_name(date: NaiveDate) -> String {
    format!("{}.json", date.format("%Y-%m-%d"))
}

fn parse_batch(date: NaiveDate, bytes: &[u8]) -> Result<DayBatch, SourceError> {
    serde_json::from_slice(bytes).map_err(|source| SourceError::Malformed { date, source })
}

/// Reads `{read_path}/YYYY-MM-DD.json` files.
pub struct LocalJsonSource {
    read_path: PathBuf,
}

impl LocalJsonSource {
    pub fn new(read_path: impl Into<PathBuf>) -> Self {
        LocalJsonSource {
            read_path: read_path.into(),
        }
    }

    pub fn read_path(&self) -> &Path {
        &self.read_path
    }

    pub fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.read_path.join(batch_file_name(date))
    }
}

#[async_trait]
impl TradeSource for LocalJsonSource {
    async fn fetch(&self, date: NaiveDate) -> Result<Option<DayBatch>, SourceError> {
        let path = self.file_path(date);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(?path, bytes = bytes.len(), "trade batch read");
                parse_batch(date, &bytes).map(Some)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SourceError::Io { path, source }),
        }
    }

    fn describe(&self) -> String {
        format!("local:{}", self.read_path.display())
    }
}

/// Fetches `{base_url}/YYYY-MM-DD.json` objects over HTTP.
pub struct HttpJsonSource {
    session: HttpSession,
    base_url: String,
}

impl HttpJsonSource {
    pub fn new(session: HttpSession, base_url: impl Into<String>) -> Self {
        HttpJsonSource {
            session,
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, date: NaiveDate) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), batch_file_name(date))
    }
}

#[async_trait]
impl TradeSource for HttpJsonSource {
    async fn fetch(&self, date: NaiveDate) -> Result<Option<DayBatch>, SourceError> {
        let url = self.url(date);
        let response = self
            .session
            .get(&url)
            .await
            .map_err(|source| SourceError::Http { url: url.clone(), source })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status { url, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| SourceError::Http { url: url.clone(), source })?;
        debug!(%url, bytes = bytes.len(), "trade batch downloaded");

        parse_batch(date, &bytes).map(Some)
    }

    fn describe(&self) -> String {
        format!("remote:{}", self.base_url)
    }
}
