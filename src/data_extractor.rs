// src/data_extractor.rs

use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, Stream, StreamExt};
use tokio::time::sleep;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::SourceError;
use crate::source::TradeSource;
use crate::trade::DayBatch;

/// What a read of one date eventually produced.
#[derive(Debug)]
pub enum FetchOutcome {
    Batch(DayBatch),
    NotFound,
    Failed(SourceError),
}

/// Reads day batches from a trade source with bounded retry and bounded
/// concurrency.
pub struct TradeDataExtractor {
    source: Arc<dyn TradeSource>,
    retry: RetryConfig,
}

impl TradeDataExtractor {
    pub fn new(source: Arc<dyn TradeSource>, retry: RetryConfig) -> Self {
        TradeDataExtractor { source, retry }
    }

    /// Fetches one date, retrying retryable failures with exponential backoff.
    /// "Not found" is an answer, not a failure, and is never retried.
    pub async fn fetch_with_retry(&self, date: NaiveDate) -> FetchOutcome {
        let mut attempt = 0;

        loop {
            match self.source.fetch(date).await {
                Ok(Some(batch)) => return FetchOutcome::Batch(batch),
                Ok(None) => return FetchOutcome::NotFound,
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        %date,
                        source = %self.source.describe(),
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %error,
                        "trade batch read failed; retrying"
                    );
                    sleep(backoff).await;
                }
                Err(error) => return FetchOutcome::Failed(error),
            }
        }
    }

    /// Streams the outcome for each date, in the order given, with at most
    /// `concurrency` reads in flight.
    pub fn extract(
        &self,
        dates: Vec<NaiveDate>,
        concurrency: usize,
    ) -> impl Stream<Item = (NaiveDate, FetchOutcome)> + '_ {
        stream::iter(dates)
            .map(move |date| async move { (date, self.fetch_with_retry(date).await) })
            .buffered(concurrency.max(1))
    }
}
