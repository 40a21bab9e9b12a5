// src/rate_manager.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::aggregator::IndexPoint;
use crate::calc_clock::CalculationClock;
use crate::config::{RunConfig, SourceConfig};
use crate::data_extractor::{FetchOutcome, TradeDataExtractor};
use crate::error::{RateError, SinkError};
use crate::processor::{InstantResult, Processor};
use crate::session::HttpSession;
use crate::sink::{CsvSink, OutputSink};
use crate::source::{HttpJsonSource, LocalJsonSource, TradeSource};
use crate::trade::DayBatch;
use crate::validator::TradeValidator;

/// Tally of what a run did and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub index_name: String,
    pub instants: usize,
    pub points_written: usize,
    pub missing_dates: Vec<NaiveDate>,
    pub failed_dates: Vec<NaiveDate>,
    pub empty_instants: Vec<i64>,
    pub failed_writes: usize,
    pub flagged_records: usize,
    pub exclusion_instants: usize,
    pub stopped_early: bool,
}

/// Executes one index run: schedule, read, compute, persist.
pub struct RateManager {
    config: RunConfig,
    source: Arc<dyn TradeSource>,
    sink: Arc<dyn OutputSink>,
    stop: Arc<AtomicBool>,
}

impl RateManager {
    /// Builds the source and CSV sink described by `config`.
    pub fn new(config: RunConfig) -> Result<Self, SinkError> {
        let source = create_source(&config.source);
        let sink = CsvSink::new(
            config.output.save_path.clone(),
            config.index.name(),
            config.schedule.tz,
            config.calculation.save_first_last,
        )?;
        Ok(Self::with_parts(config, source, Arc::new(sink)))
    }

    pub fn with_parts(config: RunConfig, source: Arc<dyn TradeSource>, sink: Arc<dyn OutputSink>) -> Self {
        RateManager {
            config,
            source,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Raising this flag ends the run before the next date is processed.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub async fn run(&self) -> Result<RunSummary, RateError> {
        let started = Instant::now();
        let index_name = self.config.index.name();

        let instants = CalculationClock::instants(&self.config.schedule)?;
        let groups = CalculationClock::group_by_source_date(&instants);

        info!(
            index = %index_name,
            start = %self.config.schedule.start,
            end = %self.config.schedule.end,
            freq = ?self.config.schedule.freq,
            instants = instants.len(),
            dates = groups.len(),
            source = %self.source.describe(),
            "starting reference rate run"
        );

        let mut summary = RunSummary {
            index_name: index_name.clone(),
            instants: instants.len(),
            ..RunSummary::default()
        };

        let extractor = TradeDataExtractor::new(Arc::clone(&self.source), self.config.retry.clone());
        let dates: Vec<NaiveDate> = groups.keys().copied().collect();
        let batches = extractor.extract(dates, self.config.max_concurrent_reads);
        futures::pin_mut!(batches);

        while let Some((date, outcome)) = batches.next().await {
            if self.stop.load(Ordering::SeqCst) {
                warn!(index = %index_name, %date, "stop requested; ending run");
                summary.stopped_early = true;
                break;
            }

            let calc_times: Vec<i64> = groups
                .get(&date)
                .map(|instants| instants.iter().map(|instant| instant.timestamp_millis()).collect())
                .unwrap_or_default();

            let batch = match outcome {
                FetchOutcome::Batch(batch) => batch,
                FetchOutcome::NotFound => {
                    warn!(index = %index_name, %date, instants = calc_times.len(), "trade batch not found; instants skipped");
                    summary.missing_dates.push(date);
                    continue;
                }
                FetchOutcome::Failed(error) => {
                    warn!(index = %index_name, %date, instants = calc_times.len(), %error, "trade batch unavailable; instants skipped");
                    summary.failed_dates.push(date);
                    continue;
                }
            };

            let (flagged, results) = match self.compute(date, batch, calc_times).await {
                Some(computed) => computed,
                None => {
                    summary.failed_dates.push(date);
                    continue;
                }
            };
            summary.flagged_records += flagged;

            for result in results {
                if !result.excluded_exchanges().is_empty() {
                    summary.exclusion_instants += 1;
                }
                match result.point {
                    Some(point) => match self.write_with_retry(&point).await {
                        Ok(()) => summary.points_written += 1,
                        Err(error) => {
                            error!(index = %index_name, calc_time = point.calc_time, %error, "index point could not be written");
                            summary.failed_writes += 1;
                        }
                    },
                    None => summary.empty_instants.push(result.calc_time),
                }
            }
        }

        info!(
            index = %index_name,
            points_written = summary.points_written,
            missing_dates = summary.missing_dates.len(),
            failed_dates = summary.failed_dates.len(),
            empty_instants = summary.empty_instants.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "reference rate run finished"
        );

        Ok(summary)
    }

    /// Validates the batch and evaluates its instants on a blocking worker.
    async fn compute(&self, date: NaiveDate, batch: DayBatch, calc_times: Vec<i64>) -> Option<(usize, Vec<InstantResult>)> {
        let calculation = self.config.calculation.clone();

        let task = tokio::task::spawn_blocking(move || {
            let validated = TradeValidator::validate(date, &batch);
            let results = Processor::new(&calculation).process_many(&validated, &calc_times);
            (validated.flagged_count(), results)
        });

        match task.await {
            Ok(computed) => Some(computed),
            Err(join_error) => {
                error!(%date, error = %join_error, "computation task failed; instants skipped");
                None
            }
        }
    }

    async fn write_with_retry(&self, point: &IndexPoint) -> Result<(), SinkError> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.sink.append(point) {
                Ok(()) => return Ok(()),
                Err(error) if attempt < retry.max_retries => {
                    attempt += 1;
                    let backoff = retry.backoff(attempt);
                    warn!(calc_time = point.calc_time, attempt, %error, "output write failed; retrying");
                    sleep(backoff).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Picks the trade source strategy the configuration asks for.
pub fn create_source(config: &SourceConfig) -> Arc<dyn TradeSource> {
    match config {
        SourceConfig::Local { read_path } => Arc::new(LocalJsonSource::new(read_path.clone())),
        SourceConfig::Remote {
            base_url,
            requests_per_second,
            max_burst,
        } => Arc::new(HttpJsonSource::new(
            HttpSession::new(*requests_per_second, *max_burst),
            base_url.clone(),
        )),
    }
}
