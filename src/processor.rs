// src/processor.rs

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::aggregator::{IndexAggregator, IndexPoint};
use crate::bucket::BucketPartitioner;
use crate::config::CalculationConfig;
use crate::outlier::{PedOutlierDetector, PedReport};
use crate::trade::ValidatedBatch;
use crate::window::WindowExtractor;

/// Everything one calculation instant produced.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantResult {
    pub calc_time: i64,
    pub window_trades: usize,
    pub ped_report: Option<PedReport>,
    pub point: Option<IndexPoint>,
}

impl InstantResult {
    pub fn excluded_exchanges(&self) -> &[String] {
        match &self.ped_report {
            Some(report) if report.excluded => &report.flagged,
            _ => &[],
        }
    }
}

/// Runs the per-instant pipeline over a validated batch. Pure: the same
/// batch, instant and configuration always give the same result.
pub struct Processor<'a> {
    calc: &'a CalculationConfig,
}

impl<'a> Processor<'a> {
    pub fn new(calc: &'a CalculationConfig) -> Self {
        Processor { calc }
    }

    pub fn process(&self, batch: &ValidatedBatch, calc_time: i64) -> InstantResult {
        let window = WindowExtractor::new(self.calc).extract(batch, calc_time);
        let (window, ped_report) = PedOutlierDetector::new(self.calc.ped_parameter).apply(window);

        let buckets = BucketPartitioner::new(self.calc.partition_length).partition(&window);
        let point = IndexAggregator::new(self.calc.save_first_last).aggregate(calc_time, &buckets);

        match &point {
            Some(point) => debug!(
                calc_time,
                index_value = point.index_value,
                buckets = point.bucket_audit.len(),
                "index point computed"
            ),
            None => warn!(
                date = %batch.date,
                calc_time,
                window_trades = window.trades.len(),
                "every bucket of the analysis window is empty; no index point produced"
            ),
        }

        InstantResult {
            calc_time,
            window_trades: window.trades.len(),
            ped_report,
            point,
        }
    }

    /// Processes several instants of the same batch in parallel; results come
    /// back in the order of `calc_times`.
    pub fn process_many(&self, batch: &ValidatedBatch, calc_times: &[i64]) -> Vec<InstantResult> {
        calc_times
            .par_iter()
            .map(|calc_time| self.process(batch, *calc_time))
            .collect()
    }
}
