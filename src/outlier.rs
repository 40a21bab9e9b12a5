// src/outlier.rs

use std::collections::BTreeMap;

use statrs::statistics::{Data, Median};
use tracing::{debug, info, warn};

use crate::config::MIN_EXCLUDED_FOR_REMOVAL;
use crate::trade::Trade;
use crate::weighted_median::VolumeWeightedMedian;
use crate::window::AnalysisWindow;

/// Outcome of the potentially-erroneous-exchange check for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct PedReport {
    pub exchange_medians: BTreeMap<String, f64>,
    pub median_of_medians: f64,
    pub flagged: Vec<String>,
    pub excluded: bool,
}

/// Flags exchanges whose volume-weighted median strays from the
/// cross-exchange median by more than `ped_parameter` percent.
pub struct PedOutlierDetector {
    ped_parameter: f64,
}

impl PedOutlierDetector {
    pub fn new(ped_parameter: f64) -> Self {
        PedOutlierDetector { ped_parameter }
    }

    pub fn exchange_medians(window: &AnalysisWindow) -> BTreeMap<String, f64> {
        let mut groups: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
        for trade in &window.trades {
            groups.entry(trade.exchange.as_str()).or_default().push(trade);
        }

        groups
            .into_iter()
            .filter_map(|(exchange, trades)| match VolumeWeightedMedian::compute(trades) {
                Ok(result) => Some((exchange.to_string(), result.price)),
                Err(error) => {
                    warn!(exchange, calc_time = window.calc_time, %error, "exchange group skipped");
                    None
                }
            })
            .collect()
    }

    pub fn detect(&self, window: &AnalysisWindow) -> Option<PedReport> {
        let exchange_medians = Self::exchange_medians(window);
        if exchange_medians.is_empty() {
            return None;
        }

        let median_of_medians = Data::new(exchange_medians.values().copied().collect::<Vec<f64>>()).median();
        let tolerance = self.ped_parameter / 100.0;

        let flagged: Vec<String> = exchange_medians
            .iter()
            .filter(|(_, median)| (*median / median_of_medians - 1.0).abs() > tolerance)
            .map(|(exchange, _)| exchange.clone())
            .collect();
        let excluded = flagged.len() >= MIN_EXCLUDED_FOR_REMOVAL;

        debug!(
            calc_time = window.calc_time,
            median_of_medians,
            exchanges = exchange_medians.len(),
            "exchange medians computed"
        );

        Some(PedReport {
            exchange_medians,
            median_of_medians,
            flagged,
            excluded,
        })
    }

    /// Runs the check and removes the flagged exchanges' trades from the
    /// window when enough of them were flagged.
    pub fn apply(&self, mut window: AnalysisWindow) -> (AnalysisWindow, Option<PedReport>) {
        let report = self.detect(&window);

        if let Some(report) = &report {
            if report.excluded {
                info!(
                    calc_time = window.calc_time,
                    excluded = ?report.flagged,
                    median_of_medians = report.median_of_medians,
                    "removing potentially erroneous exchanges"
                );
                window.trades.retain(|trade| !report.flagged.contains(&trade.exchange));
            } else if !report.flagged.is_empty() {
                warn!(
                    calc_time = window.calc_time,
                    flagged = ?report.flagged,
                    median_of_medians = report.median_of_medians,
                    "potentially erroneous exchange kept; fewer than {} flagged",
                    MIN_EXCLUDED_FOR_REMOVAL
                );
            }
        }

        (window, report)
    }
}
