// src/window.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::CalculationConfig;
use crate::trade::{Trade, ValidatedBatch};

/// Trades of one batch that fall in `[calc_time - window_ms, calc_time)`,
/// ascending by time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisWindow {
    pub calc_time: i64,
    pub window_ms: i64,
    pub trades: Vec<Trade>,
}

impl AnalysisWindow {
    pub fn start_ms(&self) -> i64 {
        self.calc_time - self.window_ms
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn exchanges(&self) -> BTreeSet<&str> {
        self.trades.iter().map(|trade| trade.exchange.as_str()).collect()
    }
}

pub struct WindowExtractor<'a> {
    calc: &'a CalculationConfig,
}

impl<'a> WindowExtractor<'a> {
    pub fn new(calc: &'a CalculationConfig) -> Self {
        WindowExtractor { calc }
    }

    pub fn extract(&self, batch: &ValidatedBatch, calc_time: i64) -> AnalysisWindow {
        let window_ms = self.calc.window_length_ms();
        let start = calc_time - window_ms;

        let mut untyped = 0usize;
        let mut outside = 0usize;
        let mut skipped_flagged = 0usize;
        let mut skipped_market = 0usize;
        let mut trades = Vec::new();

        for record in &batch.records {
            let Some(trade) = record.to_trade() else {
                untyped += 1;
                continue;
            };
            if trade.time_ms < start || trade.time_ms >= calc_time {
                outside += 1;
                continue;
            }
            if self.calc.exclude_flagged && trade.is_flagged() {
                skipped_flagged += 1;
                continue;
            }
            if !self.calc.markets.is_empty() && !self.calc.markets.contains(&trade.exchange) {
                skipped_market += 1;
                continue;
            }
            trades.push(trade);
        }

        trades.sort_by_key(|trade| trade.time_ms);

        debug!(
            date = %batch.date,
            calc_time,
            in_window = trades.len(),
            outside,
            untyped,
            skipped_flagged,
            skipped_market,
            "analysis window extracted"
        );

        AnalysisWindow {
            calc_time,
            window_ms,
            trades,
        }
    }
}
