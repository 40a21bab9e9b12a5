// src/bucket.rs

use crate::trade::Trade;
use crate::window::AnalysisWindow;

/// A `[start_ts, end_ts)` slice of an analysis window, in epoch millis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket<'a> {
    pub start_ts: i64,
    pub end_ts: i64,
    pub trades: &'a [Trade],
}

impl<'a> Bucket<'a> {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn first_trade(&self) -> Option<&'a Trade> {
        self.trades.first()
    }

    pub fn last_trade(&self) -> Option<&'a Trade> {
        self.trades.last()
    }
}

/// Splits an analysis window into adjacent buckets of equal length.
pub struct BucketPartitioner {
    partition_ms: i64,
}

impl BucketPartitioner {
    pub fn new(partition_length_minutes: u32) -> Self {
        BucketPartitioner {
            partition_ms: i64::from(partition_length_minutes) * 60_000,
        }
    }

    pub fn bucket_count(&self, window: &AnalysisWindow) -> usize {
        if self.partition_ms <= 0 {
            return 0;
        }
        (window.window_ms / self.partition_ms) as usize
    }

    /// Every bucket of the window, empty ones included. The window's trades
    /// are already time-sorted, so each bucket borrows a contiguous slice.
    pub fn partition<'a>(&self, window: &'a AnalysisWindow) -> Vec<Bucket<'a>> {
        let window_start = window.start_ms();

        (0..self.bucket_count(window) as i64)
            .map(|i| {
                let start_ts = window_start + i * self.partition_ms;
                let end_ts = start_ts + self.partition_ms;
                let lo = window.trades.partition_point(|trade| trade.time_ms < start_ts);
                let hi = window.trades.partition_point(|trade| trade.time_ms < end_ts);
                Bucket {
                    start_ts,
                    end_ts,
                    trades: &window.trades[lo..hi],
                }
            })
            .collect()
    }
}
