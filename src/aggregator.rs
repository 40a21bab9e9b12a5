// src/aggregator.rs

use tracing::{debug, warn};

use crate::bucket::Bucket;
use crate::trade::Trade;
use crate::weighted_median::VolumeWeightedMedian;

/// Audit row for one non-empty bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRecord {
    pub exec_time: i64,
    pub vwm_price: f64,
    pub vwm_exchange: String,
    pub trade_count: usize,
    pub first_trade: Option<Trade>,
    pub last_trade: Option<Trade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub calc_time: i64,
    pub index_value: f64,
    pub bucket_audit: Vec<BucketRecord>,
}

/// Combines per-bucket volume-weighted medians into the index value.
pub struct IndexAggregator {
    save_first_last: bool,
}

impl IndexAggregator {
    pub fn new(save_first_last: bool) -> Self {
        IndexAggregator { save_first_last }
    }

    /// Unweighted mean of the non-empty buckets' medians; every bucket counts
    /// the same regardless of its volume. `None` when no bucket has trades.
    pub fn aggregate(&self, calc_time: i64, buckets: &[Bucket<'_>]) -> Option<IndexPoint> {
        let mut bucket_audit = Vec::with_capacity(buckets.len());

        for bucket in buckets {
            if bucket.is_empty() {
                debug!(calc_time, bucket_start = bucket.start_ts, "empty bucket skipped");
                continue;
            }

            match VolumeWeightedMedian::compute(bucket.trades) {
                Ok(median) => bucket_audit.push(BucketRecord {
                    exec_time: bucket.start_ts,
                    vwm_price: median.price,
                    vwm_exchange: median.exchange,
                    trade_count: bucket.trades.len(),
                    first_trade: self.save_first_last.then(|| bucket.first_trade().cloned()).flatten(),
                    last_trade: self.save_first_last.then(|| bucket.last_trade().cloned()).flatten(),
                }),
                Err(error) => {
                    warn!(calc_time, bucket_start = bucket.start_ts, %error, "bucket skipped");
                }
            }
        }

        if bucket_audit.is_empty() {
            return None;
        }

        let index_value = bucket_audit.iter().map(|record| record.vwm_price).sum::<f64>() / bucket_audit.len() as f64;

        Some(IndexPoint {
            calc_time,
            index_value,
            bucket_audit,
        })
    }
}
