// src/rate_manager_pool.rs

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::RunConfig;
use crate::error::{RateError, SinkError};
use crate::rate_manager::{RateManager, RunSummary};

/// Runs several independent index runs side by side.
pub struct RateManagerPool {
    rate_managers: Vec<RateManager>,
}

impl RateManagerPool {
    pub fn new(rate_managers: Vec<RateManager>) -> Self {
        RateManagerPool { rate_managers }
    }

    /// Builds one run per configuration. Two runs appending to the same index
    /// files would interleave their rows, so such configurations are rejected.
    pub fn from_configs(configs: Vec<RunConfig>) -> Result<Self, SinkError> {
        let mut outputs = HashSet::new();
        for config in &configs {
            let index_file = config.output.save_path.join(format!("{}.csv", config.index.name()));
            if !outputs.insert(index_file.clone()) {
                return Err(SinkError::SharedOutput(index_file));
            }
        }

        let rate_managers = configs
            .into_iter()
            .map(RateManager::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rate_managers))
    }

    pub fn len(&self) -> usize {
        self.rate_managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rate_managers.is_empty()
    }

    /// Stop flags of every run; raising one ends that run before its next date.
    pub fn stop_handles(&self) -> Vec<Arc<AtomicBool>> {
        self.rate_managers.iter().map(RateManager::stop_handle).collect()
    }

    /// One result per run, in the order the runs were given.
    pub async fn run_concurrently(&self) -> Vec<Result<RunSummary, RateError>> {
        let futures = self.rate_managers.iter().map(|manager| manager.run());
        join_all(futures).await
    }
}
