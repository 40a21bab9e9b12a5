// src/main.rs

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use refrate::rate_manager::create_source;
use refrate::{init_logging, load_config, LogFormat, MemorySink, RateManager, RateManagerPool};

#[derive(Parser, Debug)]
#[command(name = "refrate")]
#[command(about = "Compute reference-rate indices from multi-exchange trade data")]
#[command(version)]
struct Cli {
    /// Run configuration files; each one describes an index run
    #[arg(short, long = "config", required = true, num_args = 1..)]
    configs: Vec<PathBuf>,

    /// Log output format (pretty, json, compact)
    #[arg(long, env = "REFRATE_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Compute everything but keep the results in memory instead of writing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let mut managers = Vec::with_capacity(cli.configs.len());
    for path in &cli.configs {
        let config = load_config(path).with_context(|| format!("Failed to load {:?}", path))?;
        let manager = if cli.dry_run {
            let source = create_source(&config.source);
            RateManager::with_parts(config, source, Arc::new(MemorySink::default()))
        } else {
            RateManager::new(config).with_context(|| format!("Failed to prepare output for {:?}", path))?
        };
        managers.push(manager);
    }

    let pool = RateManagerPool::new(managers);

    let stop_handles = pool.stop_handles();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; runs will stop before their next date");
            for stop in &stop_handles {
                stop.store(true, Ordering::SeqCst);
            }
        }
    });

    let mut fatal = None;
    for result in pool.run_concurrently().await {
        match result {
            Ok(summary) => info!(
                index = %summary.index_name,
                instants = summary.instants,
                points_written = summary.points_written,
                missing_dates = summary.missing_dates.len(),
                failed_dates = summary.failed_dates.len(),
                empty_instants = summary.empty_instants.len(),
                failed_writes = summary.failed_writes,
                flagged_records = summary.flagged_records,
                stopped_early = summary.stopped_early,
                "run summary"
            ),
            Err(run_error) => {
                error!(error = %run_error, "run aborted");
                fatal.get_or_insert(run_error);
            }
        }
    }

    match fatal {
        Some(run_error) => Err(run_error.into()),
        None => Ok(()),
    }
}
