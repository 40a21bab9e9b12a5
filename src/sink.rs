// src/sink.rs

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::DateTime;
use chrono_tz::Tz;
use polars::prelude::*;

use crate::aggregator::{BucketRecord, IndexPoint};
use crate::error::SinkError;
use crate::trade::Trade;

/// Durable destination for index points and their bucket audit rows.
/// Implementations serialize concurrent appends themselves.
pub trait OutputSink: Send + Sync {
    fn append(&self, point: &IndexPoint) -> Result<(), SinkError>;
}

/// Appends index rows to `{INDEX}.csv` and audit rows to
/// `{INDEX}_WeightedMedians.csv` under the save path.
pub struct CsvSink {
    save_path: PathBuf,
    index_name: String,
    tz: Tz,
    include_first_last: bool,
    progress: Mutex<Option<PendingPoint>>,
}

/// A point whose audit rows are on disk but whose index row is not yet.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingPoint {
    calc_time: i64,
}

impl CsvSink {
    pub fn new(
        save_path: impl Into<PathBuf>,
        index_name: impl Into<String>,
        tz: Tz,
        include_first_last: bool,
    ) -> Result<Self, SinkError> {
        let save_path = save_path.into();
        fs::create_dir_all(&save_path).map_err(|source| SinkError::Io {
            path: save_path.clone(),
            source,
        })?;

        Ok(CsvSink {
            save_path,
            index_name: index_name.into(),
            tz,
            include_first_last,
            progress: Mutex::new(None),
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.save_path.join(format!("{}.csv", self.index_name))
    }

    pub fn audit_path(&self) -> PathBuf {
        self.save_path.join(format!("{}_WeightedMedians.csv", self.index_name))
    }

    fn index_frame(&self, point: &IndexPoint) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Series::new("time", vec![point.calc_time]),
            Series::new("Date", vec![format_millis(point.calc_time, self.tz)]),
            Series::new(self.index_name.as_str(), vec![round4(point.index_value)]),
        ])
    }

    fn audit_frame(&self, point: &IndexPoint) -> PolarsResult<DataFrame> {
        let records = &point.bucket_audit;

        let mut columns = vec![
            Series::new("calc_time", vec![point.calc_time; records.len()]),
            Series::new(
                "ExecTime",
                records
                    .iter()
                    .map(|record| format_millis(record.exec_time, self.tz))
                    .collect::<Vec<_>>(),
            ),
            Series::new("VWM_Price", records.iter().map(|record| record.vwm_price).collect::<Vec<_>>()),
            Series::new(
                "VWM_Exchange",
                records.iter().map(|record| record.vwm_exchange.clone()).collect::<Vec<_>>(),
            ),
            Series::new(
                "Trades",
                records.iter().map(|record| record.trade_count as u64).collect::<Vec<_>>(),
            ),
        ];

        if self.include_first_last {
            columns.extend(self.trade_columns("first_trade", records, |record| record.first_trade.as_ref()));
            columns.extend(self.trade_columns("last_trade", records, |record| record.last_trade.as_ref()));
        }

        DataFrame::new(columns)
    }

    fn trade_columns<F>(&self, prefix: &str, records: &[BucketRecord], pick: F) -> Vec<Series>
    where
        F: Fn(&BucketRecord) -> Option<&Trade>,
    {
        let trades: Vec<Option<&Trade>> = records.iter().map(pick).collect();

        vec![
            Series::new(
                &format!("{}_exchange", prefix),
                trades
                    .iter()
                    .map(|trade| trade.map(|t| t.exchange.clone()))
                    .collect::<Vec<Option<String>>>(),
            ),
            Series::new(
                &format!("{}_datetime", prefix),
                trades
                    .iter()
                    .map(|trade| trade.map(|t| format_millis(t.time_ms, self.tz)))
                    .collect::<Vec<Option<String>>>(),
            ),
            Series::new(
                &format!("{}_price", prefix),
                trades.iter().map(|trade| trade.map(|t| t.price)).collect::<Vec<Option<f64>>>(),
            ),
            Series::new(
                &format!("{}_size", prefix),
                trades.iter().map(|trade| trade.map(|t| t.size)).collect::<Vec<Option<f64>>>(),
            ),
        ]
    }
}

impl OutputSink for CsvSink {
    /// Audit rows are written before the index row. When the index write
    /// fails, a retry of the same point skips the audit rows already on disk.
    fn append(&self, point: &IndexPoint) -> Result<(), SinkError> {
        let mut index_frame = self.index_frame(point)?;
        let mut audit_frame = self.audit_frame(point)?;

        let mut progress = self.progress.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let audit_written = *progress == Some(PendingPoint { calc_time: point.calc_time });

        if !audit_written {
            *progress = None;
            append_csv(&self.audit_path(), &mut audit_frame)?;
            *progress = Some(PendingPoint { calc_time: point.calc_time });
        }

        append_csv(&self.index_path(), &mut index_frame)?;
        *progress = None;
        Ok(())
    }
}

/// Appends `frame` to the CSV at `path`, writing the header only when the
/// file is new.
fn append_csv(path: &Path, frame: &mut DataFrame) -> Result<(), SinkError> {
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    CsvWriter::new(&mut file).include_header(is_new).finish(frame)?;
    Ok(())
}

/// Collects index points in memory.
#[derive(Default)]
pub struct MemorySink {
    points: Mutex<Vec<IndexPoint>>,
}

impl MemorySink {
    pub fn points(&self) -> Vec<IndexPoint> {
        self.points.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl OutputSink for MemorySink {
    fn append(&self, point: &IndexPoint) -> Result<(), SinkError> {
        self.points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(point.clone());
        Ok(())
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Renders epoch millis as a local timestamp in `tz`.
pub fn format_millis(millis: i64, tz: Tz) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(utc) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        None => millis.to_string(),
    }
}
