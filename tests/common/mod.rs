// tests/common/mod.rs
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, TimeZone, Utc};
use refrate::trade::RawTrade;
use refrate::{AnalysisWindow, DayBatch, Trade, TradeValidator, ValidatedBatch};
use serde_json::{json, Value};

pub const HOUR_MS: i64 = 3_600_000;
pub const MINUTE_MS: i64 = 60_000;

/// 2024-02-18 16:00:00 UTC
pub fn calc_time() -> i64 {
    Utc.with_ymd_and_hms(2024, 2, 18, 16, 0, 0).unwrap().timestamp_millis()
}

pub fn trade_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 18).unwrap()
}

pub fn trade(exchange: &str, time_ms: i64, price: f64, size: f64) -> Trade {
    Trade::new(exchange, time_ms, price, size)
}

pub fn raw(exchange: &str, time_ms: i64, price: f64, size: f64) -> RawTrade {
    raw_value(json!({
        "exchange": exchange,
        "time": time_ms,
        "price": price,
        "size": size,
    }))
}

pub fn raw_value(value: Value) -> RawTrade {
    value
}

pub fn batch(trades: Vec<RawTrade>) -> DayBatch {
    DayBatch { time: None, trades }
}

pub fn validated(trades: Vec<RawTrade>) -> ValidatedBatch {
    TradeValidator::validate(trade_date(), &batch(trades))
}

pub fn window(calc_time: i64, mut trades: Vec<Trade>) -> AnalysisWindow {
    trades.sort_by_key(|trade| trade.time_ms);
    AnalysisWindow {
        calc_time,
        window_ms: HOUR_MS,
        trades,
    }
}

/// Start of minute `minute` of the hour ending at `calc_time`.
pub fn minute_into_window(calc_time: i64, minute: i64) -> i64 {
    calc_time - HOUR_MS + minute * MINUTE_MS
}

/// Fresh, empty directory under the OS temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("refrate-{}-{}-{}", name, std::process::id(), nanos));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
