// src/trade.rs

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields every trade candidate must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = ["exchange", "time", "price", "size"];

/// A trade candidate exactly as read from the source. Usually an object, but
/// any JSON element is accepted so that one bad element cannot sink a batch.
pub type RawTrade = Value;

/// One day's raw trade batch as delivered by a trade source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DayBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    pub trades: Vec<RawTrade>,
}

/// Annotation attached to a trade by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TradeFlag {
    MissingField(&'static str),
    TimeNonNumeric,
    PriceNonNumeric,
    SizeNonNumerical,
    PriceNegative,
    SizeNegative,
}

impl fmt::Display for TradeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeFlag::MissingField(name) => write!(f, "missing_field:{}", name),
            TradeFlag::TimeNonNumeric => f.write_str("time_non_numeric"),
            TradeFlag::PriceNonNumeric => f.write_str("price_non_numeric"),
            TradeFlag::SizeNonNumerical => f.write_str("size_non_numerical"),
            TradeFlag::PriceNegative => f.write_str("price_negative"),
            TradeFlag::SizeNegative => f.write_str("size_negative"),
        }
    }
}

/// Joins flags into the `;`-separated form used in logs.
pub fn format_flags(flags: &BTreeSet<TradeFlag>) -> String {
    flags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub exchange: String,
    pub time_ms: i64,
    pub price: f64,
    pub size: f64,
    pub flags: BTreeSet<TradeFlag>,
}

impl Trade {
    pub fn new(exchange: impl Into<String>, time_ms: i64, price: f64, size: f64) -> Self {
        Trade {
            exchange: exchange.into(),
            time_ms,
            price,
            size,
            flags: BTreeSet::new(),
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// A raw trade candidate together with the flags the validator attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub raw: RawTrade,
    pub flags: BTreeSet<TradeFlag>,
}

impl TradeRecord {
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Typed view of the record, or `None` when a required field is absent or
    /// not numeric. Negative prices and sizes still produce a trade; their
    /// flags travel with it.
    pub fn to_trade(&self) -> Option<Trade> {
        let exchange = match self.raw.get("exchange")? {
            Value::String(name) => name.clone(),
            Value::Null => return None,
            other => other.to_string(),
        };
        let time_ms = parse_time_ms(self.raw.get("time")?)?;
        let price = self.raw.get("price")?.as_f64()?;
        let size = self.raw.get("size")?.as_f64()?;

        Some(Trade {
            exchange,
            time_ms,
            price,
            size,
            flags: self.flags.clone(),
        })
    }
}

/// Epoch-millisecond trade time. Sources deliver it either as a JSON number or
/// as a numeric string.
pub fn parse_time_ms(value: &Value) -> Option<i64> {
    let millis = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    millis.is_finite().then(|| millis as i64)
}

/// A day's trade records after validation; same cardinality and order as the
/// raw batch it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    pub date: NaiveDate,
    pub records: Vec<TradeRecord>,
}

impl ValidatedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn flagged_count(&self) -> usize {
        self.records.iter().filter(|record| record.is_flagged()).count()
    }
}
