// src/validator.rs

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::trade::{format_flags, parse_time_ms, DayBatch, RawTrade, TradeFlag, TradeRecord, ValidatedBatch, REQUIRED_FIELDS};

/// Tags structurally or numerically defective trade candidates. Nothing is
/// dropped here; every candidate comes back as a record, flagged or not.
pub struct TradeValidator;

impl TradeValidator {
    pub fn validate(date: NaiveDate, batch: &DayBatch) -> ValidatedBatch {
        let records: Vec<TradeRecord> = batch.trades.par_iter().map(Self::validate_record).collect();

        let validated = ValidatedBatch { date, records };
        let flagged = validated.flagged_count();
        if flagged > 0 {
            warn!(%date, flagged, total = validated.len(), "trade batch contains flagged records");
        }

        validated
    }

    pub fn validate_record(raw: &RawTrade) -> TradeRecord {
        let mut flags = BTreeSet::new();

        for field in REQUIRED_FIELDS {
            // `get` is `None` for absent keys and for candidates that are not objects.
            if raw.get(field).is_none() {
                flags.insert(TradeFlag::MissingField(field));
            }
        }

        // Numeric checks only make sense once the record is structurally complete.
        if flags.is_empty() {
            if let (Some(time), Some(price), Some(size)) = (raw.get("time"), raw.get("price"), raw.get("size")) {
                if parse_time_ms(time).is_none() {
                    flags.insert(TradeFlag::TimeNonNumeric);
                }
                check_amount(price, TradeFlag::PriceNonNumeric, TradeFlag::PriceNegative, &mut flags);
                check_amount(size, TradeFlag::SizeNonNumerical, TradeFlag::SizeNegative, &mut flags);
            }
        }

        if !flags.is_empty() {
            debug!(flags = %format_flags(&flags), trade = ?raw, "flagged trade record");
        }

        TradeRecord {
            raw: raw.clone(),
            flags,
        }
    }
}

fn check_amount(value: &Value, non_numeric: TradeFlag, negative: TradeFlag, flags: &mut BTreeSet<TradeFlag>) {
    match value.as_f64() {
        None => {
            flags.insert(non_numeric);
        }
        Some(amount) if amount < 0.0 => {
            flags.insert(negative);
        }
        Some(_) => {}
    }
}
