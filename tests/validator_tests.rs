// tests/validator_tests.rs

mod common;

use std::collections::BTreeSet;

use common::{batch, raw, raw_value, trade_date};
use refrate::trade::format_flags;
use refrate::{TradeFlag, TradeValidator};
use serde_json::json;

fn flags_of(value: serde_json::Value) -> BTreeSet<TradeFlag> {
    TradeValidator::validate_record(&raw_value(value)).flags
}

#[test]
fn test_complete_record_is_not_flagged() {
    let record = TradeValidator::validate_record(&raw("kraken", 1_708_272_000_000, 70.5, 2.0));
    assert!(!record.is_flagged());

    let trade = record.to_trade().unwrap();
    assert_eq!(trade.exchange, "kraken");
    assert_eq!(trade.time_ms, 1_708_272_000_000);
    assert_eq!(trade.price, 70.5);
    assert_eq!(trade.size, 2.0);
}

#[test]
fn test_missing_fields_skip_numeric_checks() {
    let flags = flags_of(json!({ "exchange": "kraken", "time": "not-a-time" }));
    assert_eq!(
        flags,
        BTreeSet::from([TradeFlag::MissingField("price"), TradeFlag::MissingField("size")])
    );
}

#[test]
fn test_numeric_flags() {
    let flags = flags_of(json!({ "exchange": "a", "time": 1, "price": "abc", "size": -1.0 }));
    assert_eq!(flags, BTreeSet::from([TradeFlag::PriceNonNumeric, TradeFlag::SizeNegative]));

    let flags = flags_of(json!({ "exchange": "a", "time": 1, "price": -5.0, "size": "x" }));
    assert_eq!(flags, BTreeSet::from([TradeFlag::PriceNegative, TradeFlag::SizeNonNumerical]));

    let flags = flags_of(json!({ "exchange": "a", "time": "soon", "price": 1.0, "size": 1.0 }));
    assert_eq!(flags, BTreeSet::from([TradeFlag::TimeNonNumeric]));
}

#[test]
fn test_null_price_is_non_numeric() {
    let record = TradeValidator::validate_record(&raw_value(json!({
        "exchange": "a", "time": 1, "price": null, "size": 1.0
    })));
    assert_eq!(record.flags, BTreeSet::from([TradeFlag::PriceNonNumeric]));
    assert!(record.to_trade().is_none());
}

#[test]
fn test_numeric_string_time_is_accepted() {
    let record = TradeValidator::validate_record(&raw_value(json!({
        "exchange": "a", "time": "1708272000000", "price": 1.0, "size": 1.0
    })));
    assert!(!record.is_flagged());
    assert_eq!(record.to_trade().unwrap().time_ms, 1_708_272_000_000);
}

#[test]
fn test_negative_size_still_types() {
    let record = TradeValidator::validate_record(&raw("a", 1, 10.0, -2.0));
    let trade = record.to_trade().unwrap();
    assert_eq!(trade.size, -2.0);
    assert!(trade.is_flagged());
}

#[test]
fn test_flag_labels() {
    let flags = BTreeSet::from([
        TradeFlag::MissingField("exchange"),
        TradeFlag::SizeNonNumerical,
        TradeFlag::PriceNegative,
    ]);
    assert_eq!(format_flags(&flags), "missing_field:exchange;size_non_numerical;price_negative");
    assert_eq!(TradeFlag::TimeNonNumeric.to_string(), "time_non_numeric");
    assert_eq!(TradeFlag::SizeNegative.to_string(), "size_negative");
}

#[test]
fn test_batch_keeps_every_record_in_order() {
    let raws = vec![
        raw("a", 1, 10.0, 1.0),
        raw_value(json!({ "exchange": "b" })),
        raw("c", 3, -1.0, 1.0),
        raw("d", 4, 12.0, 2.0),
        raw_value(json!({ "exchange": "e", "time": 5, "price": "x", "size": 1.0 })),
    ];
    let validated = TradeValidator::validate(trade_date(), &batch(raws.clone()));

    assert_eq!(validated.date, trade_date());
    assert_eq!(validated.len(), raws.len());
    assert_eq!(validated.flagged_count(), 3);
    for (record, raw) in validated.records.iter().zip(&raws) {
        assert_eq!(&record.raw, raw);
    }
}

#[test]
fn test_non_object_candidates_are_tagged_not_dropped() {
    let t = common::calc_time();
    let raws = vec![raw("kraken", t - 1_000, 70.0, 1.0), json!(null), json!("garbage")];
    let validated = TradeValidator::validate(trade_date(), &batch(raws));

    assert_eq!(validated.len(), 3);
    assert_eq!(validated.flagged_count(), 2);
    for record in &validated.records[1..] {
        assert_eq!(
            record.flags,
            BTreeSet::from([
                TradeFlag::MissingField("exchange"),
                TradeFlag::MissingField("time"),
                TradeFlag::MissingField("price"),
                TradeFlag::MissingField("size"),
            ])
        );
        assert!(record.to_trade().is_none());
    }

    let calc = refrate::CalculationConfig::default();
    let window = refrate::WindowExtractor::new(&calc).extract(&validated, t);
    assert_eq!(window.trades.len(), 1);
    assert_eq!(window.trades[0].exchange, "kraken");
}
