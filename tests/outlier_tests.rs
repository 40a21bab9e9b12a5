// tests/outlier_tests.rs

mod common;

use common::{calc_time, minute_into_window, trade, window};
use refrate::{PedOutlierDetector, Trade};

fn one_trade_per_exchange(prices: &[(&str, f64)]) -> Vec<Trade> {
    let t = calc_time();
    prices
        .iter()
        .enumerate()
        .map(|(i, (exchange, price))| trade(exchange, minute_into_window(t, i as i64), *price, 1.0))
        .collect()
}

#[test]
fn test_single_flagged_exchange_is_kept() {
    let t = calc_time();
    let trades = one_trade_per_exchange(&[("a", 100.0), ("b", 101.0), ("c", 150.0)]);
    let detector = PedOutlierDetector::new(10.0);

    let report = detector.detect(&window(t, trades.clone())).unwrap();
    assert!((report.median_of_medians - 101.0).abs() < 1e-9);
    assert_eq!(report.flagged, vec!["c".to_string()]);
    assert!(!report.excluded);

    let (filtered, _) = detector.apply(window(t, trades));
    assert_eq!(filtered.trades.len(), 3);
}

#[test]
fn test_two_flagged_exchanges_are_removed() {
    let t = calc_time();
    let trades = one_trade_per_exchange(&[("a", 100.0), ("b", 200.0), ("c", 300.0)]);
    let detector = PedOutlierDetector::new(5.0);

    let (filtered, report) = detector.apply(window(t, trades));
    let report = report.unwrap();

    assert!((report.median_of_medians - 200.0).abs() < 1e-9);
    assert_eq!(report.flagged, vec!["a".to_string(), "c".to_string()]);
    assert!(report.excluded);
    assert_eq!(filtered.exchanges().into_iter().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn test_agreeing_exchanges_are_not_flagged() {
    let t = calc_time();
    let trades = one_trade_per_exchange(&[("a", 100.0), ("b", 100.5), ("c", 99.8), ("d", 101.0)]);
    let (filtered, report) = PedOutlierDetector::new(10.0).apply(window(t, trades));
    let report = report.unwrap();

    assert!(report.flagged.is_empty());
    assert!(!report.excluded);
    assert_eq!(report.exchange_medians.len(), 4);
    assert_eq!(filtered.trades.len(), 4);
}

#[test]
fn test_exchange_median_is_volume_weighted() {
    let t = calc_time();
    let trades = vec![
        trade("a", minute_into_window(t, 1), 100.0, 1.0),
        trade("a", minute_into_window(t, 2), 102.0, 5.0),
        trade("b", minute_into_window(t, 3), 101.0, 1.0),
    ];
    let medians = PedOutlierDetector::exchange_medians(&window(t, trades));

    assert_eq!(medians.get("a"), Some(&102.0));
    assert_eq!(medians.get("b"), Some(&101.0));
}

#[test]
fn test_empty_window_has_no_report() {
    let (filtered, report) = PedOutlierDetector::new(10.0).apply(window(calc_time(), Vec::new()));
    assert!(report.is_none());
    assert!(filtered.is_empty());
}
