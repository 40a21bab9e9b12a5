// tests/calc_clock_tests.rs

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use refrate::calc_clock::localize;
use refrate::config::ScheduleConfig;
use refrate::{CalculationClock, Frequency, RateError};

fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn schedule(start: NaiveDateTime, end: NaiveDateTime, freq: Frequency, tz: Tz) -> ScheduleConfig {
    ScheduleConfig {
        start,
        end,
        freq,
        tz,
        close: 16,
    }
}

#[test]
fn test_hourly_instants() {
    let config = schedule(at((2024, 2, 18), 0, 0), at((2024, 2, 18), 5, 30), Frequency::Hours, Tz::Europe__London);
    let instants = CalculationClock::instants(&config).unwrap();

    assert_eq!(instants.len(), 6);
    for pair in instants.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::hours(1));
    }
    assert_eq!(instants[0].naive_local(), at((2024, 2, 18), 0, 0));
}

#[test]
fn test_minutely_instants() {
    let config = schedule(at((2024, 2, 18), 0, 0), at((2024, 2, 18), 0, 10), Frequency::Minutes, Tz::UTC);
    let instants = CalculationClock::instants(&config).unwrap();

    assert_eq!(instants.len(), 11);
    assert_eq!(instants[10].naive_local(), at((2024, 2, 18), 0, 10));
}

#[test]
fn test_daily_instants_sit_at_close() {
    let config = schedule(at((2024, 2, 18), 0, 0), at((2024, 2, 21), 0, 0), Frequency::Days, Tz::Europe__London);
    let instants = CalculationClock::instants(&config).unwrap();

    assert_eq!(instants.len(), 4);
    for (i, instant) in instants.iter().enumerate() {
        assert_eq!(instant.hour(), 16);
        assert_eq!(instant.minute(), 0);
        assert_eq!(instant.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 18 + i as u32).unwrap());
    }
}

#[test]
fn test_daily_instants_keep_local_close_across_dst() {
    // The short spring-forward day leaves 95 elapsed hours between start and end.
    let config = schedule(at((2024, 3, 8), 0, 0), at((2024, 3, 12), 0, 0), Frequency::Days, Tz::America__New_York);
    let instants = CalculationClock::instants(&config).unwrap();

    assert_eq!(instants.len(), 4);
    assert!(instants.iter().all(|instant| instant.hour() == 16));
    assert_eq!(instants[3] - instants[0], Duration::hours(71));
}

#[test]
fn test_single_instant_when_start_equals_end() {
    let start = at((2024, 2, 18), 12, 0);
    let config = schedule(start, start, Frequency::Hours, Tz::UTC);
    let instants = CalculationClock::instants(&config).unwrap();

    assert_eq!(instants.len(), 1);
    assert_eq!(instants[0].naive_local(), start);
}

#[test]
fn test_end_before_start_is_rejected() {
    let config = schedule(at((2024, 2, 18), 12, 0), at((2024, 2, 18), 11, 0), Frequency::Hours, Tz::UTC);
    assert!(matches!(
        CalculationClock::instants(&config),
        Err(RateError::InvalidRange { .. })
    ));
}

#[test]
fn test_nonexistent_local_start_is_rejected() {
    assert!(matches!(
        localize(Tz::America__New_York, at((2024, 3, 10), 2, 30)),
        Err(RateError::UnresolvableLocalTime { .. })
    ));
}

#[test]
fn test_instants_grouped_by_local_date() {
    let config = schedule(at((2024, 2, 18), 22, 0), at((2024, 2, 19), 2, 0), Frequency::Hours, Tz::UTC);
    let instants = CalculationClock::instants(&config).unwrap();
    let groups = CalculationClock::group_by_source_date(&instants);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&NaiveDate::from_ymd_opt(2024, 2, 18).unwrap()].len(), 2);
    let next_day = &groups[&NaiveDate::from_ymd_opt(2024, 2, 19).unwrap()];
    assert_eq!(next_day.len(), 3);
    assert!(next_day.windows(2).all(|pair| pair[0] < pair[1]));
}
