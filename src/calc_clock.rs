// src/calc_clock.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::{Frequency, ScheduleConfig};
use crate::error::RateError;

/// Generates the calculation instants of a run.
pub struct CalculationClock;

impl CalculationClock {
    /// Localizes the configured start and end in the run timezone and
    /// generates the instants between them.
    pub fn instants(schedule: &ScheduleConfig) -> Result<Vec<DateTime<Tz>>, RateError> {
        let start = localize(schedule.tz, schedule.start)?;
        let end = localize(schedule.tz, schedule.end)?;
        Self::generate(start, end, schedule.freq, schedule.close)
    }

    /// Instants from `start` to `end` inclusive, one `freq` unit apart:
    /// `floor((end - start) / unit) + 1` of them. Daily instants are snapped
    /// to `close_hour` local time.
    pub fn generate(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        freq: Frequency,
        close_hour: u32,
    ) -> Result<Vec<DateTime<Tz>>, RateError> {
        if end < start {
            return Err(RateError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        let steps = (end - start).num_seconds() / freq.unit_seconds();
        let mut instants: Vec<DateTime<Tz>> = Vec::with_capacity(steps as usize + 1);

        for step in 0..=steps {
            let instant = match freq {
                Frequency::Days => match Self::close_of_day(start, step, close_hour) {
                    Some(instant) => instant,
                    None => {
                        warn!(%start, step, close_hour, "close time does not exist in local time; instant skipped");
                        continue;
                    }
                },
                Frequency::Hours | Frequency::Minutes => start + Duration::seconds(step * freq.unit_seconds()),
            };

            if instants.last().map_or(true, |last| *last < instant) {
                instants.push(instant);
            }
        }

        Ok(instants)
    }

    /// Local calendar date `step` days after `start`, at the close hour and
    /// `start`'s minute and second.
    fn close_of_day(start: DateTime<Tz>, step: i64, close_hour: u32) -> Option<DateTime<Tz>> {
        let date = start.date_naive().checked_add_days(Days::new(u64::try_from(step).ok()?))?;
        let time = NaiveTime::from_hms_opt(close_hour, start.minute(), start.second())?;
        start.timezone().from_local_datetime(&date.and_time(time)).earliest()
    }

    /// Groups instants by the local calendar date whose trade batch serves
    /// them. Instants keep their chronological order within a date.
    pub fn group_by_source_date(instants: &[DateTime<Tz>]) -> BTreeMap<NaiveDate, Vec<DateTime<Tz>>> {
        let mut groups: BTreeMap<NaiveDate, Vec<DateTime<Tz>>> = BTreeMap::new();
        for instant in instants {
            groups.entry(instant.date_naive()).or_default().push(*instant);
        }
        groups
    }
}

pub fn localize(tz: Tz, time: NaiveDateTime) -> Result<DateTime<Tz>, RateError> {
    tz.from_local_datetime(&time)
        .single()
        .ok_or(RateError::UnresolvableLocalTime { time, tz })
}
