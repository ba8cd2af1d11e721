//! Peak and working-hours classification of session start times.
//!
//! The thresholds moved around between deployments, so they are plain
//! configuration rather than constants.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Thresholds that decide whether a start time is "peak" or falls within
/// working hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakTimePolicy {
    /// Weekday sessions starting at or after this time are peak.
    pub weekday_start: NaiveTime,
    /// Weekend and holiday sessions starting at or after this time are peak.
    pub weekend_start: NaiveTime,
    /// Start of the working day on weekdays.
    pub working_start: NaiveTime,
    /// End of the working day on weekdays (exclusive).
    pub working_end: NaiveTime,
    /// Dates treated like weekends.
    pub holidays: Vec<NaiveDate>,
}

impl PeakTimePolicy {
    /// Builds a policy from whole-hour thresholds. Hours past 23 clamp to
    /// the last minute of the day.
    #[must_use]
    pub fn from_hours(
        weekday_start: u32,
        weekend_start: u32,
        working_start: u32,
        working_end: u32,
        holidays: Vec<NaiveDate>,
    ) -> Self {
        Self {
            weekday_start: hour(weekday_start),
            weekend_start: hour(weekend_start),
            working_start: hour(working_start),
            working_end: hour(working_end),
            holidays,
        }
    }

    /// Returns `true` for Saturdays, Sundays and configured holidays.
    #[must_use]
    pub fn is_rest_day(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&date)
    }

    /// Returns `true` if a session starting at `start` is peak time.
    #[must_use]
    pub fn is_peak_time(&self, start: NaiveDateTime) -> bool {
        let threshold = if self.is_rest_day(start.date()) {
            self.weekend_start
        } else {
            self.weekday_start
        };
        start.time() >= threshold
    }

    /// Returns `true` if `start` falls inside weekday working hours.
    #[must_use]
    pub fn is_working_hours(&self, start: NaiveDateTime) -> bool {
        !self.is_rest_day(start.date())
            && start.time() >= self.working_start
            && start.time() < self.working_end
    }
}

impl Default for PeakTimePolicy {
    fn default() -> Self {
        Self::from_hours(18, 9, 9, 18, Vec::new())
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0)
        .or_else(|| NaiveTime::from_hms_opt(23, 59, 59))
        .unwrap_or(NaiveTime::MIN)
}
