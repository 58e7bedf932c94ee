//! Daily lighting window derived from sunrise, sunset and the schedule.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ephemeris::Ephemeris;

/// Forced-lighting schedule, all values in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Delay after sunrise before the morning window opens.
    pub morning_offset: u32,
    /// Lead before sunset at which the evening window closes.
    pub evening_offset: u32,
    pub morning_minutes: u32,
    pub evening_minutes: u32,
}

/// The four boundaries of one day.
///
/// `morning_start <= morning_end <= evening_start <= evening_end` is expected
/// but not enforced; see [`TimeWindow::is_ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "crate::ephemeris::hhmm")]
    pub morning_start: NaiveTime,
    #[serde(with = "crate::ephemeris::hhmm")]
    pub morning_end: NaiveTime,
    #[serde(with = "crate::ephemeris::hhmm")]
    pub evening_start: NaiveTime,
    #[serde(with = "crate::ephemeris::hhmm")]
    pub evening_end: NaiveTime,
}

/// Derive the window for a day.
///
/// Arithmetic is in whole minutes and wraps around midnight, so extreme
/// offsets produce an inverted or zero-width window rather than an error.
pub fn compute(ephemeris: &Ephemeris, schedule: &ScheduleConfig) -> TimeWindow {
    let sunrise = truncate_to_minute(ephemeris.sunrise);
    let sunset = truncate_to_minute(ephemeris.sunset);

    let morning_start = sunrise + minutes(schedule.morning_offset);
    let morning_end = morning_start + minutes(schedule.morning_minutes);
    let evening_end = sunset - minutes(schedule.evening_offset);
    let evening_start = evening_end - minutes(schedule.evening_minutes);

    TimeWindow {
        morning_start,
        morning_end,
        evening_start,
        evening_end,
    }
}

impl TimeWindow {
    /// Whether the boundaries are in chronological order within the day.
    pub fn is_ordered(&self) -> bool {
        self.morning_start <= self.morning_end
            && self.morning_end <= self.evening_start
            && self.evening_start <= self.evening_end
    }

    pub fn summary(&self) -> String {
        format!(
            "morning {}-{}, evening {}-{}",
            self.morning_start.format("%H:%M"),
            self.morning_end.format("%H:%M"),
            self.evening_start.format("%H:%M"),
            self.evening_end.format("%H:%M"),
        )
    }
}

/// Drop seconds and sub-seconds from a time of day.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

fn minutes(value: u32) -> Duration {
    Duration::minutes(i64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::test_constants::*;

    fn hm(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn ephemeris() -> Ephemeris {
        Ephemeris {
            sunrise: hm(TEST_SUNRISE),
            sunset: hm(TEST_SUNSET),
        }
    }

    fn schedule(morning_offset: u32, evening_offset: u32) -> ScheduleConfig {
        ScheduleConfig {
            morning_offset,
            evening_offset,
            morning_minutes: TEST_MORNING_MINUTES,
            evening_minutes: TEST_EVENING_MINUTES,
        }
    }

    #[test]
    fn test_default_window() {
        let window = compute(&ephemeris(), &schedule(0, 0));
        assert_eq!(window.morning_start, hm("06:00"));
        assert_eq!(window.morning_end, hm("07:30"));
        assert_eq!(window.evening_start, hm("16:30"));
        assert_eq!(window.evening_end, hm("18:00"));
        assert!(window.is_ordered());
    }

    #[test]
    fn test_offsets_shift_inward() {
        let window = compute(&ephemeris(), &schedule(30, 45));
        assert_eq!(window.morning_start, hm("06:30"));
        assert_eq!(window.morning_end, hm("08:00"));
        assert_eq!(window.evening_end, hm("17:15"));
        assert_eq!(window.evening_start, hm("15:45"));
    }

    #[test]
    fn test_seconds_are_ignored() {
        let eph = Ephemeris {
            sunrise: NaiveTime::from_hms_opt(6, 0, 59).unwrap(),
            sunset: NaiveTime::from_hms_opt(18, 0, 1).unwrap(),
        };
        let window = compute(&eph, &schedule(0, 0));
        assert_eq!(window.morning_start, hm("06:00"));
        assert_eq!(window.evening_end, hm("18:00"));
    }

    #[test]
    fn test_oversized_durations_invert_the_window() {
        let sched = ScheduleConfig {
            morning_offset: 0,
            evening_offset: 0,
            morning_minutes: 600,
            evening_minutes: 600,
        };
        let window = compute(&ephemeris(), &sched);
        assert_eq!(window.morning_end, hm("16:00"));
        assert_eq!(window.evening_start, hm("08:00"));
        assert!(!window.is_ordered());
    }

    #[test]
    fn test_wraps_past_midnight() {
        let eph = Ephemeris {
            sunrise: hm("23:30"),
            sunset: hm("00:15"),
        };
        let window = compute(&eph, &schedule(60, 30));
        assert_eq!(window.morning_start, hm("00:30"));
        assert_eq!(window.evening_end, hm("23:45"));
    }
}
