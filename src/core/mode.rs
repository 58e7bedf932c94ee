//! Time-of-day mode classification and transition detection.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::{TimeWindow, truncate_to_minute};

/// Lighting mode for the current minute.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Before the morning window and after the evening window, LED forced off
    Night,

    /// Morning window, LED forced on
    Morning,

    /// Between the windows, light sampling decides
    Day,

    /// Evening window, LED forced on
    Evening,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Night => "Night",
            Mode::Morning => "Morning",
            Mode::Day => "Day",
            Mode::Evening => "Evening",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Mode::Night => "󰖔 ",
            Mode::Morning => "󰖜 ",
            Mode::Day => "󰖨 ",
            Mode::Evening => "󰖛 ",
        }
    }

    /// LED state dictated by the clock, or `None` when sampling governs.
    pub fn forced_led(&self) -> Option<bool> {
        match self {
            Mode::Night => Some(false),
            Mode::Morning | Mode::Evening => Some(true),
            Mode::Day => None,
        }
    }
}

/// Classify `now` against the day's window.
///
/// Boundaries are checked from latest to earliest, so a tie resolves to the
/// later mode. Without a window (configuration or ephemeris unavailable) the
/// answer is always `Night`.
pub fn classify(now: NaiveTime, window: Option<&TimeWindow>) -> Mode {
    let Some(window) = window else {
        return Mode::Night;
    };
    let t = truncate_to_minute(now);

    if t >= window.evening_end {
        Mode::Night
    } else if t >= window.evening_start {
        Mode::Evening
    } else if t >= window.morning_end {
        Mode::Day
    } else if t >= window.morning_start {
        Mode::Morning
    } else {
        Mode::Night
    }
}

/// A mode change observed while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: Option<Mode>,
    pub to: Mode,
}

/// Remembers the last mode a running controller acted on.
///
/// `None` is the no-mode sentinel: the next observation while running is
/// always reported as a transition.
#[derive(Debug, Default, Clone)]
pub struct ModeTracker {
    previous: Option<Mode>,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current mode and report a transition if it changed.
    ///
    /// When not running nothing is reported and the memory is cleared.
    pub fn observe(&mut self, mode: Mode, running: bool) -> Option<ModeTransition> {
        if !running {
            self.previous = None;
            return None;
        }
        if self.previous == Some(mode) {
            return None;
        }
        let transition = ModeTransition {
            from: self.previous,
            to: mode,
        };
        self.previous = Some(mode);
        Some(transition)
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn previous(&self) -> Option<Mode> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::{ScheduleConfig, compute};
    use crate::ephemeris::Ephemeris;

    fn hm(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn window() -> TimeWindow {
        compute(
            &Ephemeris {
                sunrise: hm("06:00"),
                sunset: hm("18:00"),
            },
            &ScheduleConfig {
                morning_offset: 0,
                evening_offset: 0,
                morning_minutes: 90,
                evening_minutes: 90,
            },
        )
    }

    #[test]
    fn test_cascade() {
        let w = window();
        assert_eq!(classify(hm("05:59"), Some(&w)), Mode::Night);
        assert_eq!(classify(hm("07:00"), Some(&w)), Mode::Morning);
        assert_eq!(classify(hm("12:00"), Some(&w)), Mode::Day);
        assert_eq!(classify(hm("17:00"), Some(&w)), Mode::Evening);
        assert_eq!(classify(hm("23:00"), Some(&w)), Mode::Night);
    }

    #[test]
    fn test_ties_resolve_to_later_mode() {
        let w = window();
        assert_eq!(classify(hm("06:00"), Some(&w)), Mode::Morning);
        assert_eq!(classify(hm("07:30"), Some(&w)), Mode::Day);
        assert_eq!(classify(hm("16:30"), Some(&w)), Mode::Evening);
        assert_eq!(classify(hm("18:00"), Some(&w)), Mode::Night);
    }

    #[test]
    fn test_seconds_do_not_cross_boundaries() {
        let w = window();
        let almost = NaiveTime::from_hms_opt(7, 29, 59).unwrap();
        assert_eq!(classify(almost, Some(&w)), Mode::Morning);
    }

    #[test]
    fn test_missing_window_is_night() {
        assert_eq!(classify(hm("12:00"), None), Mode::Night);
    }

    #[test]
    fn test_forced_policy() {
        assert_eq!(Mode::Night.forced_led(), Some(false));
        assert_eq!(Mode::Morning.forced_led(), Some(true));
        assert_eq!(Mode::Evening.forced_led(), Some(true));
        assert_eq!(Mode::Day.forced_led(), None);
    }

    #[test]
    fn test_tracker_reports_only_changes() {
        let mut tracker = ModeTracker::new();
        let first = tracker.observe(Mode::Morning, true).unwrap();
        assert_eq!(first.from, None);
        assert!(tracker.observe(Mode::Morning, true).is_none());
        let next = tracker.observe(Mode::Day, true).unwrap();
        assert_eq!(next.from, Some(Mode::Morning));
    }

    #[test]
    fn test_tracker_sentinel_when_stopped() {
        let mut tracker = ModeTracker::new();
        tracker.observe(Mode::Evening, true);
        assert!(tracker.observe(Mode::Evening, false).is_none());
        assert_eq!(tracker.previous(), None);
        assert!(tracker.observe(Mode::Evening, true).is_some());
    }
}
