//! On-time accounting for the LED.

use chrono::NaiveDateTime;

/// Minutes for an on-period of `seconds`, padded by `grace_secs` to cover the
/// polling granularity and rounded to the nearest minute.
pub fn on_minutes(seconds: i64, grace_secs: u32) -> u32 {
    let padded = seconds.max(0) + i64::from(grace_secs);
    (padded as f64 / 60.0).round() as u32
}

/// Tracks the start of the current on-period.
#[derive(Debug, Clone)]
pub struct DurationTracker {
    grace_secs: u32,
    on_since: Option<NaiveDateTime>,
}

impl DurationTracker {
    pub fn new(grace_secs: u32) -> Self {
        Self {
            grace_secs,
            on_since: None,
        }
    }

    pub fn set_grace(&mut self, grace_secs: u32) {
        self.grace_secs = grace_secs;
    }

    /// Off-to-on switch.
    pub fn switched_on(&mut self, now: NaiveDateTime) {
        self.on_since = Some(now);
    }

    /// On-to-off switch. Returns the minutes to record, or `None` when no
    /// on-period was open.
    pub fn switched_off(&mut self, now: NaiveDateTime) -> Option<u32> {
        let since = self.on_since.take()?;
        let seconds = now.signed_duration_since(since).num_seconds();
        Some(on_minutes(seconds, self.grace_secs))
    }

    pub fn on_since(&self) -> Option<NaiveDateTime> {
        self.on_since
    }
}
