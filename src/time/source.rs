//! Real and simulated time sources.
//!
//! The simulated source lets a whole growing day run in seconds: every sleep
//! requested by the control loop advances the simulated clock instead of (or
//! faster than) real time, so mode boundaries, sampling batches and duration
//! accounting can be observed end to end.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Abstract clock used by the host loop.
pub trait TimeSource: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Sleep for `duration`, or pretend to.
    fn sleep(&self, duration: StdDuration);

    fn is_simulated(&self) -> bool;

    /// Whether a simulation reached its end (never for the real clock).
    fn is_ended(&self) -> bool {
        false
    }
}

pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Clock that runs from `start` to `end` faster than real time.
///
/// A `multiplier` of `0.0` fast-forwards: each sleep advances the clock by the
/// full requested duration after a 1 ms real pause. Any positive multiplier
/// scales real sleeps instead (60.0 = one simulated minute per real second).
pub struct SimulatedTimeSource {
    end: NaiveDateTime,
    multiplier: f64,
    current: Mutex<NaiveDateTime>,
}

impl SimulatedTimeSource {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, multiplier: f64) -> Self {
        Self {
            end,
            multiplier: multiplier.max(0.0),
            current: Mutex::new(start),
        }
    }

    fn advance(&self, duration: StdDuration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let step = ChronoDuration::milliseconds(duration.as_millis() as i64);
        *current = (*current + step).min(self.end);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: StdDuration) {
        if self.multiplier == 0.0 {
            std::thread::sleep(StdDuration::from_millis(1));
        } else {
            std::thread::sleep(duration.div_f64(self.multiplier));
        }
        self.advance(duration);
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.now() >= self.end
    }
}

/// Install the global time source. Later calls are ignored.
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

pub fn now() -> NaiveDateTime {
    source().now()
}

pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

pub fn is_simulated() -> bool {
    source().is_simulated()
}

pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse `YYYY-MM-DD HH:MM:SS` as a local wall-clock time.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_fast_forward_advances_by_requested_duration() {
        let sim = SimulatedTimeSource::new(
            at("2024-05-01 05:59:58"),
            at("2024-05-01 07:00:00"),
            0.0,
        );
        sim.sleep(StdDuration::from_secs(1));
        sim.sleep(StdDuration::from_secs(1));
        assert_eq!(sim.now(), at("2024-05-01 06:00:00"));
        assert!(!sim.is_ended());
    }

    #[test]
    fn test_simulation_caps_at_end() {
        let sim = SimulatedTimeSource::new(
            at("2024-05-01 06:59:59"),
            at("2024-05-01 07:00:00"),
            0.0,
        );
        sim.sleep(StdDuration::from_secs(3600));
        assert_eq!(sim.now(), at("2024-05-01 07:00:00"));
        assert!(sim.is_ended());
    }

    #[test]
    fn test_parse_datetime_rejects_minutes_only() {
        assert!(parse_datetime("2024-05-01 06:00").is_err());
    }
}
