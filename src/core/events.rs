//! Controller events and the sinks that receive them.
//!
//! Every decision the controller takes is reported as an [`Event`] so the host
//! can log it and tests can assert on the reason category. Sinks are
//! fire-and-forget: they cannot fail back into the controller.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::decision::Reason;
use super::mode::Mode;
use super::power::PowerTier;
use super::sampling::{LightPattern, Verdict};
use super::window::TimeWindow;
use super::Operation;
use crate::common::constants::EVENT_HISTORY_LINES;
use crate::error::ExternalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started,
    Stopped,
    OperationChanged {
        operation: Operation,
    },
    ModeChanged {
        from: Option<Mode>,
        to: Mode,
    },
    /// The LED changed state.
    LedSwitched {
        on: bool,
        reason: Reason,
    },
    /// A decision point confirmed the current state.
    LedHeld {
        on: bool,
        reason: Reason,
    },
    /// The actuator did not acknowledge; the state is re-asserted next tick.
    ActuatorFailed {
        on: bool,
        error: ExternalError,
    },
    BatchSample {
        index: u32,
        count: u32,
        pattern: Option<LightPattern>,
        cloudy_sum: u32,
    },
    BatchSettled {
        cloudy_sum: u32,
        threshold_abs: f64,
        verdict: Verdict,
    },
    PowerChanged {
        from: PowerTier,
        to: PowerTier,
    },
    DurationRecorded {
        label: String,
        minutes: u32,
    },
    DurationLost {
        minutes: u32,
        error: ExternalError,
    },
    ReadFailed {
        subsystem: &'static str,
        error: ExternalError,
    },
    DateRolledOver {
        date: NaiveDate,
    },
    WindowComputed {
        window: TimeWindow,
        ordered: bool,
    },
    EphemerisUnavailable {
        error: ExternalError,
    },
    ConfigApplied,
    ConfigUnavailable {
        reason: String,
    },
}

impl Event {
    /// Operator-facing one-line description.
    pub fn describe(&self) -> String {
        match self {
            Event::Started => "Started".to_string(),
            Event::Stopped => "Stopped".to_string(),
            Event::OperationChanged { operation } => format!("Operation: {operation}"),
            Event::ModeChanged { to, .. } => format!("Mode change: {to}"),
            Event::LedSwitched { on: true, reason } => format!("LED on ({reason})"),
            Event::LedSwitched { on: false, reason } => format!("LED off ({reason})"),
            Event::LedHeld { on: true, reason } => format!("LED stays on ({reason})"),
            Event::LedHeld { on: false, reason } => format!("LED stays off ({reason})"),
            Event::ActuatorFailed { on, error } => {
                format!("Actuator did not confirm {}: {error}", on_off(*on))
            }
            Event::BatchSample {
                index,
                count,
                pattern,
                ..
            } => match pattern {
                Some(p) => format!("#{}/{} {p}", index + 1, count),
                None => format!("#{}/{} read failed", index + 1, count),
            },
            Event::BatchSettled {
                cloudy_sum,
                threshold_abs,
                verdict,
            } => format!("Cloudy count {cloudy_sum}, threshold {threshold_abs}: {verdict}"),
            Event::PowerChanged { from, to } => format!("Power {from} -> {to}"),
            Event::DurationRecorded { label, minutes } => {
                format!("{label} on-time {minutes} min")
            }
            Event::DurationLost { minutes, error } => {
                format!("Could not record {minutes} min on-time: {error}")
            }
            Event::ReadFailed { subsystem, error } => format!("{subsystem} read failed: {error}"),
            Event::DateRolledOver { date } => format!("New day {date}"),
            Event::WindowComputed { window, ordered } => {
                if *ordered {
                    format!("Window {}", window.summary())
                } else {
                    format!("Window {} is out of order", window.summary())
                }
            }
            Event::EphemerisUnavailable { error } => format!("No sunrise/sunset: {error}"),
            Event::ConfigApplied => "Configuration applied".to_string(),
            Event::ConfigUnavailable { reason } => {
                format!("Configuration unavailable, holding Night: {reason}")
            }
        }
    }

    /// Whether the event opens a new log block.
    fn is_headline(&self) -> bool {
        matches!(
            self,
            Event::Started
                | Event::Stopped
                | Event::OperationChanged { .. }
                | Event::ModeChanged { .. }
                | Event::LedSwitched { .. }
                | Event::DateRolledOver { .. }
                | Event::ConfigApplied
        )
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::ActuatorFailed { .. }
                | Event::DurationLost { .. }
                | Event::ReadFailed { .. }
                | Event::EphemerisUnavailable { .. }
                | Event::ConfigUnavailable { .. }
        ) || matches!(self, Event::WindowComputed { ordered: false, .. })
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Receiver of controller events.
pub trait EventSink: Send {
    fn record(&mut self, at: NaiveDateTime, event: &Event);
}

/// Renders events through the logger and keeps a short history.
///
/// Clones share the history, so the host can keep a handle for status
/// snapshots after boxing the sink into the controller.
#[derive(Clone)]
pub struct LogSink {
    debug_enabled: bool,
    history: Arc<Mutex<VecDeque<String>>>,
}

impl LogSink {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(EVENT_HISTORY_LINES))),
        }
    }

    /// Most recent lines, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl EventSink for LogSink {
    fn record(&mut self, at: NaiveDateTime, event: &Event) {
        let line = event.describe();

        if event.is_failure() {
            log_pipe!();
            log_warning!("{}", line);
        } else if event.is_headline() {
            log_block_start!("{}", line);
        } else if self.debug_enabled {
            log_indented!("{}", line);
        }

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == EVENT_HISTORY_LINES {
            history.pop_front();
        }
        history.push_back(format!("{} {}", at.format("%H:%M:%S"), line));
    }
}

/// Collects events in memory for assertions.
#[cfg(any(test, feature = "testing-support"))]
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<(NaiveDateTime, Event)>>>,
}

#[cfg(any(test, feature = "testing-support"))]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl EventSink for MemorySink {
    fn record(&mut self, at: NaiveDateTime, event: &Event) {
        self.events.lock().unwrap().push((at, event.clone()));
    }
}
