//! The lighting controller.
//!
//! [`Controller`] owns every piece of mutable decision state and is driven by
//! a single thread calling [`Controller::tick`] once per second with the
//! current local time. Each tick:
//!
//! 1. refreshes the ephemeris and [`window::TimeWindow`] when the date changes
//! 2. classifies the [`mode::Mode`] and, while running, applies the forced
//!    policy on a mode transition
//! 3. takes a batch sample when one is due (running, and Day mode or night
//!    sensing), otherwise a display-only live read
//!
//! An actuator write that was not confirmed is repeated at the start of every
//! following tick.
//!
//! Host commands (`start`, `stop`, `set_operation`, `manual_led`,
//! `update_config`, `shutdown`) run on the same thread between ticks.
//!
//! External collaborators are reached through the traits in
//! [`crate::hardware`], [`crate::ledger`], [`crate::ephemeris`] and
//! [`events::EventSink`]. Their failures never escape: the controller keeps
//! the last known good LED state and power tier and reports the failure as an
//! event.

pub mod decision;
pub mod duration;
pub mod events;
pub mod mode;
pub mod power;
pub mod sampling;
pub mod window;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::constants::*;
use crate::ephemeris::{Ephemeris, EphemerisSource};
use crate::error::ExternalError;
use crate::hardware::{Actuator, LightSensor, PowerMonitor};
use crate::ledger::DurationRecorder;

use decision::{Decision, Reason, Trigger, decide};
use duration::DurationTracker;
use events::{Event, EventSink};
use mode::{Mode, ModeTracker, ModeTransition, classify};
use power::PowerTier;
use sampling::{BatchProgress, LightPattern, SamplingBatch, SensingSchedule, SensingSettings};
use window::{ScheduleConfig, TimeWindow, compute};

/// Whether the controller decides (`Auto`) or the operator drives the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Auto,
    Manual,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Auto => write!(f, "auto"),
            Operation::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Operation::Auto),
            "manual" => Ok(Operation::Manual),
            other => anyhow::bail!("unknown operation '{other}' (expected auto or manual)"),
        }
    }
}

/// Decision parameters derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub schedule: ScheduleConfig,
    pub sensing: SensingSettings,
    /// Simulate light and power reads.
    pub light_try: bool,
    /// Simulate actuator writes.
    pub led_try: bool,
    pub duration_grace_secs: u32,
}

/// External collaborators.
pub struct Ports {
    pub light: Box<dyn LightSensor>,
    pub power: Box<dyn PowerMonitor>,
    pub actuator: Box<dyn Actuator>,
    pub recorder: Box<dyn DurationRecorder>,
    pub ephemeris: Box<dyn EphemerisSource>,
    pub events: Box<dyn EventSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedState {
    pub on: bool,
    pub last_transition: Option<NaiveDateTime>,
}

/// Snapshot for status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub at: NaiveDateTime,
    pub operation: Operation,
    pub running: bool,
    pub mode: Mode,
    pub led: LedState,
    pub manual_led: bool,
    pub actuator_pending: bool,
    pub power: PowerTier,
    pub ephemeris: Option<Ephemeris>,
    pub window: Option<TimeWindow>,
    pub batch_index: u32,
    pub batch_count: u32,
    pub cloudy_sum: u32,
    pub last_light: Option<LightPattern>,
    pub next_sample: Option<NaiveDateTime>,
    pub on_since: Option<NaiveDateTime>,
}

pub struct Controller {
    ports: Ports,
    settings: Option<ControllerSettings>,
    initialized: bool,
    operation: Operation,
    running: bool,

    date: Option<NaiveDate>,
    ephemeris: Option<Ephemeris>,
    window: Option<TimeWindow>,
    ephemeris_retry_at: Option<NaiveDateTime>,

    mode: Mode,
    tracker: ModeTracker,
    batch: SamplingBatch,
    schedule: SensingSchedule,
    // Whether the last due sample fed the batch
    accumulating: bool,
    power: PowerTier,
    last_light: Option<LightPattern>,

    led: LedState,
    manual_led: bool,
    actuator_pending: bool,
    durations: DurationTracker,
    now: Option<NaiveDateTime>,
}

impl Controller {
    /// Create a stopped controller in `Auto` operation.
    ///
    /// `settings` is `None` when no configuration could be loaded; the
    /// controller then classifies every minute as Night.
    pub fn new(ports: Ports, settings: Option<ControllerSettings>) -> Self {
        let (count, threshold, grace) = match &settings {
            Some(s) => (s.sensing.count, s.sensing.threshold, s.duration_grace_secs),
            None => (
                DEFAULT_SENSING_COUNT,
                DEFAULT_SENSING_THRESHOLD,
                DEFAULT_DURATION_GRACE_SECS,
            ),
        };

        Self {
            ports,
            settings,
            initialized: false,
            operation: Operation::Auto,
            running: false,
            date: None,
            ephemeris: None,
            window: None,
            ephemeris_retry_at: None,
            mode: Mode::Night,
            tracker: ModeTracker::new(),
            batch: SamplingBatch::new(count, threshold),
            schedule: SensingSchedule::default(),
            accumulating: false,
            power: PowerTier::default(),
            last_light: None,
            led: LedState {
                on: false,
                last_transition: None,
            },
            manual_led: false,
            actuator_pending: false,
            durations: DurationTracker::new(grace),
            now: None,
        }
    }

    /// Advance the controller to `now`.
    pub fn tick(&mut self, now: NaiveDateTime) {
        self.now = Some(now);
        if !self.initialized {
            self.initialize(now);
        } else if self.actuator_pending {
            self.drive_actuator(now);
        }
        self.refresh_day(now);
        self.evaluate_mode(now);
        self.sense(now);
    }

    // Drive the hardware off once so it matches the initial state.
    fn initialize(&mut self, now: NaiveDateTime) {
        self.initialized = true;
        self.emit(
            now,
            Event::LedHeld {
                on: false,
                reason: Reason::Initial,
            },
        );
        self.drive_actuator(now);
    }

    /// Begin automatic control. Only valid in `Auto` operation.
    pub fn start(&mut self, now: NaiveDateTime) -> Result<()> {
        if self.operation != Operation::Auto {
            anyhow::bail!("start is only available in auto operation");
        }
        if self.running {
            return Ok(());
        }
        self.running = true;
        self.tracker.reset();
        self.batch.reset();
        self.schedule.arm(now);
        self.emit(now, Event::Started);
        if self.initialized {
            self.evaluate_mode(now);
        }
        Ok(())
    }

    /// Suspend automatic control. The LED keeps its state.
    pub fn stop(&mut self, now: NaiveDateTime) -> Result<()> {
        if !self.running {
            anyhow::bail!("controller is not running");
        }
        self.running = false;
        self.tracker.reset();
        self.emit(now, Event::Stopped);
        Ok(())
    }

    /// Switch between automatic and manual operation.
    ///
    /// Manual stops the controller and turns the LED off. Returning to auto
    /// re-asserts the decided LED state; `start` is still required.
    pub fn set_operation(&mut self, now: NaiveDateTime, operation: Operation) {
        if self.operation == operation {
            return;
        }
        self.operation = operation;
        self.manual_led = false;
        self.emit(now, Event::OperationChanged { operation });

        match operation {
            Operation::Manual => {
                if self.running {
                    self.running = false;
                    self.emit(now, Event::Stopped);
                }
                self.tracker.reset();
                if self.led.on {
                    self.apply(
                        now,
                        Decision {
                            on: false,
                            was_on: true,
                            reason: Reason::Manual,
                        },
                    );
                } else {
                    self.drive_actuator(now);
                }
            }
            Operation::Auto => self.drive_actuator(now),
        }
    }

    /// Drive the actuator by hand. Only valid in `Manual` operation; the
    /// decided LED state and on-time accounting are untouched.
    pub fn manual_led(&mut self, now: NaiveDateTime, on: bool) -> Result<()> {
        if self.operation != Operation::Manual {
            anyhow::bail!("manual LED control requires manual operation");
        }
        self.manual_led = on;
        self.emit(
            now,
            Event::LedSwitched {
                on,
                reason: Reason::Manual,
            },
        );
        self.drive_actuator(now);
        Ok(())
    }

    /// Commit a configuration edit.
    ///
    /// Resets the sampling batch, re-derives the window and clears the mode
    /// memory so the forced LED state is applied again on the next tick.
    pub fn update_config(&mut self, now: NaiveDateTime, settings: ControllerSettings) {
        self.settings = Some(settings);
        self.batch = SamplingBatch::new(settings.sensing.count, settings.sensing.threshold);
        self.durations.set_grace(settings.duration_grace_secs);
        self.schedule.arm(now);
        self.tracker.reset();
        self.emit(now, Event::ConfigApplied);
        self.date = Some(now.date());
        self.refresh_window(now);
    }

    /// Replace the ephemeris provider; takes effect on the next refresh.
    pub fn set_ephemeris_source(&mut self, source: Box<dyn EphemerisSource>) {
        self.ports.ephemeris = source;
    }

    /// Report that configuration could not be loaded.
    pub fn config_unavailable(&mut self, now: NaiveDateTime, reason: &str) {
        if self.settings.is_none() {
            self.window = None;
            self.ephemeris = None;
        }
        self.emit(
            now,
            Event::ConfigUnavailable {
                reason: reason.to_string(),
            },
        );
    }

    /// Turn the LED off and close any open on-period.
    pub fn shutdown(&mut self, now: NaiveDateTime) {
        self.now = Some(now);
        self.running = false;
        self.manual_led = false;
        self.operation = Operation::Auto;
        if self.led.on {
            self.apply(
                now,
                Decision {
                    on: false,
                    was_on: true,
                    reason: Reason::Shutdown,
                },
            );
        } else {
            self.drive_actuator(now);
        }
    }

    fn refresh_day(&mut self, now: NaiveDateTime) {
        let today = now.date();
        if self.date != Some(today) {
            if self.date.is_some() {
                self.emit(now, Event::DateRolledOver { date: today });
            }
            self.date = Some(today);
            self.refresh_window(now);
        } else if self.window.is_none()
            && self.settings.is_some()
            && self.ephemeris_retry_at.is_some_and(|at| now >= at)
        {
            self.refresh_window(now);
        }
    }

    fn refresh_window(&mut self, now: NaiveDateTime) {
        let Some(settings) = self.settings else {
            self.window = None;
            return;
        };
        let date = self.date.unwrap_or(now.date());

        match self.ports.ephemeris.ephemeris(date) {
            Ok(ephemeris) => {
                let window = compute(&ephemeris, &settings.schedule);
                self.ephemeris = Some(ephemeris);
                self.window = Some(window);
                self.ephemeris_retry_at = None;
                self.emit(
                    now,
                    Event::WindowComputed {
                        window,
                        ordered: window.is_ordered(),
                    },
                );
            }
            Err(error) => {
                self.ephemeris = None;
                self.window = None;
                // No sunrise at all waits for the next day; transport failures retry
                self.ephemeris_retry_at = match error {
                    ExternalError::SensorRead(_) => None,
                    _ => Some(now + Duration::seconds(CONFIG_RETRY_SECS)),
                };
                self.emit(now, Event::EphemerisUnavailable { error });
            }
        }
    }

    fn evaluate_mode(&mut self, now: NaiveDateTime) {
        self.mode = classify(now.time(), self.window.as_ref());
        if let Some(transition) = self.tracker.observe(self.mode, self.running) {
            self.on_mode_transition(now, transition);
        }
    }

    fn on_mode_transition(&mut self, now: NaiveDateTime, transition: ModeTransition) {
        self.emit(
            now,
            Event::ModeChanged {
                from: transition.from,
                to: transition.to,
            },
        );
        if let Some(decision) = decide(self.led.on, Trigger::ModeEntered(transition.to), self.power)
        {
            self.apply(now, decision);
        }
    }

    fn is_accumulating(&self) -> bool {
        let night_sensing = self.settings.is_some_and(|s| s.sensing.night_sensing);
        self.running
            && self.operation == Operation::Auto
            && (self.mode == Mode::Day || night_sensing)
    }

    fn sense(&mut self, now: NaiveDateTime) {
        let Some(settings) = self.settings else {
            return;
        };
        if self.schedule.next_due().is_none() {
            self.schedule.arm(now);
        }

        if self.schedule.is_due(now) {
            self.schedule
                .advance(now, settings.sensing.interval_minutes);
            let accumulating = self.is_accumulating();
            if accumulating && !self.accumulating {
                // A run interrupted by a forced window starts over
                self.batch.reset();
            }
            self.accumulating = accumulating;
            if accumulating {
                self.take_batch_sample(now, &settings);
                return;
            }
        }

        // Display-only read; failures (usually Busy) are not reported
        if let Ok(pattern) = self.ports.light.sample_light(settings.light_try) {
            self.last_light = Some(pattern);
        }
    }

    fn take_batch_sample(&mut self, now: NaiveDateTime, settings: &ControllerSettings) {
        self.read_power(now, settings.light_try);

        let reading = match self.ports.light.sample_light(settings.light_try) {
            Ok(pattern) => {
                self.last_light = Some(pattern);
                Some(pattern)
            }
            Err(error) => {
                self.emit(
                    now,
                    Event::ReadFailed {
                        subsystem: "light",
                        error,
                    },
                );
                None
            }
        };

        let count = self.batch.count();
        match self.batch.record(reading) {
            BatchProgress::Pending { index, cloudy_sum } => {
                self.emit(
                    now,
                    Event::BatchSample {
                        index,
                        count,
                        pattern: reading,
                        cloudy_sum,
                    },
                );
            }
            BatchProgress::Complete {
                index,
                cloudy_sum,
                threshold_abs,
                verdict,
            } => {
                self.emit(
                    now,
                    Event::BatchSample {
                        index,
                        count,
                        pattern: reading,
                        cloudy_sum,
                    },
                );
                self.emit(
                    now,
                    Event::BatchSettled {
                        cloudy_sum,
                        threshold_abs,
                        verdict,
                    },
                );
                let trigger = Trigger::BatchSettled {
                    mode: self.mode,
                    verdict,
                };
                if let Some(decision) = decide(self.led.on, trigger, self.power) {
                    self.apply(now, decision);
                }
            }
        }
    }

    fn read_power(&mut self, now: NaiveDateTime, try_mode: bool) {
        match self.ports.power.read_power(try_mode) {
            Ok(tier) => {
                if tier != self.power {
                    self.emit(
                        now,
                        Event::PowerChanged {
                            from: self.power,
                            to: tier,
                        },
                    );
                    self.power = tier;
                }
            }
            Err(error) => self.emit(
                now,
                Event::ReadFailed {
                    subsystem: "power",
                    error,
                },
            ),
        }
    }

    fn apply(&mut self, now: NaiveDateTime, decision: Decision) {
        if !decision.is_switch() {
            self.emit(
                now,
                Event::LedHeld {
                    on: decision.on,
                    reason: decision.reason,
                },
            );
            return;
        }

        self.led = LedState {
            on: decision.on,
            last_transition: Some(now),
        };
        self.emit(
            now,
            Event::LedSwitched {
                on: decision.on,
                reason: decision.reason,
            },
        );
        self.drive_actuator(now);

        if decision.turns_on() {
            self.durations.switched_on(now);
        } else if let Some(minutes) = self.durations.switched_off(now) {
            match self.ports.recorder.record_duration(LED_LABEL, minutes) {
                Ok(()) => self.emit(
                    now,
                    Event::DurationRecorded {
                        label: LED_LABEL.to_string(),
                        minutes,
                    },
                ),
                Err(error) => self.emit(now, Event::DurationLost { minutes, error }),
            }
        }
    }

    fn desired_output(&self) -> bool {
        match self.operation {
            Operation::Auto => self.led.on,
            Operation::Manual => self.manual_led,
        }
    }

    fn drive_actuator(&mut self, now: NaiveDateTime) {
        let on = self.desired_output();
        let try_mode = self.settings.map_or(DEFAULT_LED_TRY, |s| s.led_try);

        match self.ports.actuator.set_led(on, try_mode) {
            Ok(()) => self.actuator_pending = false,
            Err(error) => {
                // Report once per failure streak; the write is retried every tick
                if !self.actuator_pending {
                    self.emit(now, Event::ActuatorFailed { on, error });
                }
                self.actuator_pending = true;
            }
        }
    }

    fn emit(&mut self, now: NaiveDateTime, event: Event) {
        self.ports.events.record(now, &event);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn led_on(&self) -> bool {
        self.led.on
    }

    pub fn power(&self) -> PowerTier {
        self.power
    }

    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn settings(&self) -> Option<&ControllerSettings> {
        self.settings.as_ref()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            at: self.now.unwrap_or_default(),
            operation: self.operation,
            running: self.running,
            mode: self.mode,
            led: self.led,
            manual_led: self.manual_led,
            actuator_pending: self.actuator_pending,
            power: self.power,
            ephemeris: self.ephemeris,
            window: self.window,
            batch_index: self.batch.cursor(),
            batch_count: self.batch.count(),
            cloudy_sum: self.batch.cloudy_sum(),
            last_light: self.last_light,
            next_sample: self.schedule.next_due(),
            on_since: self.durations.on_since(),
        }
    }
}
