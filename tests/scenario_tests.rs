use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use growlight::core::decision::Reason;
use growlight::core::events::{Event, MemorySink};
use growlight::core::mode::Mode;
use growlight::core::power::PowerTier;
use growlight::core::sampling::{LightPattern, SensingSettings, Verdict};
use growlight::core::window::ScheduleConfig;
use growlight::core::{Controller, ControllerSettings, Ports};
use growlight::ephemeris::FixedEphemeris;
use growlight::error::ExternalError;
use growlight::hardware::{Actuator, LightSensor, PowerMonitor};
use growlight::ledger::DurationRecorder;

type Reading = Result<LightPattern, ExternalError>;

/// Light sensor that plays back scripted readings, then a default.
#[derive(Clone)]
struct ScriptedLight {
    script: Arc<Mutex<VecDeque<Reading>>>,
    default: LightPattern,
}

impl ScriptedLight {
    fn push(&self, reading: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(reading.parse().unwrap()));
    }

    fn push_failure(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(ExternalError::Timeout {
                subsystem: "light",
                millis: 500,
            }));
    }
}

impl LightSensor for ScriptedLight {
    fn sample_light(&mut self, _try_mode: bool) -> Result<LightPattern, ExternalError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.default))
    }
}

#[derive(Clone)]
struct SharedPower(Arc<Mutex<PowerTier>>);

impl PowerMonitor for SharedPower {
    fn read_power(&mut self, _try_mode: bool) -> Result<PowerTier, ExternalError> {
        Ok(*self.0.lock().unwrap())
    }
}

#[derive(Clone, Default)]
struct RecordingActuator(Arc<Mutex<Vec<bool>>>);

impl Actuator for RecordingActuator {
    fn set_led(&mut self, on: bool, _try_mode: bool) -> Result<(), ExternalError> {
        self.0.lock().unwrap().push(on);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingLedger(Arc<Mutex<Vec<(String, u32)>>>);

impl DurationRecorder for RecordingLedger {
    fn record_duration(&mut self, label: &str, minutes: u32) -> Result<(), ExternalError> {
        self.0.lock().unwrap().push((label.to_string(), minutes));
        Ok(())
    }
}

struct Greenhouse {
    controller: Controller,
    events: MemorySink,
    light: ScriptedLight,
    power: Arc<Mutex<PowerTier>>,
    writes: Arc<Mutex<Vec<bool>>>,
    ledger: Arc<Mutex<Vec<(String, u32)>>>,
}

impl Greenhouse {
    fn set_power(&self, tier: PowerTier) {
        *self.power.lock().unwrap() = tier;
    }

    fn recorded_minutes(&self) -> Vec<u32> {
        self.ledger.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }

    fn led_events(&self) -> Vec<Event> {
        self.events
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::LedSwitched { .. } | Event::LedHeld { .. }))
            .collect()
    }
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn settings(count: u32) -> ControllerSettings {
    ControllerSettings {
        schedule: ScheduleConfig {
            morning_offset: 0,
            evening_offset: 0,
            morning_minutes: 90,
            evening_minutes: 90,
        },
        sensing: SensingSettings {
            interval_minutes: 1,
            count,
            threshold: 0.5,
            night_sensing: false,
        },
        light_try: true,
        led_try: true,
        duration_grace_secs: 5,
    }
}

/// Sunrise 06:00, sunset 18:00: Morning 06:00-07:30, Evening 16:30-18:00.
fn greenhouse(settings: ControllerSettings) -> Greenhouse {
    let events = MemorySink::new();
    let light = ScriptedLight {
        script: Arc::new(Mutex::new(VecDeque::new())),
        default: "−−−−−".parse().unwrap(),
    };
    let power = Arc::new(Mutex::new(PowerTier::Ample));
    let actuator = RecordingActuator::default();
    let ledger = RecordingLedger::default();

    let ports = Ports {
        light: Box::new(light.clone()),
        power: Box::new(SharedPower(power.clone())),
        actuator: Box::new(actuator.clone()),
        recorder: Box::new(ledger.clone()),
        ephemeris: Box::new(FixedEphemeris::new(hm(6, 0), hm(18, 0))),
        events: Box::new(events.clone()),
    };

    Greenhouse {
        controller: Controller::new(ports, Some(settings)),
        events,
        light,
        power,
        writes: actuator.0,
        ledger: ledger.0,
    }
}

/// Restart automatic control at `now` so a fresh batch begins one minute later.
fn restart_batch(g: &mut Greenhouse, now: NaiveDateTime) {
    g.controller.stop(now).unwrap();
    g.controller.start(now).unwrap();
}

/// Tick at each due sample slot (`:30` past the minute) after `from`.
fn tick_samples(g: &mut Greenhouse, from: NaiveDateTime, samples: i64) {
    let first = from + Duration::seconds(90);
    for i in 0..samples {
        g.controller.tick(first + Duration::minutes(i));
    }
}

#[test]
fn test_morning_window_forces_led_on() {
    let mut g = greenhouse(settings(5));
    let now = at("2024-05-01 07:00:00");
    g.controller.tick(now);
    g.controller.start(now).unwrap();

    let window = g.controller.window().copied().unwrap();
    assert_eq!(window.morning_start, hm(6, 0));
    assert_eq!(window.morning_end, hm(7, 30));
    assert_eq!(g.controller.mode(), Mode::Morning);
    assert!(g.controller.led_on());
    assert_eq!(g.writes.lock().unwrap().last(), Some(&true));
    assert!(g.events.events().contains(&Event::LedSwitched {
        on: true,
        reason: Reason::Forced(Mode::Morning)
    }));
}

#[test]
fn test_bright_batch_turns_led_off() {
    let mut g = greenhouse(settings(5));
    let morning = at("2024-05-01 07:00:00");
    g.controller.tick(morning);
    g.controller.start(morning).unwrap();
    assert!(g.controller.led_on());

    let noon = at("2024-05-01 12:00:00");
    restart_batch(&mut g, noon);
    assert_eq!(g.controller.mode(), Mode::Day);
    assert!(g.controller.led_on(), "entering Day holds the LED");

    // 2 + 2 + 2 + 1 + 1 = 8 cloudy marks, below 12.5
    for pattern in ["○○−−−", "○−○−−", "−−−○○", "○−−−−", "−−−−○"] {
        g.light.push(pattern);
    }
    tick_samples(&mut g, noon, 5);

    let settled: Vec<_> = g
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::BatchSettled { .. }))
        .collect();
    assert_eq!(
        settled,
        vec![Event::BatchSettled {
            cloudy_sum: 8,
            threshold_abs: 12.5,
            verdict: Verdict::Bright
        }]
    );
    assert!(!g.controller.led_on());
    assert_eq!(
        g.led_events().last(),
        Some(&Event::LedSwitched {
            on: false,
            reason: Reason::Bright
        })
    );
}

#[test]
fn test_insufficient_power_vetoes_dark_batch() {
    let mut g = greenhouse(settings(5));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();
    g.set_power(PowerTier::Insufficient);

    // 5 + 5 + 5 + 5 + 0 = 20 cloudy marks, dark
    for pattern in ["○○○○○", "○○○○○", "○○○○○", "○○○○○", "−−−−−"] {
        g.light.push(pattern);
    }
    tick_samples(&mut g, noon, 5);

    assert!(!g.controller.led_on());
    assert_eq!(g.controller.power(), PowerTier::Insufficient);
    assert_eq!(
        g.led_events().last(),
        Some(&Event::LedHeld {
            on: false,
            reason: Reason::InsufficientPower
        })
    );
    assert!(!g.writes.lock().unwrap().contains(&true));
}

#[test]
fn test_power_drop_switches_lit_led_off() {
    let mut g = greenhouse(settings(1));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();

    g.light.push("○○○○○");
    tick_samples(&mut g, noon, 1);
    assert!(g.controller.led_on());

    g.set_power(PowerTier::Insufficient);
    g.light.push("○○○○○");
    g.controller.tick(at("2024-05-01 12:02:30"));

    assert!(!g.controller.led_on());
    assert_eq!(
        g.led_events().last(),
        Some(&Event::LedSwitched {
            on: false,
            reason: Reason::InsufficientPower
        })
    );
    assert_eq!(g.recorded_minutes(), vec![1]);
}

#[test]
fn test_adequate_power_still_lights_when_dark() {
    let mut g = greenhouse(settings(1));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();
    g.set_power(PowerTier::Adequate);

    g.light.push("○○○−−");
    tick_samples(&mut g, noon, 1);

    assert!(g.controller.led_on());
    assert_eq!(
        g.led_events().last(),
        Some(&Event::LedSwitched {
            on: true,
            reason: Reason::Dark
        })
    );
}

#[test]
fn test_restart_mid_evening_fires_transition_immediately() {
    let mut g = greenhouse(settings(5));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();
    assert!(!g.controller.led_on());

    g.controller.stop(at("2024-05-01 15:00:00")).unwrap();
    let evening = at("2024-05-01 17:00:00");
    g.controller.tick(evening);
    assert_eq!(g.controller.mode(), Mode::Evening, "classified for display");
    assert!(!g.controller.led_on(), "no forced state while stopped");
    g.events.clear();

    g.controller.start(evening).unwrap();

    let events = g.events.events();
    assert!(events.contains(&Event::ModeChanged {
        from: None,
        to: Mode::Evening
    }));
    assert!(events.contains(&Event::LedSwitched {
        on: true,
        reason: Reason::Forced(Mode::Evening)
    }));
    assert!(g.controller.led_on());
}

#[test]
fn test_fresh_controller_started_in_evening_lights_immediately() {
    let mut g = greenhouse(settings(5));
    let evening = at("2024-05-01 17:15:00");
    g.controller.tick(evening);
    g.controller.start(evening).unwrap();

    assert_eq!(*g.writes.lock().unwrap(), vec![false, true]);
    assert!(g.controller.led_on());
}

#[test]
fn test_led_never_changes_mid_batch() {
    let mut g = greenhouse(settings(5));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();

    for _ in 0..5 {
        g.light.push("○○○○○");
    }
    let first = noon + Duration::seconds(90);
    for i in 0..4 {
        g.controller.tick(first + Duration::minutes(i));
        assert!(!g.controller.led_on(), "changed after sample {i}");
    }
    g.controller.tick(first + Duration::minutes(4));
    assert!(g.controller.led_on());
}

#[test]
fn test_batch_interrupted_by_evening_starts_over_next_day() {
    let mut g = greenhouse(settings(5));
    let afternoon = at("2024-05-01 16:20:00");
    g.controller.tick(afternoon);
    g.controller.start(afternoon).unwrap();

    // Four bright samples, one short of a verdict
    tick_samples(&mut g, afternoon, 4);
    assert_eq!(g.controller.status().batch_index, 4);

    g.controller.tick(at("2024-05-01 16:30:30"));
    assert_eq!(g.controller.mode(), Mode::Evening);
    g.controller.tick(at("2024-05-02 06:00:10"));
    assert_eq!(g.controller.mode(), Mode::Morning);
    assert!(g.controller.led_on());
    g.events.clear();

    g.light.push("○○○○○");
    g.controller.tick(at("2024-05-02 07:30:10"));

    let events = g.events.events();
    assert!(events.contains(&Event::BatchSample {
        index: 0,
        count: 5,
        pattern: Some("○○○○○".parse().unwrap()),
        cloudy_sum: 5
    }));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, Event::BatchSettled { .. }))
    );
    assert!(g.controller.led_on());
    assert!(g.recorded_minutes().is_empty());
}

#[test]
fn test_failed_reads_still_settle_the_batch() {
    let mut g = greenhouse(settings(3));
    let noon = at("2024-05-01 12:00:00");
    g.controller.tick(noon);
    g.controller.start(noon).unwrap();

    g.light.push("○○○○○");
    g.light.push_failure();
    g.light.push("○○○○○");
    tick_samples(&mut g, noon, 3);

    let events = g.events.events();
    let failures = events
        .iter()
        .filter(|e| matches!(e, Event::ReadFailed { subsystem: "light", .. }))
        .count();
    assert_eq!(failures, 1);
    // 10 of 15 marks, threshold 7.5
    assert!(events.contains(&Event::BatchSettled {
        cloudy_sum: 10,
        threshold_abs: 7.5,
        verdict: Verdict::Dark
    }));
    assert!(g.controller.led_on());
}

#[test]
fn test_day_of_on_time_is_recorded() {
    let mut g = greenhouse(settings(1));
    let mut now = at("2024-05-01 05:59:30");
    g.controller.tick(now);
    g.controller.start(now).unwrap();

    // Every sample in Day mode reads bright
    let end = at("2024-05-01 18:30:00");
    while now < end {
        now += Duration::seconds(30);
        g.controller.tick(now);
    }

    // 06:00:00-07:30:30 until the first bright verdict, then 16:30-18:00
    assert_eq!(g.recorded_minutes(), vec![91, 90]);
    assert!(
        g.ledger
            .lock()
            .unwrap()
            .iter()
            .all(|(label, _)| label == "LED")
    );

    let wall_minutes = 90.5 + 90.0;
    let recorded: u32 = g.recorded_minutes().iter().sum();
    let tolerance = 2.0 * (0.5 + 5.0 / 60.0);
    assert!((f64::from(recorded) - wall_minutes).abs() <= tolerance);
    assert_eq!(g.controller.mode(), Mode::Night);
    assert!(!g.controller.led_on());
}

#[test]
fn test_midnight_rollover_recomputes_window() {
    let mut g = greenhouse(settings(5));
    g.controller.tick(at("2024-05-01 23:59:59"));
    g.events.clear();
    g.controller.tick(at("2024-05-02 00:00:00"));

    let events = g.events.events();
    assert!(events.iter().any(|e| matches!(e, Event::DateRolledOver { .. })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, Event::WindowComputed { ordered: true, .. }))
    );
}
