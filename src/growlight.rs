//! Application coordinator for the controller process.
//!
//! Acquires the instance lock, loads the configuration, wires the hardware
//! bridge and ledger behind their gateways and runs the 1 Hz control loop.
//! The loop is the only writer of controller state; signals, operator
//! commands and config reloads arrive on the signal channel and are applied
//! between ticks.
//!
//! - Normal startup: `Growlight::new(debug_enabled).run()`
//! - Simulation: `Growlight::new(debug_enabled).without_lock().run()`

use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::Duration;

use crate::common::constants::*;
use crate::config::{self, Config};
use crate::core::events::LogSink;
use crate::core::power::PowerTier;
use crate::core::sampling::LightPattern;
use crate::core::{Controller, Ports};
use crate::hardware::{Actuator, HardwareBridge, LightSensor, PowerMonitor};
use crate::io::control::ControlCommand;
use crate::io::gateway::{CallTimeout, Gateway};
use crate::io::signals::{SignalMessage, SignalState, setup_signal_handler};
use crate::io::snapshot::{self, StatusSnapshot};
use crate::ledger::{DurationRecorder, JsonLedger};
use crate::time::source;

/// Builder for running the controller.
pub struct Growlight {
    debug_enabled: bool,
    create_lock: bool,
    start_stopped: bool,
}

impl Growlight {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            start_stopped: false,
        }
    }

    /// Skip the single-instance lock (simulated runs).
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Wait for a `start` command instead of starting automatically.
    pub fn start_stopped(mut self, stopped: bool) -> Self {
        self.start_stopped = stopped;
        self
    }

    pub fn run(self) -> Result<()> {
        let _lock = if self.create_lock {
            match crate::io::lock::acquire_lock()? {
                Some(lock) => Some(lock),
                None => return Ok(()),
            }
        } else {
            None
        };

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled, logging every sample and decision");
        }

        run_controller(self.debug_enabled, self.start_stopped)
    }
}

/// Collaborators whose settings follow the configuration file.
struct Wiring {
    bridge: HardwareBridge,
    timeout: CallTimeout,
    sink: LogSink,
    ephemeris_label: String,
}

enum Flow {
    Continue,
    Shutdown,
}

fn run_controller(debug_enabled: bool, start_stopped: bool) -> Result<()> {
    let signal_state = setup_signal_handler(debug_enabled)?;
    let config = load_config();
    if let Some(ref config) = config {
        config.log_config();
    }

    let fallback = Config::default();
    let active = config.as_ref().unwrap_or(&fallback);
    let ephemeris = active.ephemeris_source()?;

    let mut wiring = Wiring {
        bridge: HardwareBridge::new(active.bridge_settings()),
        timeout: CallTimeout::new(active.call_timeout()),
        sink: LogSink::new(debug_enabled),
        ephemeris_label: ephemeris.describe(),
    };

    let light: Box<dyn LightSensor> = Box::new(wiring.bridge.clone());
    let power: Box<dyn PowerMonitor> = Box::new(wiring.bridge.clone());
    let actuator: Box<dyn Actuator> = Box::new(wiring.bridge.clone());
    let ledger = JsonLedger::open_default()?;
    log_indented!("Ledger: {}", crate::common::utils::private_path(ledger.path()));
    let recorder: Box<dyn DurationRecorder> = Box::new(ledger);

    let ports = Ports {
        light: Box::new(Gateway::<_, LightPattern>::spawn(
            "light",
            light,
            wiring.timeout.clone(),
        )?),
        power: Box::new(Gateway::<_, PowerTier>::spawn(
            "power",
            power,
            wiring.timeout.clone(),
        )?),
        actuator: Box::new(Gateway::<_, ()>::spawn(
            "actuator",
            actuator,
            wiring.timeout.clone(),
        )?),
        // Ledger writes are exempt from the tick budget
        recorder: Box::new(Gateway::<_, ()>::spawn(
            "ledger",
            recorder,
            wiring.timeout.without_tick_budget(),
        )?),
        ephemeris,
        events: Box::new(wiring.sink.clone()),
    };

    let mut controller = Controller::new(ports, config.as_ref().map(Config::controller_settings));
    let mut config_retry_at = None;
    if config.is_none() {
        let now = source::now();
        controller.config_unavailable(now, "no valid configuration");
        config_retry_at = Some(now + ChronoDuration::seconds(CONFIG_RETRY_SECS));
    }

    match config::get_config_path() {
        Ok(path) => {
            if let Err(e) = config::start_config_watcher(
                path,
                signal_state.signal_sender.clone(),
                debug_enabled,
            ) {
                log_pipe!();
                log_warning!("Hot reload unavailable: {e}");
            }
        }
        Err(e) => log_warning!("Hot reload unavailable: {e}"),
    }

    let snapshot_path = snapshot::snapshot_path();
    let mut snapshot_failed = false;
    let mut first_tick = true;

    while signal_state.running.load(Ordering::SeqCst) && !source::simulation_ended() {
        let now = source::now();
        wiring
            .timeout
            .begin_tick(Duration::from_millis(TICK_CALL_BUDGET_MS));
        controller.tick(now);

        if first_tick {
            first_tick = false;
            if !start_stopped
                && let Err(e) = controller.start(now)
            {
                log_warning!("Automatic start failed: {e}");
            }
        }

        if controller.settings().is_none() && config_retry_at.is_some_and(|at| now >= at) {
            config_retry_at = Some(now + ChronoDuration::seconds(CONFIG_RETRY_SECS));
            reload(&mut controller, &mut wiring, now);
        }

        let published = StatusSnapshot {
            pid: std::process::id(),
            ephemeris_source: wiring.ephemeris_label.clone(),
            status: controller.status(),
            history: wiring.sink.history(),
        };
        match snapshot::write_snapshot_at(&snapshot_path, &published) {
            Ok(()) => snapshot_failed = false,
            Err(e) => {
                if !snapshot_failed && debug_enabled {
                    log_warning!("Status snapshot not written: {e}");
                }
                snapshot_failed = true;
            }
        }

        if let Flow::Shutdown = wait_for_messages(&signal_state, &mut controller, &mut wiring) {
            break;
        }
    }

    let now = source::now();
    log_block_start!("Shutting down");
    wiring
        .timeout
        .begin_tick(Duration::from_millis(TICK_CALL_BUDGET_MS));
    controller.shutdown(now);
    snapshot::remove_snapshot_at(&snapshot_path);
    log_end!();
    Ok(())
}

fn load_config() -> Option<Config> {
    match config::load() {
        Ok(config) => Some(config),
        Err(e) => {
            log_pipe!();
            log_error!("Configuration unavailable: {e:#}");
            log_indented!("LED held off; retrying every {CONFIG_RETRY_SECS} seconds");
            None
        }
    }
}

/// Sleep until the next tick, handling every message that arrives meanwhile.
fn wait_for_messages(
    signal_state: &SignalState,
    controller: &mut Controller,
    wiring: &mut Wiring,
) -> Flow {
    let tick = Duration::from_millis(TICK_INTERVAL_MS);

    if source::is_simulated() {
        source::sleep(tick);
    } else {
        match signal_state.signal_receiver.recv_timeout(tick) {
            Ok(message) => {
                if let Flow::Shutdown = handle_message(message, controller, wiring) {
                    return Flow::Shutdown;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Flow::Shutdown,
        }
    }

    loop {
        match signal_state.signal_receiver.try_recv() {
            Ok(message) => {
                if let Flow::Shutdown = handle_message(message, controller, wiring) {
                    return Flow::Shutdown;
                }
            }
            Err(TryRecvError::Empty) => return Flow::Continue,
            Err(TryRecvError::Disconnected) => return Flow::Shutdown,
        }
    }
}

fn handle_message(message: SignalMessage, controller: &mut Controller, wiring: &mut Wiring) -> Flow {
    let now = source::now();
    wiring
        .timeout
        .begin_tick(Duration::from_millis(TICK_CALL_BUDGET_MS));
    match message {
        SignalMessage::Shutdown => return Flow::Shutdown,
        SignalMessage::Reload => reload(controller, wiring, now),
        SignalMessage::Command(command) => {
            let result = match command {
                ControlCommand::Start => controller.start(now),
                ControlCommand::Stop => controller.stop(now),
                ControlCommand::SetOperation(operation) => {
                    controller.set_operation(now, operation);
                    Ok(())
                }
                ControlCommand::ManualLed(on) => controller.manual_led(now, on),
            };
            if let Err(e) = result {
                log_warning!("'{}' refused: {}", command, e);
            }
        }
    }
    Flow::Continue
}

/// Re-read the configuration and commit it to the controller.
///
/// A file that fails to load leaves the previous configuration in force.
fn reload(controller: &mut Controller, wiring: &mut Wiring, now: NaiveDateTime) {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            log_pipe!();
            log_error!("Reload failed: {e:#}");
            if controller.settings().is_some() {
                log_indented!("Keeping the previous configuration");
            } else {
                controller.config_unavailable(now, &format!("{e:#}"));
            }
            return;
        }
    };

    let ephemeris = match config.ephemeris_source() {
        Ok(ephemeris) => ephemeris,
        Err(e) => {
            log_error!("Reload failed: {e:#}");
            return;
        }
    };

    wiring.bridge.update(config.bridge_settings());
    wiring.timeout.set(config.call_timeout());
    wiring.ephemeris_label = ephemeris.describe();
    controller.set_ephemeris_source(ephemeris);
    config.log_config();
    controller.update_config(now, config.controller_settings());
}
