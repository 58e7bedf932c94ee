//! `status`: what the controller is doing, or would do, right now.
//!
//! With a controller running the snapshot it publishes every tick is shown.
//! Otherwise today's window is derived from the configuration and the
//! current minute classified against it.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::common::utils;
use crate::core::ControllerStatus;
use crate::core::mode::{Mode, classify};
use crate::core::window::{TimeWindow, compute};
use crate::ephemeris::{Ephemeris, solar};
use crate::io::snapshot::{self, StatusSnapshot};

/// Offline view built from the configuration.
#[derive(Debug, Serialize)]
struct PlannedDay {
    date: NaiveDate,
    at: NaiveDateTime,
    ephemeris_source: String,
    ephemeris: Option<Ephemeris>,
    window: Option<TimeWindow>,
    mode: Mode,
}

pub fn handle_status_command(json: bool) -> Result<()> {
    let live = match crate::io::lock::read_lock_pid() {
        Some(pid) => snapshot::read_snapshot_at(&snapshot::snapshot_path())?
            .filter(|snapshot| snapshot.pid == pid),
        None => None,
    };

    if let Some(snapshot) = live {
        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            display_live(&snapshot);
        }
        return Ok(());
    }

    let planned = plan_today()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
    } else {
        display_planned(&planned);
    }
    Ok(())
}

fn plan_today() -> Result<PlannedDay> {
    let config = crate::config::load()?;
    let source = config.ephemeris_source()?;
    let now = chrono::Local::now().naive_local();

    let (ephemeris, window) = match source.ephemeris(now.date()) {
        Ok(ephemeris) => (
            Some(ephemeris),
            Some(compute(&ephemeris, &config.schedule())),
        ),
        Err(e) => {
            log_warning!("{}", e);
            (None, None)
        }
    };

    Ok(PlannedDay {
        date: now.date(),
        at: now,
        ephemeris_source: source.describe(),
        ephemeris,
        window,
        mode: classify(now.time(), window.as_ref()),
    })
}

fn display_ephemeris(ephemeris: Option<&Ephemeris>, window: Option<&TimeWindow>) {
    match (ephemeris, window) {
        (Some(eph), Some(window)) => {
            log_indented!(
                "Sunrise {} / sunset {} (day {}, noon {})",
                eph.sunrise.format("%H:%M"),
                eph.sunset.format("%H:%M"),
                utils::format_minutes(solar::day_length_minutes(eph).max(0) as u32),
                solar::solar_noon(eph).format("%H:%M")
            );
            log_indented!("Window: {}", window.summary());
            if !window.is_ordered() {
                log_indented!("Window boundaries overlap; earlier modes take precedence");
            }
        }
        _ => log_indented!("No window today, LED held off (Night)"),
    }
}

fn display_live(snapshot: &StatusSnapshot) {
    let status: &ControllerStatus = &snapshot.status;
    log_version!();
    log_block_start!(
        "Controller PID {} at {}",
        snapshot.pid,
        status.at.format("%Y-%m-%d %H:%M:%S")
    );
    log_indented!(
        "Operation: {} ({})",
        status.operation,
        if status.running { "running" } else { "stopped" }
    );
    log_indented!("Mode: {} {}", status.mode.symbol(), status.mode.display_name());
    log_indented!(
        "LED: {}{}",
        if status.led.on { "on" } else { "off" },
        if status.actuator_pending {
            " (actuator write pending)"
        } else {
            ""
        }
    );
    if let Some(since) = status.on_since {
        log_indented!("On since {}", since.format("%H:%M:%S"));
    }
    log_indented!("Power: {} ({})", status.power, status.power.lamp());
    if let Some(pattern) = status.last_light {
        log_indented!("Light: {}", pattern);
    }
    log_indented!(
        "Batch: {}/{} samples, cloudy sum {}",
        status.batch_index,
        status.batch_count,
        status.cloudy_sum
    );
    if let Some(next) = status.next_sample {
        log_indented!("Next sample: {}", next.format("%H:%M:%S"));
    }

    log_block_start!("Ephemeris: {}", snapshot.ephemeris_source);
    display_ephemeris(status.ephemeris.as_ref(), status.window.as_ref());

    if !snapshot.history.is_empty() {
        log_block_start!("Recent events:");
        for line in &snapshot.history {
            log_indented!("{}", line);
        }
    }
    log_end!();
}

fn display_planned(planned: &PlannedDay) {
    log_version!();
    log_block_start!("growlight is not running; planned lighting for {}", planned.date);
    log_indented!("Ephemeris: {}", planned.ephemeris_source);
    display_ephemeris(planned.ephemeris.as_ref(), planned.window.as_ref());
    log_block_start!(
        "At {} the mode is {} {}",
        planned.at.format("%H:%M"),
        planned.mode.symbol(),
        planned.mode.display_name()
    );
    match planned.mode.forced_led() {
        Some(true) => log_indented!("LED would be forced on"),
        Some(false) => log_indented!("LED would be forced off"),
        None => log_indented!("LED follows the light sensor"),
    }
    log_end!();
}
