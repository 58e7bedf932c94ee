//! Configuration for the grow-light controller.
//!
//! Settings live in `growlight.toml`, searched in:
//! 1. the directory given with `--config <dir>`
//! 2. `$XDG_CONFIG_HOME/growlight/growlight.toml`
//!
//! A commented default file is written on first run. Every field is optional;
//! validation runs on the raw values and defaults are filled in afterwards.
//!
//! ```toml
//! #[Location]
//! place = "Nagoya"            # Name shown in logs
//! ephemeris = "geo"           # Sunrise source: "geo" (computed) or "manual"
//! latitude = 35.166700        # Geographic latitude (-90 to 90)
//! longitude = 136.916700      # Geographic longitude (-180 to 180)
//! elevation = 0               # Observer elevation in metres
//! timezone = "Asia/Tokyo"     # IANA timezone for local sunrise/sunset
//! sunrise = "06:00"           # Manual sunrise (HH:MM)
//! sunset = "18:00"            # Manual sunset (HH:MM)
//!
//! #[Forced lighting]
//! morning_offset = 0          # Minutes before sunrise the morning block ends
//! morning_minutes = 90        # Length of the morning block
//! evening_offset = 0          # Minutes after sunset the evening block starts
//! evening_minutes = 90        # Length of the evening block
//!
//! #[Light sensing]
//! sensing_interval = 1        # Minutes between batch samples (1-60)
//! sensing_count = 2           # Samples per batch (1-60)
//! sensing_threshold = 0.5     # Fraction of cloudy marks that means dark (0-1)
//! night_sensing = false       # Also sample outside the day window
//! ```
//!
//! The remaining sections cover battery bands, try flags, hardware bridge
//! commands, gateway timing and the duration ledger.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::time::Duration;

use crate::common::constants::*;
use crate::core::ControllerSettings;
use crate::core::power::BatteryBands;
use crate::core::sampling::SensingSettings;
use crate::core::window::ScheduleConfig;
use crate::ephemeris::{EphemerisSource, FixedEphemeris, SolarEphemeris, hhmm};
use crate::hardware::BridgeSettings;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use watcher::start_config_watcher;

/// Where sunrise and sunset come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EphemerisMode {
    /// Computed from latitude/longitude.
    Geo,
    /// Fixed `sunrise`/`sunset` times from the file.
    Manual,
}

impl EphemerisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EphemerisMode::Geo => "geo",
            EphemerisMode::Manual => "manual",
        }
    }
}

/// Contents of `growlight.toml`.
///
/// Fields stay optional so a partial file is valid; `loading::load_from_path`
/// fills the defaults once validation has passed.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    // Location
    pub place: Option<String>,
    pub ephemeris: Option<EphemerisMode>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<i32>, // metres
    pub timezone: Option<String>,
    pub sunrise: Option<String>, // "HH:MM", manual ephemeris only
    pub sunset: Option<String>,

    // Forced lighting (minutes)
    pub morning_offset: Option<u32>,
    pub evening_offset: Option<u32>,
    pub morning_minutes: Option<u32>,
    pub evening_minutes: Option<u32>,

    // Sensing
    pub sensing_interval: Option<u32>, // minutes
    pub sensing_count: Option<u32>,
    pub sensing_threshold: Option<f64>,
    pub night_sensing: Option<bool>,

    // Battery bands (percent)
    pub battery_yellow: Option<u8>,
    pub battery_green: Option<u8>,

    // Try flags
    pub light_try: Option<bool>,
    pub led_try: Option<bool>,

    // Hardware bridge
    pub light_command: Option<String>,
    pub power_command: Option<String>,
    pub led_on_command: Option<String>,
    pub led_off_command: Option<String>,
    pub led_relays: Option<Vec<u8>>,

    // Timing
    pub call_timeout_ms: Option<u64>,
    pub duration_grace_secs: Option<u32>,

    // Ledger
    pub cumulative_since: Option<String>, // "YYYY-MM-DD"
}

impl Config {
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            morning_offset: self.morning_offset.unwrap_or(DEFAULT_MORNING_OFFSET),
            evening_offset: self.evening_offset.unwrap_or(DEFAULT_EVENING_OFFSET),
            morning_minutes: self.morning_minutes.unwrap_or(DEFAULT_MORNING_MINUTES),
            evening_minutes: self.evening_minutes.unwrap_or(DEFAULT_EVENING_MINUTES),
        }
    }

    pub fn sensing(&self) -> SensingSettings {
        SensingSettings {
            interval_minutes: self.sensing_interval.unwrap_or(DEFAULT_SENSING_INTERVAL),
            count: self.sensing_count.unwrap_or(DEFAULT_SENSING_COUNT),
            threshold: self.sensing_threshold.unwrap_or(DEFAULT_SENSING_THRESHOLD),
            night_sensing: self.night_sensing.unwrap_or(DEFAULT_NIGHT_SENSING),
        }
    }

    pub fn bands(&self) -> BatteryBands {
        BatteryBands {
            yellow: self.battery_yellow.unwrap_or(DEFAULT_BATTERY_YELLOW),
            green: self.battery_green.unwrap_or(DEFAULT_BATTERY_GREEN),
        }
    }

    /// Settings handed to the controller on startup and on every reload.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            schedule: self.schedule(),
            sensing: self.sensing(),
            light_try: self.light_try.unwrap_or(DEFAULT_LIGHT_TRY),
            led_try: self.led_try.unwrap_or(DEFAULT_LED_TRY),
            duration_grace_secs: self
                .duration_grace_secs
                .unwrap_or(DEFAULT_DURATION_GRACE_SECS),
        }
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            light_command: self.light_command.clone(),
            power_command: self.power_command.clone(),
            led_on_command: self.led_on_command.clone(),
            led_off_command: self.led_off_command.clone(),
            led_relays: self
                .led_relays
                .clone()
                .unwrap_or_else(|| DEFAULT_LED_RELAYS.to_vec()),
            bands: self.bands(),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms.unwrap_or(DEFAULT_CALL_TIMEOUT_MS))
    }

    pub fn ephemeris_mode(&self) -> EphemerisMode {
        self.ephemeris.unwrap_or(EphemerisMode::Geo)
    }

    pub fn timezone(&self) -> Result<Tz> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        name.parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown timezone '{}'", name))
    }

    pub fn cumulative_since(&self) -> Result<Option<NaiveDate>> {
        self.cumulative_since
            .as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .with_context(|| format!("Invalid cumulative_since '{s}', expected YYYY-MM-DD"))
            })
            .transpose()
    }

    /// Build the sunrise/sunset provider selected by `ephemeris`.
    pub fn ephemeris_source(&self) -> Result<Box<dyn EphemerisSource>> {
        match self.ephemeris_mode() {
            EphemerisMode::Manual => {
                let sunrise = hhmm::parse(self.sunrise.as_deref().unwrap_or(DEFAULT_SUNRISE))
                    .map_err(|e| anyhow::anyhow!("Invalid sunrise: {e}"))?;
                let sunset = hhmm::parse(self.sunset.as_deref().unwrap_or(DEFAULT_SUNSET))
                    .map_err(|e| anyhow::anyhow!("Invalid sunset: {e}"))?;
                Ok(Box::new(FixedEphemeris::new(sunrise, sunset)))
            }
            EphemerisMode::Geo => {
                let source = SolarEphemeris::new(
                    self.place.as_deref().unwrap_or(DEFAULT_PLACE),
                    self.latitude.unwrap_or(DEFAULT_LATITUDE),
                    self.longitude.unwrap_or(DEFAULT_LONGITUDE),
                    self.timezone()?,
                )
                .with_elevation(f64::from(self.elevation.unwrap_or(DEFAULT_ELEVATION)));
                Ok(Box::new(source))
            }
        }
    }

    pub fn log_config(&self) {
        let mode = self.ephemeris_mode();
        log_block_start!("Loaded configuration");

        match mode {
            EphemerisMode::Geo => {
                let lat = self.latitude.unwrap_or(DEFAULT_LATITUDE);
                let lon = self.longitude.unwrap_or(DEFAULT_LONGITUDE);
                log_indented!(
                    "Location: {} ({:.3}°{}, {:.3}°{})",
                    self.place.as_deref().unwrap_or(DEFAULT_PLACE),
                    lat.abs(),
                    if lat >= 0.0 { "N" } else { "S" },
                    lon.abs(),
                    if lon >= 0.0 { "E" } else { "W" }
                );
                log_indented!(
                    "Timezone: {}",
                    self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
                );
            }
            EphemerisMode::Manual => {
                log_indented!(
                    "Manual ephemeris: sunrise {}, sunset {}",
                    self.sunrise.as_deref().unwrap_or(DEFAULT_SUNRISE),
                    self.sunset.as_deref().unwrap_or(DEFAULT_SUNSET)
                );
            }
        }

        let schedule = self.schedule();
        log_indented!(
            "Morning: {} min ending {} min before sunrise",
            schedule.morning_minutes,
            schedule.morning_offset
        );
        log_indented!(
            "Evening: {} min starting {} min after sunset",
            schedule.evening_minutes,
            schedule.evening_offset
        );

        let sensing = self.sensing();
        log_indented!(
            "Sensing: {} samples every {} min, threshold {}{}",
            sensing.count,
            sensing.interval_minutes,
            sensing.threshold,
            if sensing.night_sensing { ", night sensing" } else { "" }
        );

        let bands = self.bands();
        log_indented!("Battery bands: yellow <{}%, green <{}%", bands.yellow, bands.green);

        let settings = self.controller_settings();
        if settings.light_try || settings.led_try {
            log_indented!(
                "Try mode: light {}, LED {}",
                if settings.light_try { "simulated" } else { "live" },
                if settings.led_try { "simulated" } else { "live" }
            );
        }
    }
}

#[cfg(test)]
mod tests;
