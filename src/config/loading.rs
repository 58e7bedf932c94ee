//! Locating, reading and defaulting the configuration file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::constants::*;
use crate::common::utils::private_path;

pub const CONFIG_FILE_NAME: &str = "growlight.toml";

/// Directory given with `--config`, set once at startup.
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for this process. Only the first call wins.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The `--config` directory, if one was given.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("growlight").join(CONFIG_FILE_NAME))
}

/// Load the active configuration, writing the default file first if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
        log_block_start!(
            "Created default configuration at {}",
            private_path(&config_path)
        );
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load and validate a specific file. Never creates it.
pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found at {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    validate_config(&config)?;
    apply_defaults(&mut config);

    Ok(config)
}

/// Fill every unset field with its default.
pub(crate) fn apply_defaults(config: &mut Config) {
    config.place.get_or_insert_with(|| DEFAULT_PLACE.to_string());
    config.ephemeris.get_or_insert(super::EphemerisMode::Geo);
    config.latitude.get_or_insert(DEFAULT_LATITUDE);
    config.longitude.get_or_insert(DEFAULT_LONGITUDE);
    config.elevation.get_or_insert(DEFAULT_ELEVATION);
    config
        .timezone
        .get_or_insert_with(|| DEFAULT_TIMEZONE.to_string());
    config
        .sunrise
        .get_or_insert_with(|| DEFAULT_SUNRISE.to_string());
    config.sunset.get_or_insert_with(|| DEFAULT_SUNSET.to_string());

    config.morning_offset.get_or_insert(DEFAULT_MORNING_OFFSET);
    config.evening_offset.get_or_insert(DEFAULT_EVENING_OFFSET);
    config.morning_minutes.get_or_insert(DEFAULT_MORNING_MINUTES);
    config.evening_minutes.get_or_insert(DEFAULT_EVENING_MINUTES);

    config.sensing_interval.get_or_insert(DEFAULT_SENSING_INTERVAL);
    config.sensing_count.get_or_insert(DEFAULT_SENSING_COUNT);
    config
        .sensing_threshold
        .get_or_insert(DEFAULT_SENSING_THRESHOLD);
    config.night_sensing.get_or_insert(DEFAULT_NIGHT_SENSING);

    config.battery_yellow.get_or_insert(DEFAULT_BATTERY_YELLOW);
    config.battery_green.get_or_insert(DEFAULT_BATTERY_GREEN);

    config.light_try.get_or_insert(DEFAULT_LIGHT_TRY);
    config.led_try.get_or_insert(DEFAULT_LED_TRY);
    config
        .led_relays
        .get_or_insert_with(|| DEFAULT_LED_RELAYS.to_vec());

    config.call_timeout_ms.get_or_insert(DEFAULT_CALL_TIMEOUT_MS);
    config
        .duration_grace_secs
        .get_or_insert(DEFAULT_DURATION_GRACE_SECS);
}
