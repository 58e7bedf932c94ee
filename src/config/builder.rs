//! Default configuration file generation.
//!
//! Output is aligned so every comment starts in the same column:
//!
//! ```toml
//! #[Sensing]
//! sensing_interval = 1     # Minutes between batch samples (1-60)
//! sensing_count = 2        # Samples per batch (1-60)
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;

/// Write a commented default `growlight.toml` to `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content()).context("Failed to write default config file")?;
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    let relays = DEFAULT_LED_RELAYS
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    ConfigBuilder::new()
        .add_section("Location")
        .add_setting("place", &format!("\"{DEFAULT_PLACE}\""), "Name shown in logs")
        .add_setting(
            "ephemeris",
            &format!("\"{DEFAULT_EPHEMERIS_MODE}\""),
            "Sunrise source: \"geo\" (computed) or \"manual\"",
        )
        .add_setting(
            "latitude",
            &format!("{DEFAULT_LATITUDE:.6}"),
            "Geographic latitude (-90 to 90)",
        )
        .add_setting(
            "longitude",
            &format!("{DEFAULT_LONGITUDE:.6}"),
            "Geographic longitude (-180 to 180)",
        )
        .add_setting(
            "elevation",
            &DEFAULT_ELEVATION.to_string(),
            &format!("Observer elevation in metres ({MINIMUM_ELEVATION}-{MAXIMUM_ELEVATION})"),
        )
        .add_setting(
            "timezone",
            &format!("\"{DEFAULT_TIMEZONE}\""),
            "IANA timezone for local sunrise/sunset",
        )
        .add_setting(
            "sunrise",
            &format!("\"{DEFAULT_SUNRISE}\""),
            "Manual sunrise (HH:MM)",
        )
        .add_setting(
            "sunset",
            &format!("\"{DEFAULT_SUNSET}\""),
            "Manual sunset (HH:MM)",
        )
        .add_section("Forced lighting")
        .add_setting(
            "morning_offset",
            &DEFAULT_MORNING_OFFSET.to_string(),
            &format!("Minutes before sunrise the morning block ends (0-{MAXIMUM_WINDOW_MINUTES})"),
        )
        .add_setting(
            "morning_minutes",
            &DEFAULT_MORNING_MINUTES.to_string(),
            &format!("Length of the morning block in minutes (0-{MAXIMUM_WINDOW_MINUTES})"),
        )
        .add_setting(
            "evening_offset",
            &DEFAULT_EVENING_OFFSET.to_string(),
            &format!("Minutes after sunset the evening block starts (0-{MAXIMUM_WINDOW_MINUTES})"),
        )
        .add_setting(
            "evening_minutes",
            &DEFAULT_EVENING_MINUTES.to_string(),
            &format!("Length of the evening block in minutes (0-{MAXIMUM_WINDOW_MINUTES})"),
        )
        .add_section("Light sensing")
        .add_setting(
            "sensing_interval",
            &DEFAULT_SENSING_INTERVAL.to_string(),
            &format!(
                "Minutes between batch samples ({MINIMUM_SENSING_INTERVAL}-{MAXIMUM_SENSING_INTERVAL})"
            ),
        )
        .add_setting(
            "sensing_count",
            &DEFAULT_SENSING_COUNT.to_string(),
            &format!("Samples per batch ({MINIMUM_SENSING_COUNT}-{MAXIMUM_SENSING_COUNT})"),
        )
        .add_setting(
            "sensing_threshold",
            &DEFAULT_SENSING_THRESHOLD.to_string(),
            "Fraction of cloudy marks that means dark (0-1, exclusive)",
        )
        .add_setting(
            "night_sensing",
            &DEFAULT_NIGHT_SENSING.to_string(),
            "Also accumulate batches outside the day window",
        )
        .add_section("Battery")
        .add_setting(
            "battery_yellow",
            &DEFAULT_BATTERY_YELLOW.to_string(),
            "Below this percentage power is insufficient",
        )
        .add_setting(
            "battery_green",
            &DEFAULT_BATTERY_GREEN.to_string(),
            "Below this percentage power is adequate, else ample",
        )
        .add_section("Hardware")
        .add_setting(
            "light_try",
            &DEFAULT_LIGHT_TRY.to_string(),
            "Simulate light and power readings",
        )
        .add_setting(
            "led_try",
            &DEFAULT_LED_TRY.to_string(),
            "Simulate LED relay writes",
        )
        .add_setting(
            "led_relays",
            &format!("[{relays}]"),
            &format!("Relays switched with the LED bank (1-{MAXIMUM_RELAY})"),
        )
        .add_section("Timing")
        .add_setting(
            "call_timeout_ms",
            &DEFAULT_CALL_TIMEOUT_MS.to_string(),
            &format!(
                "Wait for hardware replies ({MINIMUM_CALL_TIMEOUT_MS}-{MAXIMUM_CALL_TIMEOUT_MS})ms"
            ),
        )
        .add_setting(
            "duration_grace_secs",
            &DEFAULT_DURATION_GRACE_SECS.to_string(),
            &format!(
                "Seconds added to each recorded on-period ({MINIMUM_DURATION_GRACE_SECS}-{MAXIMUM_DURATION_GRACE_SECS})"
            ),
        )
        .build()
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(title);
                    first_section = false;
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        let mut content = result.join("\n");
        content.push('\n');
        content
    }
}
