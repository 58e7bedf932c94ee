//! Range and consistency checks for configuration values.

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;

use super::{Config, EphemerisMode};
use crate::common::constants::*;
use crate::ephemeris::hhmm;

/// Reject values that would leave the controller in an impossible state.
///
/// Checks run against the raw file contents; unset fields are skipped.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if let Some(elevation) = config.elevation
        && !(MINIMUM_ELEVATION..=MAXIMUM_ELEVATION).contains(&elevation)
    {
        anyhow::bail!(
            "elevation ({} m) must be between {} and {} metres",
            elevation,
            MINIMUM_ELEVATION,
            MAXIMUM_ELEVATION
        );
    }

    if let Some(ref tz) = config.timezone
        && tz.parse::<Tz>().is_err()
    {
        anyhow::bail!("timezone '{}' is not a known IANA timezone name", tz);
    }

    validate_manual_times(config)?;

    for (name, value) in [
        ("morning_offset", config.morning_offset),
        ("evening_offset", config.evening_offset),
        ("morning_minutes", config.morning_minutes),
        ("evening_minutes", config.evening_minutes),
    ] {
        if let Some(minutes) = value
            && minutes > MAXIMUM_WINDOW_MINUTES
        {
            anyhow::bail!(
                "{} ({} minutes) must be between 0 and {} minutes",
                name,
                minutes,
                MAXIMUM_WINDOW_MINUTES
            );
        }
    }

    if let Some(interval) = config.sensing_interval
        && !(MINIMUM_SENSING_INTERVAL..=MAXIMUM_SENSING_INTERVAL).contains(&interval)
    {
        anyhow::bail!(
            "sensing_interval ({} minutes) must be between {} and {} minutes",
            interval,
            MINIMUM_SENSING_INTERVAL,
            MAXIMUM_SENSING_INTERVAL
        );
    }

    if let Some(count) = config.sensing_count
        && !(MINIMUM_SENSING_COUNT..=MAXIMUM_SENSING_COUNT).contains(&count)
    {
        anyhow::bail!(
            "sensing_count ({}) must be between {} and {}",
            count,
            MINIMUM_SENSING_COUNT,
            MAXIMUM_SENSING_COUNT
        );
    }

    if let Some(threshold) = config.sensing_threshold
        && !(threshold > 0.0 && threshold < 1.0)
    {
        anyhow::bail!(
            "sensing_threshold ({}) must be greater than 0 and less than 1",
            threshold
        );
    }

    let yellow = config.battery_yellow.unwrap_or(DEFAULT_BATTERY_YELLOW);
    let green = config.battery_green.unwrap_or(DEFAULT_BATTERY_GREEN);
    if green > 100 {
        anyhow::bail!("battery_green ({}%) must be at most 100%", green);
    }
    if yellow >= green {
        anyhow::bail!(
            "battery_yellow ({}%) must be below battery_green ({}%)",
            yellow,
            green
        );
    }

    if let Some(ref relays) = config.led_relays {
        if relays.is_empty() {
            anyhow::bail!("led_relays must name at least one relay");
        }
        if let Some(bad) = relays
            .iter()
            .find(|&&relay| relay == 0 || relay > MAXIMUM_RELAY)
        {
            anyhow::bail!(
                "led_relays entry {} must be between 1 and {}",
                bad,
                MAXIMUM_RELAY
            );
        }
    }

    if let Some(timeout) = config.call_timeout_ms
        && !(MINIMUM_CALL_TIMEOUT_MS..=MAXIMUM_CALL_TIMEOUT_MS).contains(&timeout)
    {
        anyhow::bail!(
            "call_timeout_ms ({} ms) must be between {} and {} milliseconds",
            timeout,
            MINIMUM_CALL_TIMEOUT_MS,
            MAXIMUM_CALL_TIMEOUT_MS
        );
    }

    if let Some(grace) = config.duration_grace_secs
        && !(MINIMUM_DURATION_GRACE_SECS..=MAXIMUM_DURATION_GRACE_SECS).contains(&grace)
    {
        anyhow::bail!(
            "duration_grace_secs ({} s) must be between {} and {} seconds",
            grace,
            MINIMUM_DURATION_GRACE_SECS,
            MAXIMUM_DURATION_GRACE_SECS
        );
    }

    if let Some(ref since) = config.cumulative_since
        && NaiveDate::parse_from_str(since, "%Y-%m-%d").is_err()
    {
        anyhow::bail!("cumulative_since ('{}') must use YYYY-MM-DD format", since);
    }

    for (name, command) in [
        ("light_command", &config.light_command),
        ("power_command", &config.power_command),
        ("led_on_command", &config.led_on_command),
        ("led_off_command", &config.led_off_command),
    ] {
        if let Some(command) = command
            && command.trim().is_empty()
        {
            anyhow::bail!("{} must not be empty; remove the line instead", name);
        }
    }

    Ok(())
}

fn validate_manual_times(config: &Config) -> Result<()> {
    let parse = |field: &str, value: Option<&str>, default: &str| {
        hhmm::parse(value.unwrap_or(default))
            .map_err(|e| anyhow::anyhow!("Invalid {field} time: {e}"))
    };
    let sunrise = parse("sunrise", config.sunrise.as_deref(), DEFAULT_SUNRISE)?;
    let sunset = parse("sunset", config.sunset.as_deref(), DEFAULT_SUNSET)?;

    if config.ephemeris == Some(EphemerisMode::Manual) && sunrise >= sunset {
        anyhow::bail!(
            "sunrise ({}) must be earlier than sunset ({}) for manual ephemeris",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        );
    }

    Ok(())
}
