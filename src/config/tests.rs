use super::builder::default_config_content;
use super::loading::apply_defaults;
use super::validation::validate_config;
use super::watcher::{forward_settled_changes, is_config_file};
use super::*;
use chrono::NaiveTime;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("growlight.toml");
    fs::write(&path, content).unwrap();
    path
}

fn assert_rejected(content: &str, needle: &str) {
    let config: Config = toml::from_str(content).unwrap();
    let err = validate_config(&config).unwrap_err().to_string();
    assert!(err.contains(needle), "expected '{needle}' in '{err}'");
}

#[test]
#[serial]
fn test_config_load_default_creation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("growlight").join("growlight.toml");

    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = load();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    let config = result.unwrap();
    assert!(config_path.exists());
    assert_eq!(config.place.as_deref(), Some("Nagoya"));
    assert_eq!(config.sensing_count, Some(2));
}

#[test]
fn test_default_content_round_trips_through_loader() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), &default_config_content());

    let loaded = load_from_path(&path).unwrap();

    let mut expected = Config::default();
    apply_defaults(&mut expected);
    assert_eq!(loaded, expected);
}

#[test]
fn test_default_content_aligns_comments() {
    let content = default_config_content();
    let columns: Vec<usize> = content
        .lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .map(|line| line.find(" # ").unwrap())
        .collect();
    assert!(columns.windows(2).all(|w| w[0] == w[1]));
    assert!(content.starts_with("#[Location]\n"));
}

#[test]
fn test_partial_config_gets_defaults() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(
        temp_dir.path(),
        "ephemeris = \"manual\"\nsunrise = \"05:30\"\nsunset = \"19:10\"\nsensing_count = 5\n",
    );

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.ephemeris, Some(EphemerisMode::Manual));
    assert_eq!(config.sensing_count, Some(5));
    assert_eq!(config.morning_minutes, Some(90));
    assert_eq!(config.led_relays, Some(vec![1, 2, 3, 4]));

    let settings = config.controller_settings();
    assert_eq!(settings.sensing.count, 5);
    assert_eq!(settings.sensing.interval_minutes, 1);
    assert!(settings.light_try);
    assert_eq!(settings.duration_grace_secs, 5);
}

#[test]
fn test_missing_file_is_an_error_not_created() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("growlight.toml");
    assert!(load_from_path(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_unknown_field_rejected() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), "sensing_cuont = 3\n");
    let err = format!("{:#}", load_from_path(&path).unwrap_err());
    assert!(err.contains("sensing_cuont"), "{err}");
}

#[test]
fn test_range_validation_messages() {
    assert_rejected("sensing_threshold = 1.0", "sensing_threshold");
    assert_rejected("sensing_threshold = 0.0", "sensing_threshold");
    assert_rejected("sensing_interval = 0", "sensing_interval");
    assert_rejected("sensing_count = 61", "sensing_count");
    assert_rejected("morning_minutes = 721", "morning_minutes");
    assert_rejected("call_timeout_ms = 950", "call_timeout_ms");
    assert_rejected("duration_grace_secs = 1", "duration_grace_secs");
    assert_rejected("latitude = 91.0", "latitude");
    assert_rejected("longitude = -181.0", "longitude");
    assert_rejected("elevation = 10000", "elevation");
    assert_rejected("led_relays = [0, 2]", "led_relays");
    assert_rejected("led_relays = []", "led_relays");
    assert_rejected("light_command = \"  \"", "light_command");
    assert_rejected("cumulative_since = \"2024/01/01\"", "cumulative_since");
}

#[test]
fn test_battery_bands_must_be_ordered() {
    assert_rejected("battery_yellow = 20\nbattery_green = 20", "battery_yellow");
    assert_rejected("battery_green = 3", "battery_yellow");
    assert_rejected("battery_green = 101", "battery_green");

    let config: Config = toml::from_str("battery_yellow = 10\nbattery_green = 40").unwrap();
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_timezone_validation() {
    assert_rejected("timezone = \"Mars/Olympus\"", "timezone");
    let config: Config = toml::from_str("timezone = \"Europe/Berlin\"").unwrap();
    assert!(validate_config(&config).is_ok());
    assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
}

#[test]
fn test_manual_times_validation() {
    assert_rejected(
        "ephemeris = \"manual\"\nsunrise = \"19:00\"\nsunset = \"07:00\"",
        "sunrise",
    );
    assert_rejected("sunrise = \"6am\"", "sunrise");

    // Ordering only matters when the manual times are in use
    let config: Config =
        toml::from_str("ephemeris = \"geo\"\nsunrise = \"19:00\"\nsunset = \"07:00\"").unwrap();
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_manual_ephemeris_source() {
    let config: Config =
        toml::from_str("ephemeris = \"manual\"\nsunrise = \"05:45\"\nsunset = \"18:20\"").unwrap();
    let source = config.ephemeris_source().unwrap();
    let eph = source
        .ephemeris(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        .unwrap();
    assert_eq!(eph.sunrise, NaiveTime::from_hms_opt(5, 45, 0).unwrap());
    assert_eq!(eph.sunset, NaiveTime::from_hms_opt(18, 20, 0).unwrap());
}

#[test]
fn test_geo_ephemeris_source_describes_place() {
    let config = Config::default();
    let source = config.ephemeris_source().unwrap();
    assert!(source.describe().starts_with("Nagoya"));
}

#[test]
fn test_bridge_settings_carry_bands_and_relays() {
    let config: Config = toml::from_str(
        "battery_yellow = 10\nbattery_green = 30\nled_relays = [2, 4]\nled_on_command = \"relay on\"",
    )
    .unwrap();
    let bridge = config.bridge_settings();
    assert_eq!(bridge.led_relays, vec![2, 4]);
    assert_eq!(bridge.bands.yellow, 10);
    assert_eq!(bridge.bands.green, 30);
    assert_eq!(bridge.led_on_command.as_deref(), Some("relay on"));
    assert!(bridge.light_command.is_none());
}

#[test]
fn test_cumulative_since_parses() {
    let config: Config = toml::from_str("cumulative_since = \"2024-04-01\"").unwrap();
    assert_eq!(
        config.cumulative_since().unwrap(),
        chrono::NaiveDate::from_ymd_opt(2024, 4, 1)
    );
    assert_eq!(Config::default().cumulative_since().unwrap(), None);
}

#[test]
fn test_watcher_matches_editor_temp_files() {
    assert!(is_config_file(Path::new("/cfg/growlight.toml")));
    assert!(is_config_file(Path::new("/cfg/growlight.toml.swp~")));
    assert!(!is_config_file(Path::new("/cfg/other.toml")));
}

fn modify_event(path: &str) -> notify::Event {
    notify::Event::new(notify::EventKind::Modify(notify::event::ModifyKind::Any))
        .add_path(std::path::PathBuf::from(path))
}

#[test]
fn test_stepwise_write_reloads_once_after_last_step() {
    use crate::io::signals::SignalMessage;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    let (event_tx, event_rx) = mpsc::channel();
    let (signal_tx, signal_rx) = mpsc::channel();
    let quiet = Duration::from_millis(150);
    let worker = std::thread::spawn(move || {
        forward_settled_changes(event_rx, &signal_tx, quiet, false);
    });

    for step in 0..3 {
        if step > 0 {
            std::thread::sleep(Duration::from_millis(50));
        }
        event_tx.send(modify_event("/cfg/growlight.toml")).unwrap();
    }
    let last_write = Instant::now();
    // Unrelated files do not extend the quiet period
    event_tx.send(modify_event("/cfg/other.toml")).unwrap();

    let first = signal_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(first, SignalMessage::Reload));
    assert!(last_write.elapsed() >= Duration::from_millis(100));
    assert!(signal_rx.recv_timeout(Duration::from_millis(400)).is_err());

    drop(event_tx);
    worker.join().unwrap();
}
