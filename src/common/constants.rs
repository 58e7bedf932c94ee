//! Defaults, validation limits and fixed controller timings.

// # Location and ephemeris
pub const DEFAULT_PLACE: &str = "Nagoya";
pub const DEFAULT_LATITUDE: f64 = 35.1667;
pub const DEFAULT_LONGITUDE: f64 = 136.9167;
pub const DEFAULT_ELEVATION: i32 = 0;
pub const MINIMUM_ELEVATION: i32 = -500;
pub const MAXIMUM_ELEVATION: i32 = 9000;
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
pub const DEFAULT_EPHEMERIS_MODE: &str = "geo";
pub const DEFAULT_SUNRISE: &str = "06:00";
pub const DEFAULT_SUNSET: &str = "18:00";

// # Forced lighting windows (minutes)
pub const DEFAULT_MORNING_OFFSET: u32 = 0;
pub const DEFAULT_EVENING_OFFSET: u32 = 0;
pub const DEFAULT_MORNING_MINUTES: u32 = 90;
pub const DEFAULT_EVENING_MINUTES: u32 = 90;
pub const MAXIMUM_WINDOW_MINUTES: u32 = 720;

// # Light sensing
pub const DEFAULT_SENSING_INTERVAL: u32 = 1; // minutes between batch samples
pub const MINIMUM_SENSING_INTERVAL: u32 = 1;
pub const MAXIMUM_SENSING_INTERVAL: u32 = 60;
pub const DEFAULT_SENSING_COUNT: u32 = 2;
pub const MINIMUM_SENSING_COUNT: u32 = 1;
pub const MAXIMUM_SENSING_COUNT: u32 = 60;
pub const DEFAULT_SENSING_THRESHOLD: f64 = 0.5;
pub const DEFAULT_NIGHT_SENSING: bool = false;

/// Channels in one light sensor reading.
pub const LIGHT_CHANNELS: usize = 5;

/// Seconds past the minute at which scheduled samples are taken.
pub const SENSING_SECOND: u32 = 30;

// # Battery bands (percent)
pub const DEFAULT_BATTERY_YELLOW: u8 = 5;
pub const DEFAULT_BATTERY_GREEN: u8 = 20;

// # Try flags
pub const DEFAULT_LIGHT_TRY: bool = true;
pub const DEFAULT_LED_TRY: bool = true;
pub const DEFAULT_LED_RELAYS: [u8; 4] = [1, 2, 3, 4];
pub const MAXIMUM_RELAY: u8 = 4;

// # Timing
pub const TICK_INTERVAL_MS: u64 = 1000;
pub const TICK_CALL_BUDGET_MS: u64 = 900; // all sensor and actuator calls of one tick
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 500;
pub const MINIMUM_CALL_TIMEOUT_MS: u64 = 50;
pub const MAXIMUM_CALL_TIMEOUT_MS: u64 = 900;
pub const DEFAULT_DURATION_GRACE_SECS: u32 = 5;
pub const MINIMUM_DURATION_GRACE_SECS: u32 = 2;
pub const MAXIMUM_DURATION_GRACE_SECS: u32 = 5;

/// Seconds between config load attempts while no config is available.
pub const CONFIG_RETRY_SECS: i64 = 60;

// # Presentation
/// Lines of controller history kept for status queries.
pub const EVENT_HISTORY_LINES: usize = 18;

/// Label under which LED on-time is recorded.
pub const LED_LABEL: &str = "LED";

// # Process
pub const EXIT_FAILURE: i32 = 1;

#[cfg(test)]
pub mod test_constants {
    pub const TEST_SUNRISE: &str = "06:00";
    pub const TEST_SUNSET: &str = "18:00";
    pub const TEST_MORNING_MINUTES: u32 = 90;
    pub const TEST_EVENING_MINUTES: u32 = 90;
    pub const TEST_SENSING_COUNT: u32 = 5;
}
