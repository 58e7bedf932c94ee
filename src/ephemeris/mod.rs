//! Sunrise and sunset for a calendar day.

pub mod solar;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ExternalError;

pub use solar::SolarEphemeris;

/// Sunrise and sunset, local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ephemeris {
    #[serde(with = "hhmm")]
    pub sunrise: NaiveTime,
    #[serde(with = "hhmm")]
    pub sunset: NaiveTime,
}

/// Provider of the day's ephemeris.
#[cfg_attr(test, mockall::automock)]
pub trait EphemerisSource: Send {
    fn ephemeris(&self, date: NaiveDate) -> Result<Ephemeris, ExternalError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Manually configured times, identical every day.
#[derive(Debug, Clone)]
pub struct FixedEphemeris {
    ephemeris: Ephemeris,
}

impl FixedEphemeris {
    pub fn new(sunrise: NaiveTime, sunset: NaiveTime) -> Self {
        Self {
            ephemeris: Ephemeris { sunrise, sunset },
        }
    }
}

impl EphemerisSource for FixedEphemeris {
    fn ephemeris(&self, _date: NaiveDate) -> Result<Ephemeris, ExternalError> {
        Ok(self.ephemeris)
    }

    fn describe(&self) -> String {
        format!(
            "manual sunrise {} sunset {}",
            self.ephemeris.sunrise.format("%H:%M"),
            self.ephemeris.sunset.format("%H:%M")
        )
    }
}

/// `"HH:MM"` (de)serialisation for times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `HH:MM`, tolerating a trailing `:SS`.
    pub fn parse(s: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
            .map_err(|e| format!("invalid time \"{s}\": {e} (expected HH:MM)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeris_wire_format() {
        let eph = Ephemeris {
            sunrise: NaiveTime::from_hms_opt(4, 38, 0).unwrap(),
            sunset: NaiveTime::from_hms_opt(19, 5, 0).unwrap(),
        };
        let json = serde_json::to_string(&eph).unwrap();
        assert_eq!(json, r#"{"sunrise":"04:38","sunset":"19:05"}"#);
        let back: Ephemeris = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eph);
    }

    #[test]
    fn test_hhmm_rejects_garbage() {
        assert!(hhmm::parse("25:00").is_err());
        assert!(hhmm::parse("sunrise").is_err());
        assert!(hhmm::parse("06:15:00").is_ok());
    }

    #[test]
    fn test_fixed_source_ignores_date() {
        let src = FixedEphemeris::new(
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        let a = src
            .ephemeris(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        let b = src
            .ephemeris(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .unwrap();
        assert_eq!(a, b);
    }
}
