//! Supply classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExternalError;

/// Coarse state of the power supply.
///
/// `Insufficient` vetoes lighting in Day mode even when it is dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerTier {
    Ample,
    Adequate,
    #[default]
    Insufficient,
}

/// Battery percentage bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryBands {
    /// Below this the supply is insufficient.
    pub yellow: u8,
    /// Below this (and at or above `yellow`) the supply is adequate.
    pub green: u8,
}

impl PowerTier {
    /// Voltage-relay wiring: the high relay closes on a healthy bank, the low
    /// relay on a usable one.
    pub fn from_relays(low_ok: bool, high_ok: bool) -> Self {
        if high_ok {
            PowerTier::Ample
        } else if low_ok {
            PowerTier::Adequate
        } else {
            PowerTier::Insufficient
        }
    }

    pub fn from_percent(percent: f64, bands: &BatteryBands) -> Self {
        if percent < f64::from(bands.yellow) {
            PowerTier::Insufficient
        } else if percent < f64::from(bands.green) {
            PowerTier::Adequate
        } else {
            PowerTier::Ample
        }
    }

    pub fn allows_lighting(&self) -> bool {
        !matches!(self, PowerTier::Insufficient)
    }

    /// Panel lamp colour.
    pub fn lamp(&self) -> &'static str {
        match self {
            PowerTier::Ample => "blue",
            PowerTier::Adequate => "green",
            PowerTier::Insufficient => "yellow",
        }
    }

    /// Parse a power probe's output: a tier name, a lamp colour, or a
    /// battery percentage.
    pub fn parse_reading(output: &str, bands: &BatteryBands) -> Result<Self, ExternalError> {
        let trimmed = output.trim();
        if let Ok(tier) = trimmed.parse::<PowerTier>() {
            return Ok(tier);
        }
        let number = trimmed.trim_end_matches('%').trim();
        match number.parse::<f64>() {
            Ok(percent) if (0.0..=100.0).contains(&percent) => {
                Ok(PowerTier::from_percent(percent, bands))
            }
            _ => Err(ExternalError::SensorRead(format!(
                "unrecognised power reading \"{trimmed}\""
            ))),
        }
    }
}

impl FromStr for PowerTier {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ample" | "blue" => Ok(PowerTier::Ample),
            "adequate" | "green" => Ok(PowerTier::Adequate),
            "insufficient" | "yellow" => Ok(PowerTier::Insufficient),
            other => Err(ExternalError::SensorRead(format!(
                "unknown power tier \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for PowerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerTier::Ample => write!(f, "ample"),
            PowerTier::Adequate => write!(f, "adequate"),
            PowerTier::Insufficient => write!(f, "insufficient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: BatteryBands = BatteryBands {
        yellow: 5,
        green: 20,
    };

    #[test]
    fn test_from_relays() {
        assert_eq!(PowerTier::from_relays(true, true), PowerTier::Ample);
        assert_eq!(PowerTier::from_relays(false, true), PowerTier::Ample);
        assert_eq!(PowerTier::from_relays(true, false), PowerTier::Adequate);
        assert_eq!(PowerTier::from_relays(false, false), PowerTier::Insufficient);
    }

    #[test]
    fn test_from_percent_band_edges() {
        assert_eq!(PowerTier::from_percent(4.9, &BANDS), PowerTier::Insufficient);
        assert_eq!(PowerTier::from_percent(5.0, &BANDS), PowerTier::Adequate);
        assert_eq!(PowerTier::from_percent(19.9, &BANDS), PowerTier::Adequate);
        assert_eq!(PowerTier::from_percent(20.0, &BANDS), PowerTier::Ample);
    }

    #[test]
    fn test_parse_reading_forms() {
        assert_eq!(
            PowerTier::parse_reading("Green\n", &BANDS).unwrap(),
            PowerTier::Adequate
        );
        assert_eq!(
            PowerTier::parse_reading("insufficient", &BANDS).unwrap(),
            PowerTier::Insufficient
        );
        assert_eq!(
            PowerTier::parse_reading("63%", &BANDS).unwrap(),
            PowerTier::Ample
        );
        assert!(PowerTier::parse_reading("130", &BANDS).is_err());
        assert!(PowerTier::parse_reading("", &BANDS).is_err());
    }

    #[test]
    fn test_default_is_fail_safe() {
        assert_eq!(PowerTier::default(), PowerTier::Insufficient);
        assert!(!PowerTier::default().allows_lighting());
    }
}
