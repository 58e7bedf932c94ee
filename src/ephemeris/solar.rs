//! Astronomical sunrise and sunset from coordinates.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::{Ephemeris, EphemerisSource};
use crate::core::window::truncate_to_minute;
use crate::error::ExternalError;

#[derive(Debug, Clone)]
pub struct SolarEphemeris {
    place: String,
    latitude: f64,
    longitude: f64,
    elevation: f64,
    timezone: Tz,
}

impl SolarEphemeris {
    pub fn new(place: &str, latitude: f64, longitude: f64, timezone: Tz) -> Self {
        Self {
            place: place.to_string(),
            latitude,
            longitude,
            elevation: 0.0,
            timezone,
        }
    }

    /// Observer height in metres above the horizon plane.
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }
}

impl EphemerisSource for SolarEphemeris {
    fn ephemeris(&self, date: NaiveDate) -> Result<Ephemeris, ExternalError> {
        let coord = Coordinates::new(self.latitude, self.longitude).ok_or_else(|| {
            ExternalError::SensorRead(format!(
                "invalid coordinates {:.4}, {:.4}",
                self.latitude, self.longitude
            ))
        })?;
        let solar_day = SolarDay::new(coord, date).with_altitude(self.elevation);
        let sunrise_utc = solar_day.event_time(SolarEvent::Sunrise);
        let sunset_utc = solar_day.event_time(SolarEvent::Sunset);

        let sunrise = truncate_to_minute(sunrise_utc.with_timezone(&self.timezone).time());
        let sunset = truncate_to_minute(sunset_utc.with_timezone(&self.timezone).time());

        // Polar day or night yields no usable pair of events.
        if sunset_utc <= sunrise_utc || sunset == sunrise {
            return Err(ExternalError::SensorRead(format!(
                "no sunrise/sunset at {} on {date}",
                self.place
            )));
        }

        Ok(Ephemeris { sunrise, sunset })
    }

    fn describe(&self) -> String {
        let lat_dir = if self.latitude >= 0.0 { "N" } else { "S" };
        let lon_dir = if self.longitude >= 0.0 { "E" } else { "W" };
        format!(
            "{} ({:.3}°{}, {:.3}°{}, {})",
            self.place,
            self.latitude.abs(),
            lat_dir,
            self.longitude.abs(),
            lon_dir,
            self.timezone
        )
    }
}

/// Whole minutes between two times of day, for display.
pub fn day_length_minutes(ephemeris: &Ephemeris) -> i64 {
    let span = ephemeris.sunset.signed_duration_since(ephemeris.sunrise);
    if span < chrono::Duration::zero() {
        span.num_minutes() + 24 * 60
    } else {
        span.num_minutes()
    }
}

/// Midday between sunrise and sunset.
pub fn solar_noon(ephemeris: &Ephemeris) -> NaiveTime {
    ephemeris.sunrise + chrono::Duration::minutes(day_length_minutes(ephemeris) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn nagoya() -> SolarEphemeris {
        SolarEphemeris::new("Nagoya", 35.1667, 136.9167, chrono_tz::Asia::Tokyo)
    }

    #[test]
    fn test_nagoya_summer_solstice() {
        let eph = nagoya()
            .ephemeris(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap())
            .unwrap();
        // Roughly 04:40 and 19:10 JST
        assert!((4..=5).contains(&eph.sunrise.hour()), "{eph:?}");
        assert!((18..=19).contains(&eph.sunset.hour()), "{eph:?}");
        assert_eq!(eph.sunrise.second(), 0);
        assert!(day_length_minutes(&eph) > 14 * 60);
    }

    #[test]
    fn test_winter_day_is_shorter() {
        let summer = nagoya()
            .ephemeris(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap())
            .unwrap();
        let winter = nagoya()
            .ephemeris(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap())
            .unwrap();
        assert!(day_length_minutes(&winter) < day_length_minutes(&summer));
    }

    #[test]
    fn test_solar_noon_sits_between_events() {
        let eph = Ephemeris {
            sunrise: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            sunset: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        };
        assert_eq!(solar_noon(&eph), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_describe_mentions_place() {
        assert!(nagoya().describe().starts_with("Nagoya (35.167°N"));
    }
}
