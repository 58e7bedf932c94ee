//! Light sampling batches and the bright/dark verdict.
//!
//! A light reading is five marks, one per sensor channel. A batch collects
//! `count` readings spaced `interval` minutes apart, sums the cloudy marks and,
//! on the last reading, compares the sum against `5 * count * threshold`:
//!
//! - sum below the threshold: [`Verdict::Bright`], the LED turns off
//! - otherwise: [`Verdict::Dark`], the LED turns on if power allows
//!
//! Failed reads still take up their slot, so a batch always settles after
//! exactly `count` attempts.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::constants::{LIGHT_CHANNELS, SENSING_SECOND};
use crate::error::ExternalError;

/// Sensing parameters taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensingSettings {
    pub interval_minutes: u32,
    pub count: u32,
    /// Fraction in (0, 1) of all marks in a batch.
    pub threshold: f64,
    /// Accumulate batches outside Day mode as well.
    pub night_sensing: bool,
}

/// One reading: `true` marks a cloudy (dark) channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightPattern(pub [bool; LIGHT_CHANNELS]);

impl LightPattern {
    pub fn cloudy_count(&self) -> u32 {
        self.0.iter().filter(|&&cloudy| cloudy).count() as u32
    }
}

impl FromStr for LightPattern {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut marks = [false; LIGHT_CHANNELS];
        let mut len = 0;
        for ch in trimmed.chars() {
            if len == LIGHT_CHANNELS {
                len += 1;
                break;
            }
            marks[len] = match ch {
                '○' | '1' | 'o' | 'O' | '*' => true,
                '−' | '-' | '0' | '.' => false,
                other => {
                    return Err(ExternalError::SensorRead(format!(
                        "unexpected mark '{other}' in light pattern \"{trimmed}\""
                    )));
                }
            };
            len += 1;
        }
        if len != LIGHT_CHANNELS {
            return Err(ExternalError::SensorRead(format!(
                "light pattern \"{trimmed}\" must have {LIGHT_CHANNELS} marks"
            )));
        }
        Ok(LightPattern(marks))
    }
}

impl fmt::Display for LightPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &cloudy in &self.0 {
            write!(f, "{}", if cloudy { '○' } else { '−' })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Few cloudy marks; natural light suffices.
    Bright,
    /// Many cloudy marks; supplemental light wanted.
    Dark,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Bright => write!(f, "bright"),
            Verdict::Dark => write!(f, "dark"),
        }
    }
}

/// Absolute threshold for a batch of `count` readings.
pub fn threshold_abs(count: u32, threshold: f64) -> f64 {
    (LIGHT_CHANNELS as f64) * f64::from(count) * threshold
}

/// `cloudy_sum < 5 * count * threshold` is bright.
pub fn verdict(cloudy_sum: u32, count: u32, threshold: f64) -> Verdict {
    if f64::from(cloudy_sum) < threshold_abs(count, threshold) {
        Verdict::Bright
    } else {
        Verdict::Dark
    }
}

/// Outcome of feeding one attempt into a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchProgress {
    /// Slot `index` was filled; more attempts needed.
    Pending { index: u32, cloudy_sum: u32 },
    /// The final slot was filled and the batch settled.
    Complete {
        index: u32,
        cloudy_sum: u32,
        threshold_abs: f64,
        verdict: Verdict,
    },
}

/// A running batch of light readings.
#[derive(Debug, Clone)]
pub struct SamplingBatch {
    count: u32,
    threshold: f64,
    cursor: u32,
    cloudy_sum: u32,
    readings: Vec<Option<LightPattern>>,
}

impl SamplingBatch {
    pub fn new(count: u32, threshold: f64) -> Self {
        Self {
            count: count.max(1),
            threshold,
            cursor: 0,
            cloudy_sum: 0,
            readings: Vec::new(),
        }
    }

    /// Index the next attempt will fill.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn cloudy_sum(&self) -> u32 {
        self.cloudy_sum
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Readings of the current (or just completed) run; `None` for failed slots.
    pub fn readings(&self) -> &[Option<LightPattern>] {
        &self.readings
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.cloudy_sum = 0;
    }

    /// Feed one attempt. `None` is a failed read: it adds nothing but uses a slot.
    pub fn record(&mut self, reading: Option<LightPattern>) -> BatchProgress {
        let index = self.cursor;
        if index == 0 {
            self.readings.clear();
            self.cloudy_sum = 0;
        }
        if let Some(pattern) = reading {
            self.cloudy_sum += pattern.cloudy_count();
        }
        self.readings.push(reading);

        if index + 1 >= self.count {
            let cloudy_sum = self.cloudy_sum;
            self.reset();
            BatchProgress::Complete {
                index,
                cloudy_sum,
                threshold_abs: threshold_abs(self.count, self.threshold),
                verdict: verdict(cloudy_sum, self.count, self.threshold),
            }
        } else {
            self.cursor += 1;
            BatchProgress::Pending {
                index,
                cloudy_sum: self.cloudy_sum,
            }
        }
    }
}

/// When the next batch sample is due.
///
/// Samples land at :30 seconds past the minute so the 1 Hz tick never races a
/// minute boundary.
#[derive(Debug, Clone, Default)]
pub struct SensingSchedule {
    next_due: Option<NaiveDateTime>,
}

impl SensingSchedule {
    /// First sample one minute after `now`.
    pub fn arm(&mut self, now: NaiveDateTime) {
        self.next_due = Some(at_sensing_second(now + Duration::minutes(1)));
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Schedule the following sample `interval_minutes` after `now`.
    pub fn advance(&mut self, now: NaiveDateTime, interval_minutes: u32) {
        self.next_due = Some(at_sensing_second(
            now + Duration::minutes(i64::from(interval_minutes)),
        ));
    }

    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.next_due
    }
}

fn at_sensing_second(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(SENSING_SECOND)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
