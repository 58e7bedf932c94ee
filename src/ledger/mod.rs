//! On-time ledger.
//!
//! Each closed LED on-period is appended as one JSON line to
//! `$XDG_DATA_HOME/growlight/durations.jsonl`:
//!
//! ```json
//! {"recorded_at":"2024-05-01T07:30:02","label":"LED","minutes":90}
//! ```
//!
//! The summary aggregates minutes per day and keeps a cumulative total from a
//! configurable start date.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::utils::private_path;
use crate::error::ExternalError;

/// Sink for closed on-periods.
#[cfg_attr(test, mockall::automock)]
pub trait DurationRecorder: Send {
    fn record_duration(&mut self, label: &str, minutes: u32) -> Result<(), ExternalError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub recorded_at: NaiveDateTime,
    pub label: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub minutes: u32,
    /// Running total from the cumulative start date; 0 before it.
    pub cumulative: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub label: String,
    pub since: Option<NaiveDate>,
    pub days: Vec<DailyTotal>,
    pub cumulative_minutes: u32,
}

/// Append-only JSON-lines ledger.
#[derive(Debug, Clone)]
pub struct JsonLedger {
    path: PathBuf,
}

impl JsonLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Ledger under the XDG data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record stamped with `recorded_at`.
    pub fn append(&self, record: &LedgerRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create ledger directory {}", private_path(parent))
            })?;
        }
        let line = serde_json::to_string(record).context("Failed to encode ledger record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {}", private_path(&self.path)))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to write ledger {}", private_path(&self.path)))
    }

    /// All records in file order. Unreadable lines are skipped with a warning.
    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger {}", private_path(&self.path)))?;

        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => log_warning!("Skipping ledger line {}: {}", number + 1, e),
            }
        }
        Ok(records)
    }

    /// Per-day minutes for `label` with a running total from `since`.
    pub fn daily_summary(&self, label: &str, since: Option<NaiveDate>) -> Result<LedgerSummary> {
        let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for record in self.records()?.into_iter().filter(|r| r.label == label) {
            *per_day.entry(record.recorded_at.date()).or_default() += record.minutes;
        }

        let mut running = 0;
        let days = per_day
            .into_iter()
            .map(|(date, minutes)| {
                if since.is_none_or(|s| date >= s) {
                    running += minutes;
                }
                DailyTotal {
                    date,
                    minutes,
                    cumulative: running,
                }
            })
            .collect();

        Ok(LedgerSummary {
            label: label.to_string(),
            since,
            days,
            cumulative_minutes: running,
        })
    }

    /// Drop records dated before `date`. Returns how many were removed.
    pub fn prune_before(&self, date: NaiveDate) -> Result<usize> {
        let records = self.records()?;
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|r| r.recorded_at.date() >= date)
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        let mut content = String::new();
        for record in &kept {
            content.push_str(
                &serde_json::to_string(record).context("Failed to encode ledger record")?,
            );
            content.push('\n');
        }

        // Replace via rename
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", private_path(&tmp)))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace ledger {}", private_path(&self.path)))?;
        Ok(removed)
    }
}

impl DurationRecorder for JsonLedger {
    fn record_duration(&mut self, label: &str, minutes: u32) -> Result<(), ExternalError> {
        let record = LedgerRecord {
            recorded_at: crate::time::source::now(),
            label: label.to_string(),
            minutes,
        };
        self.append(&record)
            .map_err(|e| ExternalError::Communication(format!("{e:#}")))
    }
}

pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data_dir.join("growlight").join("durations.jsonl"))
}
