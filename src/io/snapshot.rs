//! Status snapshot shared between the controller and `growlight status`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::utils;
use crate::core::ControllerStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub pid: u32,
    pub ephemeris_source: String,
    pub status: ControllerStatus,
    /// Recent controller log lines, oldest first.
    pub history: Vec<String>,
}

pub fn snapshot_path() -> PathBuf {
    utils::runtime_dir().join("growlight-status.json")
}

/// Replace the snapshot at `path` atomically.
pub fn write_snapshot_at(path: &Path, snapshot: &StatusSnapshot) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize status")?;
    fs::write(&tmp, json)
        .with_context(|| format!("Failed to write status snapshot {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace status snapshot {}", path.display()))
}

pub fn read_snapshot_at(path: &Path) -> Result<Option<StatusSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read status snapshot {}", path.display()))?;
    let snapshot = serde_json::from_str(&content).context("Malformed status snapshot")?;
    Ok(Some(snapshot))
}

pub fn remove_snapshot_at(path: &Path) {
    let _ = fs::remove_file(path);
}
