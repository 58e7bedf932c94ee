//! Lock file for single-instance enforcement.
//!
//! The lock lives in the runtime directory and holds the owner's PID on the
//! first line and the custom config directory (or an empty line) on the
//! second. Subcommands read it to find the running controller.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::utils;
use crate::config;

/// Held for the lifetime of the controller; removes the lock file on drop.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn lock_path() -> PathBuf {
    utils::runtime_dir().join("growlight.lock")
}

/// Acquire the instance lock.
///
/// Returns `Ok(None)` when another live instance holds it. A lock left behind
/// by a dead process is removed and acquisition retried once.
pub fn acquire_lock() -> Result<Option<LockGuard>> {
    acquire_lock_at(&lock_path())
}

pub fn acquire_lock_at(path: &Path) -> Result<Option<LockGuard>> {
    if let Some(guard) = try_lock(path)? {
        return Ok(Some(guard));
    }

    match read_lock_pid_at(path) {
        Some(pid) if utils::is_process_running(pid) && pid != std::process::id() => {
            log_pipe!();
            log_error!("growlight is already running (PID: {pid})");
            log_block_start!("Did you mean to:");
            log_indented!("• Reload configuration: growlight reload");
            log_indented!("• Start or stop control: growlight start | growlight stop");
            log_indented!("• Inspect the controller: growlight status");
            Ok(None)
        }
        stale => {
            match stale {
                Some(pid) => {
                    log_warning!("Removing stale lock file (process {pid} no longer running)")
                }
                None => log_warning!("Lock file format invalid, removing"),
            }
            let _ = std::fs::remove_file(path);
            try_lock(path)
        }
    }
}

fn try_lock(path: &Path) -> Result<Option<LockGuard>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create runtime directory")?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    match config::get_custom_config_dir() {
        Some(dir) => writeln!(file, "{}", dir.display())?,
        None => writeln!(file)?,
    }
    file.flush()?;

    Ok(Some(LockGuard {
        file,
        path: path.to_path_buf(),
    }))
}

/// PID of the running controller, if any.
pub fn read_lock_pid() -> Option<u32> {
    read_lock_pid_at(&lock_path()).filter(|&pid| utils::is_process_running(pid))
}

fn read_lock_pid_at(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_records_pid_and_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("growlight.lock");
        let guard = acquire_lock_at(&path).unwrap().expect("lock");
        assert_eq!(read_lock_pid_at(&path), Some(std::process::id()));
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        crate::common::logger::Log::set_enabled(false);
        let dir = tempdir().unwrap();
        let path = dir.path().join("growlight.lock");
        // PIDs this large are never allocated
        std::fs::write(&path, "4194304999\n\n").unwrap();
        let guard = acquire_lock_at(&path).unwrap();
        assert!(guard.is_some());
        assert_eq!(read_lock_pid_at(&path), Some(std::process::id()));
    }
}
