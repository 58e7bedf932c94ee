//! Operator commands delivered to the running controller.
//!
//! A subcommand appends one line per command to a per-PID file in the runtime
//! directory and sends `SIGUSR1`; the signal thread drains the file and
//! forwards the commands to the control loop in file order.

use anyhow::{Context, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::utils;
use crate::core::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    SetOperation(Operation),
    ManualLed(bool),
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Start => write!(f, "start"),
            ControlCommand::Stop => write!(f, "stop"),
            ControlCommand::SetOperation(op) => write!(f, "{op}"),
            ControlCommand::ManualLed(true) => write!(f, "led on"),
            ControlCommand::ManualLed(false) => write!(f, "led off"),
        }
    }
}

impl FromStr for ControlCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let words: Vec<&str> = s.split_whitespace().collect();
        match words.as_slice() {
            ["start"] => Ok(ControlCommand::Start),
            ["stop"] => Ok(ControlCommand::Stop),
            ["auto"] => Ok(ControlCommand::SetOperation(Operation::Auto)),
            ["manual"] => Ok(ControlCommand::SetOperation(Operation::Manual)),
            ["led", "on"] => Ok(ControlCommand::ManualLed(true)),
            ["led", "off"] => Ok(ControlCommand::ManualLed(false)),
            _ => anyhow::bail!("unknown control command '{}'", s.trim()),
        }
    }
}

pub fn command_path(pid: u32) -> PathBuf {
    utils::runtime_dir().join(format!("growlight-command-{pid}"))
}

/// Queue `command` for the controller with `pid` and signal it.
pub fn send_command(pid: u32, command: ControlCommand) -> Result<()> {
    append_command(&command_path(pid), command)?;
    signal::kill(Pid::from_raw(pid as i32), Signal::SIGUSR1)
        .with_context(|| format!("Failed to signal growlight process {pid}"))
}

pub fn append_command(path: &Path, command: ControlCommand) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open command file {}", path.display()))?;
    writeln!(file, "{command}").context("Failed to write command file")
}

/// Read and remove all queued commands. Unknown lines are reported and skipped.
pub fn take_commands(path: &Path) -> Vec<ControlCommand> {
    match claim_commands(path) {
        Some(drain) => read_claimed(&drain),
        None => Vec::new(),
    }
}

// Appends that race the drain land in a fresh file and wait for the next signal
fn claim_commands(path: &Path) -> Option<PathBuf> {
    let drain = path.with_extension("draining");
    std::fs::rename(path, &drain).ok()?;
    Some(drain)
}

fn read_claimed(drain: &Path) -> Vec<ControlCommand> {
    let content = std::fs::read_to_string(drain).unwrap_or_default();
    let _ = std::fs::remove_file(drain);

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match line.parse() {
            Ok(command) => Some(command),
            Err(e) => {
                log_warning!("{}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_commands_round_trip_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cmd");
        append_command(&path, ControlCommand::SetOperation(Operation::Manual)).unwrap();
        append_command(&path, ControlCommand::ManualLed(true)).unwrap();
        append_command(&path, ControlCommand::Start).unwrap();

        assert_eq!(
            take_commands(&path),
            vec![
                ControlCommand::SetOperation(Operation::Manual),
                ControlCommand::ManualLed(true),
                ControlCommand::Start,
            ]
        );
        assert!(!path.exists());
        assert!(take_commands(&path).is_empty());
    }

    #[test]
    fn test_append_during_drain_is_kept_for_next_drain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("growlight-command-42");
        append_command(&path, ControlCommand::Stop).unwrap();

        let drain = claim_commands(&path).unwrap();
        append_command(&path, ControlCommand::Start).unwrap();

        assert_eq!(read_claimed(&drain), vec![ControlCommand::Stop]);
        assert!(!drain.exists());
        assert_eq!(take_commands(&path), vec![ControlCommand::Start]);
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("led dim".parse::<ControlCommand>().is_err());
        assert_eq!(
            "  led   off ".parse::<ControlCommand>().unwrap(),
            ControlCommand::ManualLed(false)
        );
    }
}
