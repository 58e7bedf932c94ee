//! `reload`: validate the configuration, then ask the controller to re-read it.

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let pid = super::running_pid()?;

    // Fail here with the validation message rather than in the daemon log
    let config = crate::config::load()?;
    if debug_enabled {
        config.log_config();
    }

    kill(Pid::from_raw(pid as i32), Signal::SIGUSR2)
        .with_context(|| format!("Failed to signal growlight process {pid}"))?;

    log_block_start!("Sent reload signal to growlight (PID: {pid})");
    log_end!();
    Ok(())
}
