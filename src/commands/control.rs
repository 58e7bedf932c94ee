//! `start`, `stop`, `auto`, `manual` and `led on|off`.

use anyhow::Result;

use crate::io::control::{self, ControlCommand};

pub fn handle_control_command(command: ControlCommand) -> Result<()> {
    log_version!();

    let pid = super::running_pid()?;
    control::send_command(pid, command)?;

    log_block_start!("Sent '{}' to growlight (PID: {})", command, pid);
    if let ControlCommand::ManualLed(_) = command {
        log_indented!("Takes effect only in manual operation");
    }
    log_end!();
    Ok(())
}
