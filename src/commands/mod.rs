//! One-shot subcommands.
//!
//! Control commands reach the running controller through the command file
//! and signals in [`crate::io`]; `status`, `summary` and `prune` read local
//! state directly.

pub mod control;
pub mod help;
pub mod reload;
pub mod status;
pub mod summary;

use anyhow::Result;

/// PID of the running controller or an error naming how to start one.
pub(crate) fn running_pid() -> Result<u32> {
    crate::io::lock::read_lock_pid()
        .ok_or_else(|| anyhow::anyhow!("growlight is not running (start it with `growlight`)"))
}
