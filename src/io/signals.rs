//! Signal handling for the controller process.
//!
//! - `SIGUSR1`: drain the command file and forward operator commands
//! - `SIGUSR2`, `SIGHUP`: reload configuration
//! - `SIGINT`, `SIGTERM`: graceful shutdown (LED off, on-time recorded)

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use super::control::{self, ControlCommand};

/// Messages delivered to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    /// Re-read the configuration file.
    Reload,
    /// Operator command from a subcommand.
    Command(ControlCommand),
    /// Turn the LED off and exit.
    Shutdown,
}

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives.
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Also used by the config watcher.
    pub signal_sender: Sender<SignalMessage>,
}

/// Install the handlers and spawn the signal thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = channel();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("Failed to register signal handlers")?;

    let running_clone = running.clone();
    let sender = signal_sender.clone();
    let command_path = control::command_path(std::process::id());

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR1 => {
                    for command in control::take_commands(&command_path) {
                        log_pipe!();
                        log_info!("Received command: {}", command);
                        if sender.send(SignalMessage::Command(command)).is_err() {
                            return;
                        }
                    }
                }
                SIGUSR2 | SIGHUP => {
                    if debug_enabled {
                        log_pipe!();
                        log_info!("Received configuration reload signal");
                    }
                    if sender.send(SignalMessage::Reload).is_err() {
                        return;
                    }
                }
                SIGINT | SIGTERM => {
                    log_pipe!();
                    if sig == SIGINT {
                        log_info!("Received interrupt signal, initiating graceful shutdown...");
                    } else {
                        log_info!("Received termination request, initiating graceful shutdown...");
                    }
                    if let Err(e) = sender.send(SignalMessage::Shutdown) {
                        log_warning!("Failed to send shutdown message: {e}");
                    }
                    running_clone.store(false, Ordering::SeqCst);
                    return;
                }
                _ => {}
            }
        }
    });

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
