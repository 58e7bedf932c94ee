//! Structured logging with box-drawing output.
//!
//! The controller runs unattended next to the grow beds, so its log is the
//! operator's main view of what happened and why. Output is grouped into
//! visual blocks:
//!
//! - **`log_block_start!`** opens a new block (`┃` spacer, then `┣ message`).
//!   Use it for anything an operator scans for: mode changes, LED switches,
//!   configuration reloads, daily rollovers.
//! - **`log_decorated!`** continues a block with `┣ message`.
//! - **`log_indented!`** prints nested detail as `┃   message`.
//! - **`log_pipe!`** inserts an empty `┃` line, normally right before a
//!   `log_warning!`/`log_error!` that starts its own block.
//! - **`log_version!`** / **`log_end!`** frame a whole run.
//! - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**
//!   carry a coloured `[LEVEL]` tag instead of box drawing.
//!
//! When the simulated clock is active every line is prefixed with the
//! simulated `[HH:MM:SS]` so accelerated runs can be read back.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Routes output to the file writer thread when --log is active
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Logger control surface.
pub struct Log;

impl Log {
    /// Enable or disable all log output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Redirect all further output into `file_path`.
    ///
    /// The returned guard flushes and closes the file when dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => {
                        file.write_all(text.as_bytes())?;
                    }
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix used by every macro.
    ///
    /// Empty for the real clock (journald already timestamps lines); the
    /// simulated clock gets `[HH:MM:SS] ` so fast-forwarded days stay legible.
    pub fn get_timestamp_prefix() -> String {
        if crate::time::source::is_initialized() && crate::time::source::is_simulated() {
            format!("[{}] ", crate::time::source::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Keeps the file writer thread alive; flushes on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write an already formatted line to the active sink. Used by the macros.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Format `body` behind the timestamp prefix and the `lead` marker.
///
/// A `┃` spacer line is written first when `spacer` is true.
#[doc(hidden)]
pub fn emit(lead: &str, body: std::fmt::Arguments<'_>, spacer: bool) {
    if !Log::is_enabled() {
        return;
    }
    let prefix = Log::get_timestamp_prefix();
    let formatted = if spacer {
        format!("{prefix}┃\n{prefix}{lead}{body}\n")
    } else {
        format!("{prefix}{lead}{body}\n")
    };
    write_output(&formatted);
}

#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣ ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣ ", format_args!("{}", $expr), false)
    };
}

#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┃   ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┃   ", format_args!("{}", $expr), false)
    };
}

#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::common::logger::emit("┃", format_args!(""), false)
    };
}

#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣ ", format_args!($fmt $($arg)*), true)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣ ", format_args!("{}", $expr), true)
    };
}

#[macro_export]
macro_rules! log_version {
    () => {
        $crate::common::logger::emit(
            "┏ ",
            format_args!("growlight v{} ━━╸", env!("CARGO_PKG_VERSION")),
            false,
        )
    };
}

#[macro_export]
macro_rules! log_end {
    () => {
        $crate::common::logger::emit("╹", format_args!(""), false)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣[\x1b[33mWARNING\x1b[0m] ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣[\x1b[33mWARNING\x1b[0m] ", format_args!("{}", $expr), false)
    };
}

#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣[\x1b[31mERROR\x1b[0m] ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣[\x1b[31mERROR\x1b[0m] ", format_args!("{}", $expr), false)
    };
}

/// Error that terminates the current flow: spacer, then a closing corner.
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┗[\x1b[31mERROR\x1b[0m] ", format_args!($fmt $($arg)*), true)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┗[\x1b[31mERROR\x1b[0m] ", format_args!("{}", $expr), true)
    };
}

#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣[\x1b[32mINFO\x1b[0m] ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣[\x1b[32mINFO\x1b[0m] ", format_args!("{}", $expr), false)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣[\x1b[32mDEBUG\x1b[0m] ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣[\x1b[32mDEBUG\x1b[0m] ", format_args!("{}", $expr), false)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit("┣[\x1b[31mCRITICAL\x1b[0m] ", format_args!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::common::logger::emit("┣[\x1b[31mCRITICAL\x1b[0m] ", format_args!("{}", $expr), false)
    };
}
