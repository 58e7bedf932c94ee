//! Hot reload: watch the config directory and request a reload on edits.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::loading::CONFIG_FILE_NAME;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Quiet period after the last write before reloading; editors often write a
/// file in several steps.
const DEBOUNCE_MS: u64 = 500;

pub struct ConfigWatcher {
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
    config_path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(
        config_path: PathBuf,
        signal_sender: Sender<SignalMessage>,
        debug_enabled: bool,
    ) -> Self {
        Self {
            signal_sender,
            debug_enabled,
            config_path,
        }
    }

    /// Spawn the watcher thread. The parent directory is watched so that
    /// replace-by-rename saves are seen.
    pub fn start(self) -> Result<()> {
        let Some(config_dir) = self.config_path.parent().map(Path::to_path_buf) else {
            return Ok(());
        };

        if !config_dir.is_dir() {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Config directory missing, hot reload disabled");
            }
            return Ok(());
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&config_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", config_dir.display()))?;

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching {} for changes", private_path(&self.config_path));
        }

        let signal_sender = self.signal_sender;
        let debug_enabled = self.debug_enabled;

        thread::spawn(move || {
            let _watcher = watcher;
            forward_settled_changes(
                rx,
                &signal_sender,
                Duration::from_millis(DEBOUNCE_MS),
                debug_enabled,
            );
        });

        Ok(())
    }
}

/// Send one `Reload` once `quiet` has passed since the last config file event.
///
/// Returns when either channel closes.
pub(crate) fn forward_settled_changes(
    events: Receiver<Event>,
    signal_sender: &Sender<SignalMessage>,
    quiet: Duration,
    debug_enabled: bool,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let next = match deadline {
            Some(at) => events.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            Ok(event) => {
                if event.paths.iter().any(|path| is_config_file(path)) {
                    deadline = Some(Instant::now() + quiet);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                deadline = None;
                if debug_enabled {
                    log_pipe!();
                    log_info!("Configuration file change detected");
                }
                if signal_sender.send(SignalMessage::Reload).is_err() {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Matches the config file itself and editor temp files derived from its name.
pub(crate) fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with(CONFIG_FILE_NAME))
}

pub fn start_config_watcher(
    config_path: PathBuf,
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
) -> Result<()> {
    ConfigWatcher::new(config_path, signal_sender, debug_enabled).start()
}
