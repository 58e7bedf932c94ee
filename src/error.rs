//! Failures reported by external collaborators.
//!
//! Application plumbing (config files, IPC, command handling) uses
//! `anyhow::Result`. Calls that cross into a sensor, the actuator, the
//! ephemeris provider or the duration ledger return `ExternalError` instead, so
//! the controller can absorb them without ever terminating.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    /// A sensor answered but its reading was unusable.
    #[error("sensor read failed: {0}")]
    SensorRead(String),

    /// Transport to a collaborator failed (process spawn, exit status, I/O).
    #[error("communication failure: {0}")]
    Communication(String),

    /// No answer within the per-call budget; the call remains outstanding.
    #[error("{subsystem} call timed out after {millis} ms")]
    Timeout { subsystem: &'static str, millis: u64 },

    /// A previous call on the same subsystem has not returned yet.
    #[error("{0} call still outstanding, skipped")]
    Busy(&'static str),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(String),
}

impl ExternalError {
    /// Short category label used in event history.
    pub fn category(&self) -> &'static str {
        match self {
            ExternalError::SensorRead(_) => "sensor",
            ExternalError::Communication(_) => "communication",
            ExternalError::Timeout { .. } => "timeout",
            ExternalError::Busy(_) => "busy",
            ExternalError::NotConfigured(_) => "not configured",
            ExternalError::ConfigUnavailable(_) => "config",
        }
    }
}
