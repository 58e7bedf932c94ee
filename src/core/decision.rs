//! LED on/off decision with override precedence.
//!
//! Decisions are only taken at two points: when the mode changes and when a
//! sampling batch settles. Between those the LED holds its state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mode::Mode;
use super::power::PowerTier;
use super::sampling::Verdict;

/// Why the LED has the state it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "mode")]
pub enum Reason {
    /// Clock-driven window (Night, Morning, Evening).
    Forced(Mode),
    /// Batch verdict bright.
    Bright,
    /// Batch verdict dark with enough power.
    Dark,
    /// Batch verdict dark but the supply vetoes lighting.
    InsufficientPower,
    /// Operator switched to manual or drove the LED by hand.
    Manual,
    /// Controller shutting down.
    Shutdown,
    /// Hardware synchronisation at startup.
    Initial,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Forced(mode) => write!(f, "{mode} window"),
            Reason::Bright => write!(f, "bright"),
            Reason::Dark => write!(f, "dark"),
            Reason::InsufficientPower => write!(f, "insufficient power"),
            Reason::Manual => write!(f, "manual"),
            Reason::Shutdown => write!(f, "shutdown"),
            Reason::Initial => write!(f, "startup"),
        }
    }
}

/// What prompted a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The running controller entered `Mode`.
    ModeEntered(Mode),
    /// A sampling batch settled while in `mode`.
    BatchSettled { mode: Mode, verdict: Verdict },
}

/// Result of a decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub on: bool,
    /// State before the decision.
    pub was_on: bool,
    pub reason: Reason,
}

impl Decision {
    pub fn is_switch(&self) -> bool {
        self.on != self.was_on
    }

    /// An on-to-off switch, which closes an on-period.
    pub fn turns_off(&self) -> bool {
        self.was_on && !self.on
    }

    pub fn turns_on(&self) -> bool {
        !self.was_on && self.on
    }
}

/// Apply the precedence rules.
///
/// 1. A forced mode dictates the state, ignoring verdict and power.
/// 2. In Day mode a settled batch decides: bright is off, dark is on unless
///    the power tier is `Insufficient`.
/// 3. Entering Day mode decides nothing; the LED holds (`None`).
pub fn decide(current: bool, trigger: Trigger, power: PowerTier) -> Option<Decision> {
    let mode = match trigger {
        Trigger::ModeEntered(mode) | Trigger::BatchSettled { mode, .. } => mode,
    };

    if let Some(forced) = mode.forced_led() {
        return Some(Decision {
            on: forced,
            was_on: current,
            reason: Reason::Forced(mode),
        });
    }

    let Trigger::BatchSettled { verdict, .. } = trigger else {
        return None;
    };

    let (on, reason) = match verdict {
        Verdict::Bright => (false, Reason::Bright),
        Verdict::Dark if power.allows_lighting() => (true, Reason::Dark),
        Verdict::Dark => (false, Reason::InsufficientPower),
    };

    Some(Decision {
        on,
        was_on: current,
        reason,
    })
}
