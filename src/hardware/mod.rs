//! Sensor and actuator interfaces.
//!
//! The controller only sees these traits. [`bridge::HardwareBridge`] provides
//! the real implementations (simulated in try mode, shell commands in
//! production) and [`crate::io::gateway`] wraps them with per-call timeouts.

pub mod bridge;

use crate::core::power::PowerTier;
use crate::core::sampling::LightPattern;
use crate::error::ExternalError;

pub use bridge::{BridgeSettings, HardwareBridge};

/// Ambient light sensor bank.
#[cfg_attr(test, mockall::automock)]
pub trait LightSensor: Send {
    fn sample_light(&mut self, try_mode: bool) -> Result<LightPattern, ExternalError>;
}

/// Battery or supply monitor.
#[cfg_attr(test, mockall::automock)]
pub trait PowerMonitor: Send {
    fn read_power(&mut self, try_mode: bool) -> Result<PowerTier, ExternalError>;
}

/// LED bank relay driver.
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send {
    /// Ok means the hardware acknowledged the new state.
    fn set_led(&mut self, on: bool, try_mode: bool) -> Result<(), ExternalError>;
}
