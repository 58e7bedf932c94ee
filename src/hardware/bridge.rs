//! Hardware bridge: simulated readings in try mode, shell commands otherwise.
//!
//! Production wiring is site specific, so each channel is an operator-supplied
//! command run through `sh -c`:
//!
//! - `light_command` prints five marks (`○−○−○` or `10101`)
//! - `power_command` prints a tier (`ample`/`adequate`/`insufficient`), a lamp
//!   colour (`blue`/`green`/`yellow`) or a battery percentage
//! - `led_on_command` / `led_off_command` switch the relays listed in the
//!   `GROWLIGHT_RELAYS` environment variable
//!
//! The bridge is cloned into every gateway worker; settings are shared so a
//! config reload reaches all of them.

use rand::Rng;
use std::process::Command;
use std::sync::{Arc, RwLock};

use super::{Actuator, LightSensor, PowerMonitor};
use crate::common::constants::LIGHT_CHANNELS;
use crate::core::power::{BatteryBands, PowerTier};
use crate::core::sampling::LightPattern;
use crate::error::ExternalError;

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    pub light_command: Option<String>,
    pub power_command: Option<String>,
    pub led_on_command: Option<String>,
    pub led_off_command: Option<String>,
    pub led_relays: Vec<u8>,
    pub bands: BatteryBands,
}

#[derive(Clone)]
pub struct HardwareBridge {
    settings: Arc<RwLock<BridgeSettings>>,
}

impl HardwareBridge {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the settings seen by every clone.
    pub fn update(&self, settings: BridgeSettings) {
        let mut guard = self.settings.write().unwrap_or_else(|e| e.into_inner());
        *guard = settings;
    }

    fn snapshot(&self) -> BridgeSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LightSensor for HardwareBridge {
    fn sample_light(&mut self, try_mode: bool) -> Result<LightPattern, ExternalError> {
        if try_mode {
            let mut rng = rand::thread_rng();
            let mut marks = [false; LIGHT_CHANNELS];
            for mark in marks.iter_mut() {
                *mark = rng.gen_bool(0.5);
            }
            return Ok(LightPattern(marks));
        }

        let settings = self.snapshot();
        let command = require(settings.light_command.as_deref(), "light_command")?;
        run_command(command, &[])?.parse()
    }
}

impl PowerMonitor for HardwareBridge {
    fn read_power(&mut self, try_mode: bool) -> Result<PowerTier, ExternalError> {
        if try_mode {
            let mut rng = rand::thread_rng();
            return Ok(PowerTier::from_relays(rng.gen_bool(0.5), rng.gen_bool(0.5)));
        }

        let settings = self.snapshot();
        let command = require(settings.power_command.as_deref(), "power_command")?;
        let output = run_command(command, &[])?;
        PowerTier::parse_reading(&output, &settings.bands)
    }
}

impl Actuator for HardwareBridge {
    fn set_led(&mut self, on: bool, try_mode: bool) -> Result<(), ExternalError> {
        if try_mode {
            return Ok(());
        }

        let settings = self.snapshot();
        let (command, field) = if on {
            (settings.led_on_command.as_deref(), "led_on_command")
        } else {
            (settings.led_off_command.as_deref(), "led_off_command")
        };
        let command = require(command, field)?;
        let relays = relay_list(&settings.led_relays);
        run_command(command, &[("GROWLIGHT_RELAYS", relays.as_str())]).map(|_| ())
    }
}

fn require<'a>(command: Option<&'a str>, field: &str) -> Result<&'a str, ExternalError> {
    command
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ExternalError::NotConfigured(field.to_string()))
}

/// `[1, 3]` becomes `"1,3"`.
fn relay_list(relays: &[u8]) -> String {
    relays
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn run_command(command: &str, env: &[(&str, &str)]) -> Result<String, ExternalError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .map_err(|e| ExternalError::Communication(format!("failed to run `{command}`: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExternalError::Communication(format!(
            "`{command}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BridgeSettings {
        BridgeSettings {
            light_command: Some("echo '○−○−−'".to_string()),
            power_command: Some("echo 42".to_string()),
            led_on_command: Some("test \"$GROWLIGHT_RELAYS\" = 1,2,3,4".to_string()),
            led_off_command: Some("exit 3".to_string()),
            led_relays: vec![1, 2, 3, 4],
            bands: BatteryBands {
                yellow: 5,
                green: 20,
            },
        }
    }

    #[test]
    fn test_try_mode_never_touches_commands() {
        let mut bridge = HardwareBridge::new(BridgeSettings {
            light_command: None,
            power_command: None,
            led_on_command: None,
            led_off_command: None,
            ..settings()
        });
        assert!(bridge.sample_light(true).is_ok());
        assert!(bridge.read_power(true).is_ok());
        assert!(bridge.set_led(true, true).is_ok());
    }

    #[test]
    fn test_commands_in_production() {
        let mut bridge = HardwareBridge::new(settings());
        assert_eq!(bridge.sample_light(false).unwrap().cloudy_count(), 2);
        assert_eq!(bridge.read_power(false).unwrap(), PowerTier::Ample);
        assert!(bridge.set_led(true, false).is_ok());
        assert!(matches!(
            bridge.set_led(false, false),
            Err(ExternalError::Communication(_))
        ));
    }

    #[test]
    fn test_missing_command_is_not_configured() {
        let mut bridge = HardwareBridge::new(BridgeSettings {
            light_command: None,
            ..settings()
        });
        assert_eq!(
            bridge.sample_light(false),
            Err(ExternalError::NotConfigured("light_command".to_string()))
        );
    }

    #[test]
    fn test_update_reaches_clones() {
        let bridge = HardwareBridge::new(settings());
        let mut clone = bridge.clone();
        bridge.update(BridgeSettings {
            power_command: Some("echo yellow".to_string()),
            ..settings()
        });
        assert_eq!(clone.read_power(false).unwrap(), PowerTier::Insufficient);
    }

    #[test]
    fn test_relay_list() {
        assert_eq!(relay_list(&[1, 3]), "1,3");
        assert_eq!(relay_list(&[]), "");
    }
}
