use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::address::{ACTUATOR_PORT, DEFAULT_PROBE};
use crate::error::{Error, Result};
use crate::state::{THROTTLE_MAX, THROTTLE_MIN};

pub const DEFAULT_PATH: &str = "remote.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub input: InputKind,
    pub actuator: ActuatorConfig,
    pub control: ControlConfig,
    pub websocket: WebSocketConfig,
    pub gpio: GpioConfig,
}

/// Which feeder drives the shared input. Only one runs at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Websocket,
    Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub port: u16,
    pub probe_address: Ipv4Addr,
    /// Skip discovery and send here
    pub target_ip: Option<Ipv4Addr>,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        ActuatorConfig { port: ACTUATOR_PORT, probe_address: DEFAULT_PROBE, target_ip: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_interval_us: u64,
    pub safe_throttle: u16,     // applied when the switch goes off
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig { tick_interval_us: 1000, safe_throttle: THROTTLE_MIN }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub bind_address: String,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig { bind_address: String::from("0.0.0.0:10013") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub rotate_left_pin: u8,
    pub rotate_right_pin: u8,
    pub enable_pin: u8,
    pub axis_x_channel: u8,
    pub axis_y_channel: u8,
    pub throttle_channel: u8,
    pub deadzone: u16,      // ADC counts around centre (512)
    pub poll_interval_ms: u64,
}

impl Default for GpioConfig {
    fn default() -> Self {
        GpioConfig {
            rotate_left_pin: 23,
            rotate_right_pin: 24,
            enable_pin: 25,
            axis_x_channel: 0,
            axis_y_channel: 1,
            throttle_channel: 2,
            deadzone: 50,
            poll_interval_ms: 40,
        }
    }
}

impl RemoteConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let loaded: RemoteConfig = serde_json::from_str(&content)?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.input == InputKind::Panel && !cfg!(feature = "gpio") {
            return Err(Error::InvalidSetting("input \"panel\" needs a build with the gpio feature".to_string()));
        }
        if self.control.tick_interval_us == 0 {
            return Err(Error::InvalidSetting("control.tick_interval_us must be positive".to_string()));
        }
        if !(THROTTLE_MIN..=THROTTLE_MAX).contains(&self.control.safe_throttle) {
            return Err(Error::InvalidSetting(format!(
                "control.safe_throttle {} outside {}..={}",
                self.control.safe_throttle, THROTTLE_MIN, THROTTLE_MAX
            )));
        }
        for (name, channel) in [
            ("axis_x_channel", self.gpio.axis_x_channel),
            ("axis_y_channel", self.gpio.axis_y_channel),
            ("throttle_channel", self.gpio.throttle_channel),
        ] {
            if channel > 7 {
                return Err(Error::InvalidSetting(format!("gpio.{} {} outside 0..=7", name, channel)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("drone-remote-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = RemoteConfig::default();
        assert_eq!(config.actuator.port, 2390);
        assert_eq!(config.actuator.probe_address, Ipv4Addr::new(192, 255, 255, 255));
        assert_eq!(config.actuator.target_ip, None);
        assert_eq!(config.control.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.control.safe_throttle, 1000);
        assert_eq!(config.websocket.bind_address, "0.0.0.0:10013");
        assert_eq!(config.input, InputKind::Websocket);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let json = r#"{ "actuator": { "target_ip": "192.168.4.1" }, "control": { "tick_interval_us": 5000 } }"#;
        let config: RemoteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.actuator.target_ip, Some(Ipv4Addr::new(192, 168, 4, 1)));
        assert_eq!(config.actuator.port, 2390);
        assert_eq!(config.control.tick_interval_us, 5000);
        assert_eq!(config.control.safe_throttle, 1000);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let mut config = RemoteConfig::default();
        config.websocket.bind_address = "127.0.0.1:9000".to_string();
        config.gpio.deadzone = 20;
        config.save(&path).unwrap();

        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_input_kind() {
        let config: RemoteConfig = serde_json::from_str(r#"{ "input": "panel" }"#).unwrap();
        assert_eq!(config.input, InputKind::Panel);
        assert_eq!(config.validate().is_ok(), cfg!(feature = "gpio"));

        let config: RemoteConfig = serde_json::from_str(r#"{ "input": "websocket" }"#).unwrap();
        assert_eq!(config.input, InputKind::Websocket);
        assert!(serde_json::from_str::<RemoteConfig>(r#"{ "input": "both" }"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(RemoteConfig::load(temp_path("missing")), Err(Error::Io(_))));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = RemoteConfig::default();
        config.control.tick_interval_us = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidSetting(_))));

        let mut config = RemoteConfig::default();
        config.control.safe_throttle = 900;
        assert!(config.validate().is_err());

        let mut config = RemoteConfig::default();
        config.gpio.throttle_channel = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let path = temp_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RemoteConfig::load(&path), Err(Error::Settings(_))));
        let _ = fs::remove_file(&path);
    }
}
