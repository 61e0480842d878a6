use crate::error::{Error, Result};
use crate::input::ControlInput;

pub const THROTTLE_MIN: u16 = 1000;
pub const THROTTLE_MAX: u16 = 2000;

pub const WIFI_FIELD_MIN: usize = 8;
pub const WIFI_FIELD_MAX: usize = 255;

/// One tick's worth of control, built fresh from the input source every time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub axis_x: f64,            // [-1, 1], right is positive
    pub axis_y: f64,            // [-1, 1], screen-space down is positive
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub throttle: u16,          // [1000, 2000]
    pub enabled: bool,
}

impl ControlState {
    pub fn from_input(input: &ControlInput, enabled: bool) -> Self {
        ControlState {
            axis_x: input.axis_x,
            axis_y: input.axis_y,
            rotate_left: input.rotate_left,
            rotate_right: input.rotate_right,
            throttle: input.throttle.clamp(THROTTLE_MIN, THROTTLE_MAX),
            enabled,
        }
    }
}

/// Hotspot credentials for the actuator, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

impl WifiConfig {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        WifiConfig { ssid: ssid.into(), password: password.into() }
    }

    /// Both fields must fit the single length byte and satisfy the hotspot minimum.
    pub fn validate(&self) -> Result<()> {
        check_field("ssid", &self.ssid)?;
        check_field("password", &self.password)
    }
}

fn check_field(field: &'static str, value: &str) -> Result<()> {
    let len = value.len();
    if (WIFI_FIELD_MIN..=WIFI_FIELD_MAX).contains(&len) {
        Ok(())
    } else {
        Err(Error::InvalidConfig { field, len })
    }
}
