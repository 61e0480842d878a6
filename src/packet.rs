//! Datagram layouts understood by the drone receiver
//!
//! Three kinds of datagram share the actuator port. There is no header or
//! length prefix; the receiver tells them apart by the first byte and parses
//! the rest by fixed width. All integers are little-endian.
//!
//! ```text
//! Control (13 bytes, periodic while enabled):
//! ┌───┬──────┬───┬──────┬───────┬───────┬───┬──────────┐
//! │ X │ u16  │ Y │ u16  │ LF/LT │ RF/RT │ P │ u16      │
//! └───┴──────┴───┴──────┴───────┴───────┴───┴──────────┘
//!
//! Enable (1 byte, once per off→on switch):
//! ┌───┐
//! │ S │
//! └───┘
//!
//! Provisioning (one-shot):
//! ┌───┬─────────┬──────┬─────────┬──────────┐
//! │ N │ ssid_len│ ssid │ pass_len│ password │
//! └───┴─────────┴──────┴─────────┴──────────┘
//! ```
//!
//! Axis payloads are `round(axis * 1000 / 2 + 1500)`. Y is negated first: the
//! pad reports screen-space down as positive, the drone expects up positive.
//! Throttle is sent unscaled.

use crate::error::{Error, Result};
use crate::state::{ControlState, WifiConfig};

pub const TAG_X: u8 = b'X';
pub const TAG_Y: u8 = b'Y';
pub const TAG_THROTTLE: u8 = b'P';
pub const TAG_ENABLE: u8 = b'S';
pub const TAG_WIFI: u8 = b'N';

pub const CONTROL_PACKET_LEN: usize = 13;

const PULSE_CENTER: f64 = 1500.0;
const PULSE_HALF_RANGE: f64 = 1000.0 / 2.0;

/// Map a pad axis onto the 1000..=2000 pulse range.
pub fn scale_axis(axis: f64) -> u16 {
    let axis = if axis.is_nan() { 0.0 } else { axis.clamp(-1.0, 1.0) };
    (axis * PULSE_HALF_RANGE + PULSE_CENTER).round() as u16
}

fn rotation_token(prefix: u8, held: bool) -> [u8; 2] {
    [prefix, if held { b'T' } else { b'F' }]
}

/// Encode a full control snapshot.
///
/// Only meaningful while the control loop is enabled; the caller is
/// responsible for not sending this otherwise.
pub fn encode_control(state: &ControlState) -> Vec<u8> {
    let mut packet = Vec::with_capacity(CONTROL_PACKET_LEN);
    packet.push(TAG_X);
    packet.extend_from_slice(&scale_axis(state.axis_x).to_le_bytes());
    packet.push(TAG_Y);
    packet.extend_from_slice(&scale_axis(-state.axis_y).to_le_bytes());
    packet.extend_from_slice(&rotation_token(b'L', state.rotate_left));
    packet.extend_from_slice(&rotation_token(b'R', state.rotate_right));
    packet.push(TAG_THROTTLE);
    packet.extend_from_slice(&state.throttle.to_le_bytes());
    packet
}

pub fn encode_enable() -> Vec<u8> {
    vec![TAG_ENABLE]
}

/// Encode new hotspot credentials, rejecting them before anything is built
/// if either field is outside 8..=255 bytes.
pub fn encode_wifi_config(config: &WifiConfig) -> Result<Vec<u8>> {
    config.validate()?;

    let ssid = config.ssid.as_bytes();
    let password = config.password.as_bytes();

    let mut packet = Vec::with_capacity(3 + ssid.len() + password.len());
    packet.push(TAG_WIFI);
    packet.push(ssid.len() as u8);
    packet.extend_from_slice(ssid);
    packet.push(password.len() as u8);
    packet.extend_from_slice(password);
    Ok(packet)
}

/// A datagram as the receiver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Enable,
    Control {
        x: u16,
        y: u16,
        rotate_left: bool,
        rotate_right: bool,
        throttle: u16,
    },
    WifiConfig {
        ssid: String,
        password: String,
    },
}

pub fn decode(bytes: &[u8]) -> Result<Packet> {
    match bytes.first() {
        Some(&TAG_ENABLE) if bytes.len() == 1 => Ok(Packet::Enable),
        Some(&TAG_X) => decode_control(bytes),
        Some(&TAG_WIFI) => decode_wifi(&bytes[1..]),
        Some(tag) => Err(Error::InvalidPacket(format!(
            "unknown tag {:?} ({} bytes)",
            *tag as char,
            bytes.len()
        ))),
        None => Err(Error::InvalidPacket("empty datagram".to_string())),
    }
}

fn decode_control(bytes: &[u8]) -> Result<Packet> {
    if bytes.len() != CONTROL_PACKET_LEN {
        return Err(Error::InvalidPacket(format!(
            "control packet is {} bytes, expected {}",
            bytes.len(),
            CONTROL_PACKET_LEN
        )));
    }

    let word = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let expect_tag = |at: usize, tag: u8| {
        if bytes[at] == tag {
            Ok(())
        } else {
            Err(Error::InvalidPacket(format!(
                "expected {:?} at offset {}",
                tag as char, at
            )))
        }
    };

    expect_tag(3, TAG_Y)?;
    expect_tag(6, b'L')?;
    expect_tag(8, b'R')?;
    expect_tag(10, TAG_THROTTLE)?;

    Ok(Packet::Control {
        x: word(1),
        y: word(4),
        rotate_left: decode_flag(bytes[7])?,
        rotate_right: decode_flag(bytes[9])?,
        throttle: word(11),
    })
}

fn decode_flag(byte: u8) -> Result<bool> {
    match byte {
        b'T' => Ok(true),
        b'F' => Ok(false),
        other => Err(Error::InvalidPacket(format!(
            "rotation flag {:?} is neither T nor F",
            other as char
        ))),
    }
}

fn decode_wifi(mut rest: &[u8]) -> Result<Packet> {
    let ssid = take_prefixed(&mut rest, "ssid")?;
    let password = take_prefixed(&mut rest, "password")?;
    if !rest.is_empty() {
        return Err(Error::InvalidPacket(format!(
            "{} trailing bytes after password",
            rest.len()
        )));
    }
    Ok(Packet::WifiConfig { ssid, password })
}

fn take_prefixed(rest: &mut &[u8], field: &str) -> Result<String> {
    let (&len, tail) = rest
        .split_first()
        .ok_or_else(|| Error::InvalidPacket(format!("missing {} length", field)))?;
    let len = len as usize;
    if tail.len() < len {
        return Err(Error::InvalidPacket(format!(
            "{} truncated: {} of {} bytes",
            field,
            tail.len(),
            len
        )));
    }
    let (value, tail) = tail.split_at(len);
    *rest = tail;
    String::from_utf8(value.to_vec())
        .map_err(|_| Error::InvalidPacket(format!("{} is not UTF-8", field)))
}
