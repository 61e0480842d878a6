use std::time::{Duration, Instant};

use crate::state::{THROTTLE_MAX, THROTTLE_MIN};

pub const ADC_MAX: u16 = 1023;
pub const ADC_CENTER: u16 = 512;
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// Map a 10-bit potentiometer reading onto [-1, 1].
///
/// Readings within `deadzone` of the centre give 0; beyond it each half of
/// the travel is stretched so the full deflection still reaches ±1.
pub fn axis_from_adc(adc_value: u16, deadzone: u16) -> f64 {
    let adc = adc_value.min(ADC_MAX) as f64;
    let center = ADC_CENTER as f64;
    let deadzone = deadzone as f64;

    if (adc - center).abs() < deadzone {
        return 0.0;
    }

    let axis = if adc > center {
        // [center+deadzone, 1023] -> [0, 1]
        (adc - center - deadzone) / (ADC_MAX as f64 - center - deadzone)
    } else {
        // [0, center-deadzone] -> [-1, 0]
        -(center - deadzone - adc) / (center - deadzone)
    };
    axis.clamp(-1.0, 1.0)
}

pub fn throttle_from_adc(adc_value: u16) -> u16 {
    let span = (THROTTLE_MAX - THROTTLE_MIN) as u32;
    let value = THROTTLE_MIN as u32 + adc_value.min(ADC_MAX) as u32 * span / ADC_MAX as u32;
    value as u16
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Debounced on/off input. A level has to hold for [`DEBOUNCE`] before it
/// counts.
#[derive(Debug)]
pub struct Debounced {
    current: bool,
    stable: bool,
    last_change: Instant,
}

impl Debounced {
    pub fn new(now: Instant) -> Self {
        Debounced { current: false, stable: false, last_change: now }
    }

    pub fn is_on(&self) -> bool {
        self.stable
    }

    pub fn update(&mut self, level: bool, now: Instant) -> Option<Edge> {
        if level != self.current {
            self.current = level;
            self.last_change = now;
            return None;
        }

        if self.current != self.stable && now.duration_since(self.last_change) >= DEBOUNCE {
            self.stable = self.current;
            return Some(if self.stable { Edge::Rising } else { Edge::Falling });
        }

        None
    }
}
