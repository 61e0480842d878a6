//! Raspberry Pi control panel: MCP3008 ADC for the stick and throttle,
//! push buttons for rotation and a toggle for the enable switch.

use rppal::gpio::{Gpio, InputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::GpioConfig;
use crate::error::{Error, Result};
use crate::input::panel::{axis_from_adc, throttle_from_adc, Debounced, Edge, DEBOUNCE};
use crate::input::{ControlInput, InputEvent, SharedInput};

const ADC_CHANNELS: u8 = 8;

// start bit, single-ended + channel, clock out 10 bits
fn request_frame(channel: u8) -> [u8; 3] {
    [0x01, (0x08 | channel) << 4, 0x00]
}

fn sample_from_frame(frame: &[u8; 3]) -> u16 {
    (((frame[1] & 0x03) as u16) << 8) | frame[2] as u16
}

/// MCP3008 on SPI0.0, reading the stick and throttle channels together.
struct AdcReader {
    spi: Spi,
    channels: [u8; 3],
}

impl AdcReader {
    fn new(channels: [u8; 3]) -> Result<Self> {
        if let Some(channel) = channels.iter().find(|&&c| c >= ADC_CHANNELS) {
            return Err(Error::InvalidSetting(format!("ADC channel {} out of range", channel)));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)?;
        log::info!("MCP3008 ADC initialized on SPI0.0, channels {:?}", channels);
        Ok(AdcReader { spi, channels })
    }

    /// One conversion per configured channel, in configuration order.
    fn read_all(&mut self) -> Result<[u16; 3]> {
        let mut samples = [0u16; 3];
        let mut rx_buffer = [0u8; 3];
        for (sample, &channel) in samples.iter_mut().zip(&self.channels) {
            self.spi.transfer(&mut rx_buffer, &request_frame(channel))?;
            *sample = sample_from_frame(&rx_buffer);
        }
        Ok(samples)
    }
}

pub struct GpioPanel {
    config: GpioConfig,
    adc: AdcReader,
    rotate_left: InputPin,
    rotate_right: InputPin,
    enable: InputPin,
    rotate_left_state: Debounced,
    rotate_right_state: Debounced,
    enable_state: Debounced,
}

impl GpioPanel {
    pub fn new(config: GpioConfig) -> Result<Self> {
        let gpio = Gpio::new()?;
        let input = |pin: u8| -> Result<InputPin> {
            let pin = gpio.get(pin)?.into_input_pulldown();
            log::info!("GPIO {} initialized", pin.pin());
            Ok(pin)
        };

        let now = Instant::now();
        Ok(GpioPanel {
            adc: AdcReader::new([config.axis_x_channel, config.axis_y_channel, config.throttle_channel])?,
            rotate_left: input(config.rotate_left_pin)?,
            rotate_right: input(config.rotate_right_pin)?,
            enable: input(config.enable_pin)?,
            rotate_left_state: Debounced::new(now),
            rotate_right_state: Debounced::new(now),
            enable_state: Debounced::new(now),
            config,
        })
    }

    fn read(&mut self) -> Result<(ControlInput, Option<Edge>)> {
        let now = Instant::now();
        self.rotate_left_state.update(self.rotate_left.is_high(), now);
        self.rotate_right_state.update(self.rotate_right.is_high(), now);
        let edge = self.enable_state.update(self.enable.is_high(), now);

        let [x, y, throttle] = self.adc.read_all()?;
        let input = ControlInput {
            axis_x: axis_from_adc(x, self.config.deadzone),
            axis_y: axis_from_adc(y, self.config.deadzone),
            rotate_left: self.rotate_left_state.is_on(),
            rotate_right: self.rotate_right_state.is_on(),
            throttle: throttle_from_adc(throttle),
            enable: self.enable_state.is_on(),
        };
        Ok((input, edge))
    }

    /// Poll the panel until the event receiver goes away.
    pub fn run(mut self, shared: SharedInput, events: Sender<InputEvent>) -> Result<()> {
        let period = Duration::from_millis(self.config.poll_interval_ms);

        // Panel only counts as settled once the switch has been read off
        // for a full debounce period
        let started = Instant::now();
        let mut settled = false;
        let mut warned = false;

        loop {
            let (input, edge) = self.read()?;

            if !settled {
                if self.enable_state.is_on() && !warned {
                    log::warn!("[PANEL] Enable switch is on at startup, turn it off to arm");
                    warned = true;
                }
                if self.enable_state.is_on() || started.elapsed() <= DEBOUNCE {
                    thread::sleep(period);
                    continue;
                }
                settled = true;
                if events.send(InputEvent::Ready).is_err() {
                    return Ok(());
                }
            }

            shared.update(input);
            if let Some(edge) = edge {
                log::info!("[PANEL] Enable switch {:?}", edge);
                if events.send(InputEvent::Switch(edge == Edge::Rising)).is_err() {
                    return Ok(());
                }
            }

            thread::sleep(period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame() {
        assert_eq!(request_frame(0), [0x01, 0x80, 0x00]);
        assert_eq!(request_frame(2), [0x01, 0xA0, 0x00]);
        assert_eq!(request_frame(7), [0x01, 0xF0, 0x00]);
    }

    #[test]
    fn test_sample_from_frame() {
        assert_eq!(sample_from_frame(&[0xFF, 0x03, 0xFF]), 1023);
        assert_eq!(sample_from_frame(&[0xFF, 0xFE, 0x00]), 512);
        assert_eq!(sample_from_frame(&[0x00, 0x00, 0x2A]), 42);
    }
}
