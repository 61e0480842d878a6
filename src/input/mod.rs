//! Input side of the remote
//!
//! The control loop only needs a [`ControlInput`] snapshot on demand and a
//! stream of [`InputEvent`]s. Feeders (the WebSocket UI, the GPIO panel)
//! write into a [`SharedInput`] and push events; the loop samples the shared
//! snapshot at send time.

pub mod panel;
pub mod websocket;

#[cfg(feature = "gpio")]
pub mod gpio;

use std::net::SocketAddr;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use serde::Deserialize;

use crate::config::{InputKind, RemoteConfig};
use crate::error::Result;
use crate::state::{THROTTLE_MIN, WifiConfig};

/// Raw position of every control as the user currently holds it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlInput {
    pub axis_x: f64,
    pub axis_y: f64,
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub throttle: u16,
    pub enable: bool,
}

impl Default for ControlInput {
    fn default() -> Self {
        ControlInput {
            axis_x: 0.0,
            axis_y: 0.0,
            rotate_left: false,
            rotate_right: false,
            throttle: THROTTLE_MIN,
            enable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Input source has settled; enabling is allowed from now on
    Ready,
    /// Enable switch changed
    Switch(bool),
    /// User submitted new hotspot credentials
    Provision(WifiConfig),
    Shutdown,
}

pub trait InputSource {
    fn sample(&mut self) -> ControlInput;

    /// Move the throttle control back to `value` (on disable).
    fn reset_throttle(&mut self, value: u16);
}

#[derive(Debug, Default)]
struct Slot {
    input: ControlInput,
    /// Safe throttle set on disable. Wins over the feeder's throttle until
    /// the loop has sampled once with the switch back on.
    held_throttle: Option<u16>,
}

impl Slot {
    fn view(&self) -> ControlInput {
        ControlInput { throttle: self.held_throttle.unwrap_or(self.input.throttle), ..self.input }
    }
}

/// Latest input, written by feeders and read by the control loop.
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    inner: Arc<Mutex<Slot>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Input as the loop would see it, held throttle included.
    pub fn snapshot(&self) -> ControlInput {
        self.lock().view()
    }

    /// Store a new snapshot. Returns the new enable state if it changed.
    pub fn update(&self, input: ControlInput) -> Option<bool> {
        let mut slot = self.lock();
        let changed = slot.input.enable != input.enable;
        slot.input = input;
        changed.then_some(input.enable)
    }

    /// Feeder went away: centre the stick, let go of the buttons, drop the
    /// enable signal. Throttle is left for the loop to reset.
    pub fn release(&self) -> Option<bool> {
        let mut slot = self.lock();
        let was_enabled = slot.input.enable;
        slot.input = ControlInput { throttle: slot.input.throttle, ..ControlInput::default() };
        was_enabled.then_some(false)
    }
}

impl InputSource for SharedInput {
    fn sample(&mut self) -> ControlInput {
        let mut slot = self.lock();
        let input = slot.view();
        if slot.input.enable && slot.held_throttle.take().is_some() {
            log::debug!("Safe throttle sent, following the feeder again");
        }
        input
    }

    fn reset_throttle(&mut self, value: u16) {
        self.lock().held_throttle = Some(value);
    }
}

/// Start the one feeder `config.input` names. Returns the WebSocket
/// address when the UI server is the feeder.
pub fn spawn_feeder(
    config: &RemoteConfig,
    shared: SharedInput,
    events: Sender<InputEvent>,
) -> Result<Option<SocketAddr>> {
    log::info!("Input from {:?}", config.input);
    match config.input {
        InputKind::Websocket => {
            let feeder = websocket::WebSocketFeeder::bind(&config.websocket.bind_address, shared, events)?;
            let address = feeder.local_addr()?;
            thread::spawn(move || feeder.run());
            Ok(Some(address))
        }
        InputKind::Panel => {
            spawn_panel(config, shared, events)?;
            Ok(None)
        }
    }
}

#[cfg(feature = "gpio")]
fn spawn_panel(config: &RemoteConfig, shared: SharedInput, events: Sender<InputEvent>) -> Result<()> {
    let panel = gpio::GpioPanel::new(config.gpio.clone())?;
    thread::spawn(move || {
        if let Err(e) = panel.run(shared, events.clone()) {
            log::error!("[PANEL] Stopped: {}", e);
            let _ = events.send(InputEvent::Switch(false));
        }
    });
    Ok(())
}

#[cfg(not(feature = "gpio"))]
fn spawn_panel(_config: &RemoteConfig, _shared: SharedInput, _events: Sender<InputEvent>) -> Result<()> {
    Err(crate::error::Error::InvalidSetting("input \"panel\" needs a build with the gpio feature".to_string()))
}
