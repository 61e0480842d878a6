//! Drone remote control client
//!
//! Turns stick, rotate buttons, throttle and an enable switch into a stream
//! of small UDP datagrams for the drone's onboard receiver, and pushes new
//! hotspot credentials to it on request.
//!
//! ## Features
//!
//! - `gpio`: Raspberry Pi control panel as input source

pub mod address;
pub mod config;
pub mod control;
pub mod error;
pub mod input;
pub mod monitor;
pub mod packet;
pub mod state;
pub mod ticker;
pub mod transmitter;

pub use address::{AddressResolver, TargetAddress};
pub use config::RemoteConfig;
pub use control::{ControlLoop, LoopState};
pub use error::{Error, Result};
pub use state::{ControlState, WifiConfig};
pub use transmitter::Transmitter;
