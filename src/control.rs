use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};

use crate::config::ControlConfig;
use crate::error::Result;
use crate::input::{InputEvent, InputSource};
use crate::packet::{encode_control, encode_enable, encode_wifi_config};
use crate::state::{ControlState, WifiConfig};
use crate::ticker::Ticker;
use crate::transmitter::Transmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Disabled,
    Enabled,
}

/// Send a provisioning packet. Invalid credentials are rejected before
/// anything reaches the socket.
pub fn provision(transmitter: &Transmitter, config: &WifiConfig) -> Result<()> {
    let packet = encode_wifi_config(config)?;
    transmitter.send(&packet);
    log::info!("[WIFI] Sent new hotspot config (ssid {:?}) to {}", config.ssid, transmitter.target());
    Ok(())
}

pub struct ControlLoop<S: InputSource> {
    transmitter: Arc<Transmitter>,
    source: S,
    state: LoopState,
    ticker: Ticker,
    safe_throttle: u16,
}

impl<S: InputSource> ControlLoop<S> {
    pub fn new(transmitter: Arc<Transmitter>, source: S, config: &ControlConfig) -> Self {
        ControlLoop {
            transmitter,
            source,
            state: LoopState::Disabled,
            ticker: Ticker::new(config.tick_interval()),
            safe_throttle: config.safe_throttle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Apply the external enable signal.
    pub fn set_switch(&mut self, on: bool) {
        let previous = self.state;
        match (self.state, on) {
            (LoopState::Disabled, true) => {
                self.transmitter.send(&encode_enable());
                self.state = LoopState::Enabled;
                self.ticker.start();
            }
            (LoopState::Enabled, false) => {
                self.ticker.stop();
                self.state = LoopState::Disabled;
                self.source.reset_throttle(self.safe_throttle);
            }
            _ => {
                log::debug!("[SWITCH] Already {:?}, ignoring {}", self.state, on);
                return;
            }
        }
        log::info!("[SWITCH] {:?} => {:?}", previous, self.state);
    }

    /// Sample, encode and send one control packet. No-op while disabled.
    pub fn tick(&mut self) {
        if self.state != LoopState::Enabled {
            return;
        }
        let input = self.source.sample();
        let state = ControlState::from_input(&input, true);
        self.transmitter.send(&encode_control(&state));
        self.ticker.advance();
    }

    pub fn provision(&self, config: &WifiConfig) -> Result<()> {
        provision(&self.transmitter, config)
    }

    /// Drive the loop from `events` until `Shutdown` or every sender is gone.
    ///
    /// Nothing can be enabled before the input source reports `Ready`.
    /// Provisioning is accepted at any time.
    pub fn run(&mut self, events: Receiver<InputEvent>) {
        log::info!("Waiting for input source");
        loop {
            match events.recv() {
                Ok(InputEvent::Ready) => break,
                Ok(InputEvent::Provision(config)) => self.handle_provision(&config),
                Ok(InputEvent::Switch(on)) => {
                    log::debug!("[SWITCH] Input source not ready, ignoring {}", on)
                }
                Ok(InputEvent::Shutdown) | Err(_) => return,
            }
        }
        log::info!("Input source ready, sending every {:?} while enabled", self.ticker.interval());

        loop {
            let event = match self.ticker.time_until_due() {
                None => match events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
                Some(wait) => match events.recv_timeout(wait) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
            };

            match event {
                None => self.tick(),
                Some(InputEvent::Switch(on)) => self.set_switch(on),
                Some(InputEvent::Provision(config)) => self.handle_provision(&config),
                Some(InputEvent::Ready) => {}
                Some(InputEvent::Shutdown) => break,
            }
        }

        self.set_switch(false);
        log::info!("Control loop stopped");
    }

    fn handle_provision(&self, config: &WifiConfig) {
        if let Err(e) = self.provision(config) {
            log::warn!("[WIFI] {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TargetAddress;
    use crate::input::{ControlInput, SharedInput};
    use std::io::ErrorKind;
    use std::net::{Ipv4Addr, UdpSocket};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        input: ControlInput,
        samples: usize,
    }

    impl InputSource for FakeSource {
        fn sample(&mut self) -> ControlInput {
            self.samples += 1;
            self.input
        }

        fn reset_throttle(&mut self, value: u16) {
            self.input.throttle = value;
        }
    }

    fn setup<S: InputSource>(source: S) -> (ControlLoop<S>, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        let port = receiver.local_addr().unwrap().port();
        let transmitter = Transmitter::open(TargetAddress::new(Ipv4Addr::LOCALHOST, port)).unwrap();
        let control = ControlLoop::new(Arc::new(transmitter), source, &ControlConfig::default());
        (control, receiver)
    }

    fn recv(receiver: &UdpSocket) -> Option<Vec<u8>> {
        let mut buf = [0u8; 512];
        match receiver.recv_from(&mut buf) {
            Ok((len, _)) => Some(buf[..len].to_vec()),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
            Err(e) => panic!("recv failed: {}", e),
        }
    }

    #[test]
    fn test_starts_disabled_and_silent() {
        let (mut control, receiver) = setup(FakeSource::default());
        assert_eq!(control.state(), LoopState::Disabled);
        control.tick();
        assert_eq!(control.source().samples, 0);
        assert_eq!(recv(&receiver), None);
    }

    #[test]
    fn test_enable_sends_s_before_control() {
        let mut source = FakeSource::default();
        source.input.throttle = 1600;
        let (mut control, receiver) = setup(source);

        control.set_switch(true);
        assert_eq!(control.state(), LoopState::Enabled);
        control.tick();
        control.tick();

        assert_eq!(recv(&receiver).unwrap(), b"S");
        for _ in 0..2 {
            let packet = recv(&receiver).unwrap();
            assert_eq!(packet.len(), 13);
            assert_eq!(packet[0], b'X');
            assert_eq!(u16::from_le_bytes([packet[11], packet[12]]), 1600);
        }
        assert_eq!(recv(&receiver), None);
    }

    #[test]
    fn test_repeated_enable_sends_one_s() {
        let (mut control, receiver) = setup(FakeSource::default());
        control.set_switch(true);
        control.set_switch(true);
        assert_eq!(recv(&receiver).unwrap(), b"S");
        assert_eq!(recv(&receiver), None);
    }

    #[test]
    fn test_disable_resets_throttle_and_stops() {
        let mut source = FakeSource::default();
        source.input.throttle = 1800;
        let (mut control, receiver) = setup(source);

        control.set_switch(true);
        control.set_switch(false);
        assert_eq!(control.state(), LoopState::Disabled);
        assert_eq!(control.source().input.throttle, 1000);

        control.tick();
        assert_eq!(recv(&receiver).unwrap(), b"S");
        assert_eq!(recv(&receiver), None);

        // re-enable starts from the safe throttle
        control.set_switch(true);
        control.tick();
        assert_eq!(recv(&receiver).unwrap(), b"S");
        let packet = recv(&receiver).unwrap();
        assert_eq!(u16::from_le_bytes([packet[11], packet[12]]), 1000);
    }

    #[test]
    fn test_reenable_from_shared_input_sends_safe_throttle_first() {
        let shared = SharedInput::new();
        let (mut control, receiver) = setup(shared.clone());
        let slider = |enable| ControlInput { throttle: 1800, enable, ..ControlInput::default() };

        shared.update(slider(true));
        control.set_switch(true);
        shared.update(slider(false));
        control.set_switch(false);
        assert_eq!(recv(&receiver).unwrap(), b"S");

        // feeder keeps reporting the slider where the user left it
        shared.update(slider(false));
        assert_eq!(shared.snapshot().throttle, 1000);
        shared.update(slider(true));
        control.set_switch(true);
        control.tick();
        control.tick();

        assert_eq!(recv(&receiver).unwrap(), b"S");
        let first = recv(&receiver).unwrap();
        assert_eq!(u16::from_le_bytes([first[11], first[12]]), 1000);
        let second = recv(&receiver).unwrap();
        assert_eq!(u16::from_le_bytes([second[11], second[12]]), 1800);
    }

    #[test]
    fn test_input_sampled_every_tick() {
        let (mut control, receiver) = setup(FakeSource::default());
        control.set_switch(true);
        recv(&receiver).unwrap();

        control.source.input.axis_x = 1.0;
        control.tick();
        control.source.input.axis_x = -1.0;
        control.tick();

        let first = recv(&receiver).unwrap();
        let second = recv(&receiver).unwrap();
        assert_eq!(u16::from_le_bytes([first[1], first[2]]), 2000);
        assert_eq!(u16::from_le_bytes([second[1], second[2]]), 1000);
        assert_eq!(control.source().samples, 2);
    }

    #[test]
    fn test_invalid_provision_sends_nothing() {
        let (control, receiver) = setup(FakeSource::default());
        assert!(control.provision(&WifiConfig::new("short", "abcdefgh")).is_err());
        assert_eq!(recv(&receiver), None);

        control.provision(&WifiConfig::new("12345678", "abcdefgh")).unwrap();
        assert_eq!(recv(&receiver).unwrap()[0], b'N');
    }

    #[test]
    fn test_switch_ignored_until_ready() {
        let (mut control, receiver) = setup(FakeSource::default());
        let (tx, rx) = mpsc::channel();
        tx.send(InputEvent::Switch(true)).unwrap();
        tx.send(InputEvent::Shutdown).unwrap();
        control.run(rx);

        assert_eq!(control.state(), LoopState::Disabled);
        assert_eq!(recv(&receiver), None);
    }

    #[test]
    fn test_run_streams_while_enabled() {
        let (mut control, receiver) = setup(FakeSource::default());
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            control.run(rx);
            control
        });

        tx.send(InputEvent::Ready).unwrap();
        tx.send(InputEvent::Switch(true)).unwrap();
        thread::sleep(Duration::from_millis(30));
        tx.send(InputEvent::Switch(false)).unwrap();
        tx.send(InputEvent::Shutdown).unwrap();
        let control = handle.join().unwrap();

        assert_eq!(control.state(), LoopState::Disabled);
        assert_eq!(recv(&receiver).unwrap(), b"S");
        let mut control_packets = 0;
        while let Some(packet) = recv(&receiver) {
            assert_eq!(packet.len(), 13);
            control_packets += 1;
        }
        assert!(control_packets >= 2, "only {} control packets", control_packets);
        assert!(control.source().samples >= control_packets);
    }
}
