//! Stand-in for the drone receiver: binds the actuator port and logs every
//! datagram it can decode. Useful on the bench without hardware.

use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::packet::{decode, Packet};

// Largest possible datagram is a provisioning packet with two 255-byte fields
const BUFFER_SIZE: usize = 1024;

pub struct Monitor {
    socket: UdpSocket,
}

impl Monitor {
    pub fn bind(address: &str) -> Result<Self> {
        let socket = UdpSocket::bind(address)?;
        log::info!("Monitor listening on {}", socket.local_addr()?);
        Ok(Monitor { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Block until one datagram arrives. Undecodable datagrams come back as
    /// `Err(InvalidPacket)`; the socket stays usable.
    pub fn recv(&self) -> Result<(Packet, SocketAddr)> {
        let mut buf = [0u8; BUFFER_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf)?;
        Ok((decode(&buf[..len])?, from))
    }

    pub fn run(&self) -> Result<()> {
        let mut control_packets: u64 = 0;
        let mut window_start = Instant::now();

        loop {
            match self.recv() {
                Ok((Packet::Control { x, y, rotate_left, rotate_right, throttle }, from)) => {
                    control_packets += 1;
                    log::debug!(
                        "{} X {} Y {} L {} R {} P {}",
                        from, x, y, rotate_left, rotate_right, throttle
                    );
                }
                Ok((Packet::Enable, from)) => log::info!("[ENABLE] from {}", from),
                Ok((Packet::WifiConfig { ssid, password }, from)) => {
                    log::info!("[WIFI] from {}: ssid {:?}, password {} bytes", from, ssid, password.len())
                }
                Err(Error::InvalidPacket(reason)) => log::warn!("Dropped datagram: {}", reason),
                Err(e) => return Err(e),
            }

            let elapsed = window_start.elapsed();
            if elapsed.as_secs() >= 1 {
                if control_packets > 0 {
                    log::info!("{} control packets/s", control_packets * 1000 / elapsed.as_millis() as u64);
                }
                control_packets = 0;
                window_start = Instant::now();
            }
        }
    }
}
