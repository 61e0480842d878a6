use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Mutex;

use crate::address::TargetAddress;
use crate::error::Result;

/// The single outbound socket of the process.
///
/// Shared behind an `Arc` by the control loop and the provisioning path;
/// the mutex keeps writes from different threads from interleaving.
pub struct Transmitter {
    socket: Mutex<UdpSocket>,
    target: SocketAddr,
}

impl Transmitter {
    pub fn open(target: TargetAddress) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_nonblocking(true)?;
        log::info!("UDP socket {} ready, sending to {}", socket.local_addr()?, target);
        Ok(Transmitter { socket: Mutex::new(socket), target: target.into() })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Fire and forget. A lost datagram is superseded by the next tick, so
    /// failures are logged and dropped.
    pub fn send(&self, bytes: &[u8]) {
        let socket = self.socket.lock().unwrap_or_else(|e| e.into_inner());
        match socket.send_to(bytes, self.target) {
            Ok(_) => log::trace!("Sent {} bytes to {}", bytes.len(), self.target),
            Err(e) => log::warn!("Failed to send {} bytes to {}: {}", bytes.len(), self.target, e),
        }
    }
}
