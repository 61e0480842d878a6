use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

pub const ACTUATOR_PORT: u16 = 2390;
pub const DEFAULT_PROBE: Ipv4Addr = Ipv4Addr::new(192, 255, 255, 255);

// Never written to, only used for route selection
const PROBE_PORT: u16 = 1;

/// Where control datagrams go. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl TargetAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddress { ip, port }
    }
}

impl From<TargetAddress> for SocketAddr {
    fn from(target: TargetAddress) -> Self {
        SocketAddr::V4(SocketAddrV4::new(target.ip, target.port))
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

pub struct AddressResolver {
    probe: Ipv4Addr,
    port: u16,
}

impl Default for AddressResolver {
    fn default() -> Self {
        AddressResolver::new(DEFAULT_PROBE, ACTUATOR_PORT)
    }
}

impl AddressResolver {
    pub fn new(probe: Ipv4Addr, port: u16) -> Self {
        AddressResolver { probe, port }
    }

    pub fn resolve(&self) -> TargetAddress {
        self.target_for(self.local_ip())
    }

    fn target_for(&self, local: Option<Ipv4Addr>) -> TargetAddress {
        match local {
            Some(ip) => log::info!("Local address {} (via probe {})", ip, self.probe),
            None => log::warn!("No route towards {}, falling back to loopback", self.probe),
        }
        TargetAddress::new(actuator_ip(local), self.port)
    }

    /// Address the OS would use as source towards the probe. Connecting a
    /// datagram socket sends nothing; it only picks the route.
    fn local_ip(&self) -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect((self.probe, PROBE_PORT)).ok()?;
        match socket.local_addr().ok()?.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        }
    }
}

/// The actuator is the `.1` host of whatever subnet we are on.
///
/// Loopback is returned untouched: with no network there is no subnet to
/// derive from, and `127.0.0.1` is already the local host.
pub fn actuator_ip(local: Option<Ipv4Addr>) -> Ipv4Addr {
    match local {
        Some(ip) if !ip.is_loopback() => {
            let [a, b, c, _] = ip.octets();
            Ipv4Addr::new(a, b, c, 1)
        }
        _ => Ipv4Addr::LOCALHOST,
    }
}
