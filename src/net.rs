use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Address used when no outbound interface can be found
pub const FALLBACK_HOST: &str = "localhost";

/// Best guess at the host's LAN address, so a phone on the same network can
/// reach the server. Connecting a UDP socket sends no packets; it only makes
/// the OS pick the outbound interface.
pub fn local_ip() -> String {
    probe_outbound_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

fn probe_outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_is_host_or_fallback() {
        let ip = local_ip();
        assert!(ip == FALLBACK_HOST || ip.parse::<IpAddr>().is_ok());
    }
}
