//! IP address parsing and loopback classification.

use std::net::IpAddr;

use netwatch_types::error::AddressError;

/// Parse a textual IP address, accepting bracketed IPv6 (`[::1]`).
pub fn parse_ip(ip: &str) -> Result<IpAddr, AddressError> {
    let trimmed = ip.trim();
    let bare = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    bare.parse()
        .map_err(|_| AddressError::InvalidAddress(ip.to_string()))
}

/// Whether `addr` is a loopback address. IPv4-mapped IPv6 loopback
/// (`::ffff:127.0.0.1`) counts as loopback.
pub fn is_loopback_addr(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    }
}

pub fn is_loopback(ip: &str) -> Result<bool, AddressError> {
    parse_ip(ip).map(|addr| is_loopback_addr(&addr))
}
