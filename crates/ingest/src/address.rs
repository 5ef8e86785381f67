// ABOUTME: Classifies hostnames and literal IP addresses as routable or non-routable.
// ABOUTME: Pure functions with no I/O; used on URL hosts and on DNS-resolved addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use once_cell::sync::Lazy;

/// IPv4 networks that must never be fetched: RFC1918, loopback, "this network", link-local.
static NON_ROUTABLE_V4: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "0.0.0.0/8",
        "169.254.0.0/16",
    ]
    .iter()
    .map(|cidr| cidr.parse().expect("valid IPv4 CIDR"))
    .collect()
});

/// IPv6 link-local and unique-local networks (fc00::/7 also covers fd00::/8).
static NON_ROUTABLE_V6: Lazy<Vec<Ipv6Net>> = Lazy::new(|| {
    ["fe80::/10", "fc00::/7"]
        .iter()
        .map(|cidr| cidr.parse().expect("valid IPv6 CIDR"))
        .collect()
});

/// Check whether a hostname or literal IP is private, loopback, or link-local.
///
/// Accepts the literal `localhost`, IPv4 dotted quads, and IPv6 addresses
/// (optionally bracketed as they appear in URL hosts). Anything else, including
/// ill-formed quads with an octet above 255, returns `false`. A `false` result
/// does not mean the address is safe to fetch; resolved addresses still need
/// their own check.
pub fn is_non_routable(address: &str) -> bool {
    if address == "localhost" {
        return true;
    }

    if let Some(octets) = dotted_quad(address) {
        return match octets {
            Some(v4) => is_non_routable_v4(&v4),
            None => false,
        };
    }

    let unbracketed = address
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(address);
    match unbracketed.to_ascii_lowercase().parse::<Ipv6Addr>() {
        Ok(v6) => is_non_routable_v6(&v6),
        Err(_) => false,
    }
}

/// Typed form of [`is_non_routable`] for addresses returned by a resolver.
pub fn is_non_routable_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_non_routable_v4(v4),
        IpAddr::V6(v6) => is_non_routable_v6(v6),
    }
}

fn is_non_routable_v4(ip: &Ipv4Addr) -> bool {
    NON_ROUTABLE_V4.iter().any(|net| net.contains(ip))
}

fn is_non_routable_v6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() {
        return true;
    }
    // ::ffff:a.b.c.d inherits the classification of its embedded IPv4
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_non_routable_v4(&v4);
    }
    NON_ROUTABLE_V6.iter().any(|net| net.contains(ip))
}

/// Recognize a four-part decimal dotted quad.
///
/// Returns `None` when the string is not shaped like a quad at all,
/// `Some(None)` when it is shaped like one but an octet exceeds 255.
fn dotted_quad(address: &str) -> Option<Option<Ipv4Addr>> {
    let parts: Vec<&str> = address.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut octets = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u16 = part.parse().ok()?;
        if value > 255 {
            return Some(None);
        }
        octets[i] = value as u8;
    }
    Some(Some(Ipv4Addr::from(octets)))
}
