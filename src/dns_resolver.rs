use crate::error::{ProbeError, Result};

use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Resolves `hostname` to an IPv4 address.
///
/// Dotted-quad literals are used as-is; anything else goes through a
/// blocking DNS lookup and the first IPv4 answer wins.
pub fn resolve(hostname: &str) -> Result<Ipv4Addr> {
    if let Ok(address) = hostname.parse::<Ipv4Addr>() {
        return Ok(address);
    }

    let addresses = dns_lookup::lookup_host(hostname).map_err(|source| {
        debug!(hostname, error = %source, "lookup failed");
        ProbeError::Resolution { hostname: hostname.to_string(), source }
    })?;

    addresses
        .into_iter()
        .find_map(|address| match address {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProbeError::NoIpv4Address { hostname: hostname.to_string() })
}
