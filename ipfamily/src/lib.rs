// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Address family classification for IP addresses and CIDRs.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

use std::fmt;
use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum FamilyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("no addresses given")]
    NoAddresses,
}

/// The address family of an address, a CIDR or a set of addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IpFamily {
    Ipv4,
    Ipv6,
    DualStack,
    #[default]
    Unknown,
}

impl IpFamily {
    #[must_use]
    pub fn is_v4(self) -> bool {
        self == IpFamily::Ipv4
    }

    #[must_use]
    pub fn is_v6(self) -> bool {
        self == IpFamily::Ipv6
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::Ipv4 => write!(f, "ipv4"),
            IpFamily::Ipv6 => write!(f, "ipv6"),
            IpFamily::DualStack => write!(f, "dual"),
            IpFamily::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a CIDR string such as `192.0.2.0/24` or `2001:db8::/64` by
/// looking at its prefix portion. A bare address classifies like a CIDR.
/// Anything unparseable is [`IpFamily::Unknown`].
#[must_use]
pub fn for_cidr(cidr: &str) -> IpFamily {
    let addr = cidr.split('/').next().unwrap_or(cidr);
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => IpFamily::Ipv4,
        Ok(IpAddr::V6(_)) => IpFamily::Ipv6,
        Err(_) => IpFamily::Unknown,
    }
}

/// Classify a single address literal.
///
/// # Errors
/// Fails if the literal does not parse as an IP address.
pub fn for_address(addr: &str) -> Result<IpFamily, FamilyError> {
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => Ok(IpFamily::Ipv4),
        Ok(IpAddr::V6(_)) => Ok(IpFamily::Ipv6),
        Err(_) => Err(FamilyError::InvalidAddress(addr.to_string())),
    }
}

/// Classify a set of address literals. Returns [`IpFamily::DualStack`] only
/// when both families appear.
///
/// # Errors
/// Fails on an empty set or if any literal does not parse.
pub fn for_addresses(addrs: &[&str]) -> Result<IpFamily, FamilyError> {
    if addrs.is_empty() {
        return Err(FamilyError::NoAddresses);
    }
    let mut has_v4 = false;
    let mut has_v6 = false;
    for addr in addrs {
        match for_address(addr)? {
            IpFamily::Ipv4 => has_v4 = true,
            IpFamily::Ipv6 => has_v6 = true,
            _ => unreachable!(),
        }
    }
    match (has_v4, has_v6) {
        (true, true) => Ok(IpFamily::DualStack),
        (false, true) => Ok(IpFamily::Ipv6),
        _ => Ok(IpFamily::Ipv4),
    }
}
