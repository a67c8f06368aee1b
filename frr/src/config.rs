// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Canonical FRR configuration model. Instances are value types; a fully
//! canonicalized config (routers ordered by VRF, neighbors by name, prefixes
//! and communities sorted) compares structurally.

use ipfamily::IpFamily;

use crate::community::Community;

/// The neighbor key used for merging and for filter naming.
#[must_use]
pub fn neighbor_name(asn: u32, peer: &str) -> String {
    format!("{asn}@{peer}")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub hostname: String,
    pub routers: Vec<RouterConfig>,
    pub bfd_profiles: Vec<BfdProfileConfig>,
}

/// One `router bgp` stanza. The empty VRF string denotes the default VRF.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterConfig {
    pub my_asn: u32,
    pub router_id: String,
    pub vrf: String,
    pub neighbors: Vec<NeighborConfig>,
    pub ipv4_prefixes: Vec<String>,
    pub ipv6_prefixes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborConfig {
    /// `ASN@address` or `ASN@interface`.
    pub name: String,
    pub ip_family: IpFamily,
    pub asn: u32,
    /// Peer address literal; empty for interface (unnumbered) neighbors.
    pub addr: String,
    /// Interface name for unnumbered neighbors; empty otherwise.
    pub iface: String,
    pub port: Option<u16>,
    pub src_addr: String,
    pub password: String,
    pub hold_time: Option<u64>,
    pub keepalive_time: Option<u64>,
    pub connect_time: Option<u64>,
    pub ebgp_multihop: bool,
    pub bfd_profile: String,
    /// VRF of the owning router, kept for diagnostics.
    pub vrf: String,
    pub outgoing: AllowedOut,
    pub incoming: AllowedIn,
}

impl NeighborConfig {
    /// The identifier FRR knows the peer by.
    #[must_use]
    pub fn peer_id(&self) -> &str {
        if self.addr.is_empty() {
            &self.iface
        } else {
            &self.addr
        }
    }
}

/// Outgoing (advertisement) policy for one neighbor. Prefixes absent from
/// the list are not advertised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowedOut {
    pub prefixes: Vec<OutgoingFilter>,
    pub has_v4: bool,
    pub has_v6: bool,
}

/// Incoming (acceptance) policy for one neighbor. `all` accepts any route
/// and leaves `prefixes` empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowedIn {
    pub all: bool,
    pub prefixes: Vec<IncomingFilter>,
    pub has_v4: bool,
    pub has_v6: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingFilter {
    pub prefix: String,
    pub ip_family: IpFamily,
    /// Sorted, unique.
    pub communities: Vec<Community>,
    pub local_pref: Option<u32>,
}

impl OutgoingFilter {
    #[must_use]
    pub fn new(prefix: &str, ip_family: IpFamily) -> Self {
        Self {
            prefix: prefix.to_string(),
            ip_family,
            communities: Vec::new(),
            local_pref: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncomingFilter {
    pub prefix: String,
    pub ip_family: IpFamily,
}

impl IncomingFilter {
    #[must_use]
    pub fn new(prefix: &str, ip_family: IpFamily) -> Self {
        Self {
            prefix: prefix.to_string(),
            ip_family,
        }
    }
}

/// A named BFD profile, referenced from neighbors via `bfd_profile`.
/// Unset knobs fall back to the FRR defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BfdProfileConfig {
    pub name: String,
    pub receive_interval: Option<u32>,
    pub transmit_interval: Option<u32>,
    pub detect_multiplier: Option<u32>,
    pub echo_interval: Option<u32>,
    pub echo_mode: bool,
    pub passive_mode: bool,
    pub minimum_ttl: Option<u32>,
}

impl BfdProfileConfig {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_key_format() {
        assert_eq!(neighbor_name(65001, "192.0.2.1"), "65001@192.0.2.1");
        assert_eq!(neighbor_name(65001, "eth0"), "65001@eth0");
    }

    #[test]
    fn peer_id_prefers_address() {
        let mut n = NeighborConfig {
            addr: "192.0.2.1".to_string(),
            ..NeighborConfig::default()
        };
        assert_eq!(n.peer_id(), "192.0.2.1");
        n.addr = String::new();
        n.iface = "eth0".to_string();
        assert_eq!(n.peer_id(), "eth0");
    }
}
