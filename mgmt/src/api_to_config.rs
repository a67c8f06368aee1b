// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Conversion of `FRRConfiguration` intent into the canonical FRR model.
//! Per-record translation expands advertise/receive policies into filter
//! entries; cross-record merging buckets routers by VRF and enforces the
//! compatibility invariants between overlapping declarations.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use frr::{
    AllowedIn, AllowedOut, BfdProfileConfig, Community, CommunityError, Config, IncomingFilter,
    NeighborConfig, OutgoingFilter, RouterConfig, neighbor_name,
};
use ipfamily::IpFamily;
use k8s_intf::{AllowMode, BFDProfile, FRRConfiguration, Neighbor, Router};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("unknown ipfamily for {0}")]
    UnknownPrefixFamily(String),
    #[error("failed to find ipfamily for {address}: {err}")]
    NeighborFamily {
        address: String,
        err: ipfamily::FamilyError,
    },
    #[error("neighbor with asn {0} has neither address nor interface")]
    MissingPeer(u32),
    #[error("{0}")]
    InvalidCommunity(#[from] CommunityError),
    #[error("community {community} associated to prefix {prefix} that is not in neighbor {neighbor} allowed list")]
    CommunityPrefixNotAllowed {
        neighbor: String,
        community: String,
        prefix: String,
    },
    #[error("local pref associated to prefix {prefix} that is not in neighbor {neighbor} allowed list")]
    LocalPrefPrefixNotAllowed { neighbor: String, prefix: String },
    #[error("multiple local prefs specified for prefix {prefix} of neighbor {neighbor}")]
    MultipleLocalPrefs { neighbor: String, prefix: String },
    #[error("multiple routers specified for vrf {0} in the same configuration")]
    DuplicateRouterVrf(String),
    #[error("different asns ({0} != {1}) specified for same vrf: {2}")]
    DifferentAsns(u32, u32, String),
    #[error("different router ids ({0} != {1}) specified for same vrf: {2}")]
    DifferentRouterIds(String, String, String),
    #[error("multiple {field} specified for neighbor {neighbor} at vrf {vrf}")]
    NeighborMismatch {
        field: &'static str,
        neighbor: String,
        vrf: String,
    },
    #[error("conflicting ebgp-multihop specified for neighbor {neighbor} at vrf {vrf}")]
    EbgpMultiHopMismatch { neighbor: String, vrf: String },
    #[error("bfd profile {profile} referenced by neighbor {neighbor} not found")]
    BfdProfileNotFound { profile: String, neighbor: String },
    #[error("multiple bfd profiles named {0} with conflicting settings")]
    BfdProfileMismatch(String),
}

/// Convert the set of intent records applicable to this node into one
/// canonical configuration. Routers are bucketed by VRF and merged;
/// the output ordering is canonical regardless of input order.
pub fn api_to_frr(from_k8s: &[FRRConfiguration]) -> Result<Config, ConversionError> {
    let mut vrf_routers: BTreeMap<String, RouterConfig> = BTreeMap::new();

    for cfg in from_k8s {
        let mut seen_vrfs = HashSet::new();
        for r in &cfg.spec.bgp.routers {
            if !seen_vrfs.insert(r.vrf.clone()) {
                return Err(ConversionError::DuplicateRouterVrf(r.vrf.clone()));
            }

            let router_cfg = router_to_frr(r)?;
            match vrf_routers.remove(&r.vrf) {
                None => {
                    vrf_routers.insert(r.vrf.clone(), router_cfg);
                }
                Some(curr) => {
                    vrf_routers.insert(r.vrf.clone(), merge_router_configs(curr, router_cfg)?);
                }
            }
        }
    }

    let bfd_profiles = merge_bfd_profiles(from_k8s)?;
    let routers: Vec<RouterConfig> = vrf_routers.into_values().collect();

    for r in &routers {
        for n in &r.neighbors {
            if !n.bfd_profile.is_empty()
                && !bfd_profiles.iter().any(|p| p.name == n.bfd_profile)
            {
                return Err(ConversionError::BfdProfileNotFound {
                    profile: n.bfd_profile.clone(),
                    neighbor: n.name.clone(),
                });
            }
        }
    }

    Ok(Config {
        hostname: String::new(),
        routers,
        bfd_profiles,
    })
}

fn router_to_frr(r: &Router) -> Result<RouterConfig, ConversionError> {
    let mut v4 = BTreeSet::new();
    let mut v6 = BTreeSet::new();
    for p in &r.prefixes {
        match ipfamily::for_cidr(p) {
            IpFamily::Ipv4 => {
                v4.insert(p.clone());
            }
            IpFamily::Ipv6 => {
                v6.insert(p.clone());
            }
            _ => return Err(ConversionError::UnknownPrefixFamily(p.clone())),
        }
    }
    let ipv4_prefixes: Vec<String> = v4.into_iter().collect();
    let ipv6_prefixes: Vec<String> = v6.into_iter().collect();

    let mut neighbors = Vec::new();
    for n in &r.neighbors {
        neighbors.push(neighbor_to_frr(n, &ipv4_prefixes, &ipv6_prefixes, &r.vrf)?);
    }
    // A record may declare the same neighbor more than once; collapse here
    // so the (VRF, neighbor-key) uniqueness invariant holds per router.
    let neighbors = merge_neighbors(neighbors)?;

    Ok(RouterConfig {
        my_asn: r.asn,
        router_id: r.id.clone(),
        vrf: r.vrf.clone(),
        neighbors,
        ipv4_prefixes,
        ipv6_prefixes,
    })
}

fn neighbor_to_frr(
    n: &Neighbor,
    ipv4_prefixes: &[String],
    ipv6_prefixes: &[String],
    vrf: &str,
) -> Result<NeighborConfig, ConversionError> {
    let (peer_id, family) = if !n.address.is_empty() {
        let family = ipfamily::for_addresses(&[n.address.as_str()]).map_err(|err| {
            ConversionError::NeighborFamily {
                address: n.address.clone(),
                err,
            }
        })?;
        (n.address.as_str(), family)
    } else if !n.interface.is_empty() {
        // Unnumbered sessions negotiate both families.
        (n.interface.as_str(), IpFamily::DualStack)
    } else {
        return Err(ConversionError::MissingPeer(n.asn));
    };

    let name = neighbor_name(n.asn, peer_id);
    let outgoing = outgoing_to_frr(n, &name, ipv4_prefixes, ipv6_prefixes)?;
    let incoming = incoming_to_frr(n)?;

    Ok(NeighborConfig {
        name,
        ip_family: family,
        asn: n.asn,
        addr: n.address.clone(),
        iface: n.interface.clone(),
        port: n.port,
        src_addr: n.source_address.clone(),
        password: n.password.clone(),
        hold_time: n.hold_time,
        keepalive_time: n.keepalive_time,
        connect_time: n.connect_time,
        ebgp_multihop: n.ebgp_multi_hop,
        bfd_profile: n.bfd_profile.clone(),
        vrf: vrf.to_string(),
        outgoing,
        incoming,
    })
}

fn outgoing_to_frr(
    n: &Neighbor,
    name: &str,
    ipv4_prefixes: &[String],
    ipv6_prefixes: &[String],
) -> Result<AllowedOut, ConversionError> {
    let mut filters: BTreeMap<String, OutgoingFilter> = BTreeMap::new();
    let mut has_v4 = false;
    let mut has_v6 = false;

    if n.to_advertise.allowed.mode == AllowMode::AllowAll {
        for p in ipv4_prefixes {
            filters.insert(p.clone(), OutgoingFilter::new(p, IpFamily::Ipv4));
            has_v4 = true;
        }
        for p in ipv6_prefixes {
            filters.insert(p.clone(), OutgoingFilter::new(p, IpFamily::Ipv6));
            has_v6 = true;
        }
    } else {
        for p in &n.to_advertise.allowed.prefixes {
            let family = match ipfamily::for_cidr(p) {
                IpFamily::Ipv4 => {
                    has_v4 = true;
                    IpFamily::Ipv4
                }
                IpFamily::Ipv6 => {
                    has_v6 = true;
                    IpFamily::Ipv6
                }
                _ => return Err(ConversionError::UnknownPrefixFamily(p.clone())),
            };
            filters.insert(p.clone(), OutgoingFilter::new(p, family));
        }
    }

    for with_community in &n.to_advertise.prefixes_with_community {
        let community: Community = with_community.community.parse()?;
        for p in &with_community.prefixes {
            let Some(filter) = filters.get_mut(p) else {
                return Err(ConversionError::CommunityPrefixNotAllowed {
                    neighbor: name.to_string(),
                    community: with_community.community.clone(),
                    prefix: p.clone(),
                });
            };
            if !filter.communities.contains(&community) {
                filter.communities.push(community.clone());
            }
        }
    }

    for with_local_pref in &n.to_advertise.prefixes_with_local_pref {
        for p in &with_local_pref.prefixes {
            let Some(filter) = filters.get_mut(p) else {
                return Err(ConversionError::LocalPrefPrefixNotAllowed {
                    neighbor: name.to_string(),
                    prefix: p.clone(),
                });
            };
            match filter.local_pref {
                Some(existing) if existing != with_local_pref.local_pref => {
                    return Err(ConversionError::MultipleLocalPrefs {
                        neighbor: name.to_string(),
                        prefix: p.clone(),
                    });
                }
                _ => filter.local_pref = Some(with_local_pref.local_pref),
            }
        }
    }

    let mut prefixes: Vec<OutgoingFilter> = filters.into_values().collect();
    for f in &mut prefixes {
        f.communities.sort();
    }

    Ok(AllowedOut {
        prefixes,
        has_v4,
        has_v6,
    })
}

fn incoming_to_frr(n: &Neighbor) -> Result<AllowedIn, ConversionError> {
    if n.to_receive.allowed.mode == AllowMode::AllowAll {
        return Ok(AllowedIn {
            all: true,
            ..AllowedIn::default()
        });
    }

    let mut filters: BTreeMap<String, IncomingFilter> = BTreeMap::new();
    let mut has_v4 = false;
    let mut has_v6 = false;
    for p in &n.to_receive.allowed.prefixes {
        let family = match ipfamily::for_cidr(p) {
            IpFamily::Ipv4 => {
                has_v4 = true;
                IpFamily::Ipv4
            }
            IpFamily::Ipv6 => {
                has_v6 = true;
                IpFamily::Ipv6
            }
            _ => return Err(ConversionError::UnknownPrefixFamily(p.clone())),
        };
        filters.insert(p.clone(), IncomingFilter::new(p, family));
    }

    Ok(AllowedIn {
        all: false,
        prefixes: filters.into_values().collect(),
        has_v4,
        has_v6,
    })
}

// Assumes both routers are in the same vrf.
fn merge_router_configs(
    mut r: RouterConfig,
    to_merge: RouterConfig,
) -> Result<RouterConfig, ConversionError> {
    routers_are_compatible(&r, &to_merge)?;

    if r.router_id.is_empty() {
        r.router_id = to_merge.router_id.clone();
    }

    let v4: BTreeSet<String> = r
        .ipv4_prefixes
        .iter()
        .chain(to_merge.ipv4_prefixes.iter())
        .cloned()
        .collect();
    let v6: BTreeSet<String> = r
        .ipv6_prefixes
        .iter()
        .chain(to_merge.ipv6_prefixes.iter())
        .cloned()
        .collect();

    let mut neighbors = r.neighbors;
    neighbors.extend(to_merge.neighbors);
    r.neighbors = merge_neighbors(neighbors)?;
    r.ipv4_prefixes = v4.into_iter().collect();
    r.ipv6_prefixes = v6.into_iter().collect();

    Ok(r)
}

// Assumes both routers are in the same vrf.
fn routers_are_compatible(r: &RouterConfig, to_merge: &RouterConfig) -> Result<(), ConversionError> {
    if r.my_asn != to_merge.my_asn {
        return Err(ConversionError::DifferentAsns(
            r.my_asn,
            to_merge.my_asn,
            r.vrf.clone(),
        ));
    }

    let both_router_ids_non_empty = !r.router_id.is_empty() && !to_merge.router_id.is_empty();
    if both_router_ids_non_empty && r.router_id != to_merge.router_id {
        return Err(ConversionError::DifferentRouterIds(
            r.router_id.clone(),
            to_merge.router_id.clone(),
            r.vrf.clone(),
        ));
    }

    Ok(())
}

// Assumes they all live in the same VRF.
fn merge_neighbors(neighbors: Vec<NeighborConfig>) -> Result<Vec<NeighborConfig>, ConversionError> {
    let mut merged: BTreeMap<String, NeighborConfig> = BTreeMap::new();

    for n in neighbors {
        match merged.remove(&n.name) {
            None => {
                merged.insert(n.name.clone(), n);
            }
            Some(mut curr) => {
                neighbors_are_compatible(&curr, &n)?;
                curr.outgoing = merge_outgoing(&curr.name, curr.outgoing, n.outgoing)?;
                curr.incoming = merge_incoming(curr.incoming, n.incoming);
                merged.insert(curr.name.clone(), curr);
            }
        }
    }

    Ok(merged.into_values().collect())
}

// Assumes the neighbors share the same VRF and key.
fn neighbors_are_compatible(
    n1: &NeighborConfig,
    n2: &NeighborConfig,
) -> Result<(), ConversionError> {
    let mismatch = |field: &'static str| ConversionError::NeighborMismatch {
        field,
        neighbor: n1.peer_id().to_string(),
        vrf: n1.vrf.clone(),
    };

    if n1.asn != n2.asn {
        return Err(mismatch("asns"));
    }
    if n1.port != n2.port {
        return Err(mismatch("ports"));
    }
    if n1.src_addr != n2.src_addr {
        return Err(mismatch("source addresses"));
    }
    if n1.password != n2.password {
        return Err(mismatch("passwords"));
    }
    if n1.bfd_profile != n2.bfd_profile {
        return Err(mismatch("bfd profiles"));
    }
    if n1.ebgp_multihop != n2.ebgp_multihop {
        return Err(ConversionError::EbgpMultiHopMismatch {
            neighbor: n1.peer_id().to_string(),
            vrf: n1.vrf.clone(),
        });
    }
    if n1.hold_time != n2.hold_time {
        return Err(mismatch("hold times"));
    }
    if n1.keepalive_time != n2.keepalive_time {
        return Err(mismatch("keepalive times"));
    }
    if n1.connect_time != n2.connect_time {
        return Err(mismatch("connect times"));
    }

    Ok(())
}

// Assumes the filters belong to the same neighbor.
fn merge_outgoing(
    neighbor: &str,
    a: AllowedOut,
    b: AllowedOut,
) -> Result<AllowedOut, ConversionError> {
    let mut merged: BTreeMap<String, OutgoingFilter> = BTreeMap::new();

    for f in a.prefixes.into_iter().chain(b.prefixes) {
        match merged.remove(&f.prefix) {
            None => {
                merged.insert(f.prefix.clone(), f);
            }
            Some(mut curr) => {
                if let (Some(l1), Some(l2)) = (curr.local_pref, f.local_pref) {
                    if l1 != l2 {
                        return Err(ConversionError::MultipleLocalPrefs {
                            neighbor: neighbor.to_string(),
                            prefix: curr.prefix,
                        });
                    }
                }
                curr.local_pref = curr.local_pref.or(f.local_pref);
                for c in f.communities {
                    if !curr.communities.contains(&c) {
                        curr.communities.push(c);
                    }
                }
                curr.communities.sort();
                merged.insert(curr.prefix.clone(), curr);
            }
        }
    }

    Ok(AllowedOut {
        prefixes: merged.into_values().collect(),
        has_v4: a.has_v4 || b.has_v4,
        has_v6: a.has_v6 || b.has_v6,
    })
}

fn merge_incoming(a: AllowedIn, b: AllowedIn) -> AllowedIn {
    let all = a.all || b.all;
    if all {
        return AllowedIn {
            all: true,
            ..AllowedIn::default()
        };
    }

    let mut merged: BTreeMap<String, IncomingFilter> = BTreeMap::new();
    for f in a.prefixes.into_iter().chain(b.prefixes) {
        merged.insert(f.prefix.clone(), f);
    }

    AllowedIn {
        all: false,
        prefixes: merged.into_values().collect(),
        has_v4: a.has_v4 || b.has_v4,
        has_v6: a.has_v6 || b.has_v6,
    }
}

fn merge_bfd_profiles(
    from_k8s: &[FRRConfiguration],
) -> Result<Vec<BfdProfileConfig>, ConversionError> {
    let mut merged: BTreeMap<String, BfdProfileConfig> = BTreeMap::new();

    for cfg in from_k8s {
        for p in &cfg.spec.bgp.bfd_profiles {
            let converted = bfd_profile_to_frr(p);
            match merged.get(&p.name) {
                None => {
                    merged.insert(p.name.clone(), converted);
                }
                Some(existing) if *existing == converted => {}
                Some(_) => return Err(ConversionError::BfdProfileMismatch(p.name.clone())),
            }
        }
    }

    Ok(merged.into_values().collect())
}

fn bfd_profile_to_frr(p: &BFDProfile) -> BfdProfileConfig {
    BfdProfileConfig {
        name: p.name.clone(),
        receive_interval: p.receive_interval,
        transmit_interval: p.transmit_interval,
        detect_multiplier: p.detect_multiplier,
        echo_interval: p.echo_interval,
        echo_mode: p.echo_mode,
        passive_mode: p.passive_mode,
        minimum_ttl: p.minimum_ttl,
    }
}
