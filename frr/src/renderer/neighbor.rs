// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: neighbor session lines and per-neighbor filters

use std::collections::BTreeMap;

use ipfamily::IpFamily;

use crate::community::Community;
use crate::config::NeighborConfig;
use crate::renderer::builder::{ConfigBuilder, Render};

/// Whether the neighbor takes part in the given address family, either
/// because of its session family or because a filter carries prefixes of
/// that family.
pub(crate) fn activates(n: &NeighborConfig, family: IpFamily) -> bool {
    match family {
        IpFamily::Ipv4 => {
            matches!(n.ip_family, IpFamily::Ipv4 | IpFamily::DualStack)
                || n.outgoing.has_v4
                || n.incoming.has_v4
        }
        IpFamily::Ipv6 => {
            matches!(n.ip_family, IpFamily::Ipv6 | IpFamily::DualStack)
                || n.outgoing.has_v6
                || n.incoming.has_v6
        }
        _ => false,
    }
}

impl Render for NeighborConfig {
    type Context = ();
    type Output = ConfigBuilder;

    /// Session lines only; filters are rendered separately after the
    /// router stanza closes.
    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();

        let peer = self.peer_id();
        if self.iface.is_empty() {
            cfg += format!(" neighbor {peer} remote-as {}", self.asn);
        } else {
            cfg += format!(" neighbor {peer} interface remote-as {}", self.asn);
        }
        if let Some(port) = self.port {
            cfg += format!(" neighbor {peer} port {port}");
        }
        if self.ebgp_multihop {
            cfg += format!(" neighbor {peer} ebgp-multihop");
        }
        if !self.src_addr.is_empty() {
            cfg += format!(" neighbor {peer} update-source {}", self.src_addr);
        }
        if !self.password.is_empty() {
            cfg += format!(" neighbor {peer} password {}", self.password);
        }
        if let (Some(keepalive), Some(hold)) = (self.keepalive_time, self.hold_time) {
            cfg += format!(" neighbor {peer} timers {keepalive} {hold}");
        }
        if let Some(connect) = self.connect_time {
            cfg += format!(" neighbor {peer} timers connect {connect}");
        }
        if !self.bfd_profile.is_empty() {
            cfg += format!(" neighbor {peer} bfd profile {}", self.bfd_profile);
        }

        cfg
    }
}

/// Render the prefix lists and route maps enforcing the neighbor's
/// incoming and outgoing policy. Route maps fall through to an implicit
/// deny, so only allowed prefixes get permit entries.
pub(crate) fn render_filters(n: &NeighborConfig) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();
    cfg += render_incoming(n);
    cfg += render_outgoing(n);
    cfg
}

fn render_incoming(n: &NeighborConfig) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();
    let name = &n.name;

    if n.incoming.all {
        cfg += format!("route-map {name}-in permit 1");
        return cfg;
    }

    let v4: Vec<&str> = n
        .incoming
        .prefixes
        .iter()
        .filter(|p| p.ip_family.is_v4())
        .map(|p| p.prefix.as_str())
        .collect();
    let v6: Vec<&str> = n
        .incoming
        .prefixes
        .iter()
        .filter(|p| p.ip_family.is_v6())
        .map(|p| p.prefix.as_str())
        .collect();

    if v4.is_empty() && v6.is_empty() {
        cfg += format!("route-map {name}-in deny 1");
        return cfg;
    }

    let mut seq = 1;
    if !v4.is_empty() {
        for p in &v4 {
            cfg += format!("ip prefix-list {name}-in-ipv4 permit {p}");
        }
        cfg += format!("route-map {name}-in permit {seq}");
        cfg += format!(" match ip address prefix-list {name}-in-ipv4");
        seq += 1;
    }
    if !v6.is_empty() {
        for p in &v6 {
            cfg += format!("ipv6 prefix-list {name}-in-ipv6 permit {p}");
        }
        cfg += format!("route-map {name}-in permit {seq}");
        cfg += format!(" match ipv6 address prefix-list {name}-in-ipv6");
    }

    cfg
}

type FilterGroupKey = (Option<u32>, Vec<Community>);

fn render_outgoing(n: &NeighborConfig) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();
    let name = &n.name;

    if n.outgoing.prefixes.is_empty() {
        cfg += format!("route-map {name}-out deny 1");
        return cfg;
    }

    // Prefixes sharing the same attributes share a route-map entry; the
    // v4 and v6 lists of a group need separate entries because a single
    // entry can match only one address family.
    let mut groups: BTreeMap<FilterGroupKey, (Vec<&str>, Vec<&str>)> = BTreeMap::new();
    for f in &n.outgoing.prefixes {
        let entry = groups
            .entry((f.local_pref, f.communities.clone()))
            .or_default();
        match f.ip_family {
            IpFamily::Ipv4 => entry.0.push(&f.prefix),
            IpFamily::Ipv6 => entry.1.push(&f.prefix),
            _ => {}
        }
    }

    let mut seq = 1;
    for ((local_pref, communities), (v4, v6)) in &groups {
        for (family, match_kw, prefixes) in [("ipv4", "ip", v4), ("ipv6", "ipv6", v6)] {
            if prefixes.is_empty() {
                continue;
            }
            let plist = format!("{name}-out-{seq}-{family}");
            for p in prefixes {
                cfg += format!("{match_kw} prefix-list {plist} permit {p}");
            }
            cfg += format!("route-map {name}-out permit {seq}");
            cfg += format!(" match {match_kw} address prefix-list {plist}");
            if let Some(lp) = local_pref {
                cfg += format!(" set local-preference {lp}");
            }
            let standard: Vec<String> = communities
                .iter()
                .filter(|c| !c.is_large())
                .map(ToString::to_string)
                .collect();
            if !standard.is_empty() {
                cfg += format!(" set community {} additive", standard.join(" "));
            }
            let large: Vec<String> = communities
                .iter()
                .filter(|c| c.is_large())
                .map(ToString::to_string)
                .collect();
            if !large.is_empty() {
                cfg += format!(" set large-community {} additive", large.join(" "));
            }
            seq += 1;
        }
    }

    cfg
}
