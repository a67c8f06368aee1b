// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: router stanzas and address families

use ipfamily::IpFamily;

use crate::config::{Config, RouterConfig};
use crate::renderer::builder::{ConfigBuilder, MARKER, Render};
use crate::renderer::neighbor::{activates, render_filters};

impl Render for RouterConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();

        cfg += MARKER;
        let mut heading = format!("router bgp {}", self.my_asn);
        if !self.vrf.is_empty() {
            heading += &format!(" vrf {}", self.vrf);
        }
        cfg += heading;
        cfg += " no bgp ebgp-requires-policy";
        cfg += " no bgp default ipv4-unicast";
        cfg += " no bgp network import-check";
        if !self.router_id.is_empty() {
            cfg += format!(" bgp router-id {}", self.router_id);
        }

        for n in &self.neighbors {
            cfg += n.render(&());
        }

        cfg += self.render_family(IpFamily::Ipv4);
        cfg += self.render_family(IpFamily::Ipv6);
        cfg += "exit";

        /* prefix lists and route maps live outside the router stanza */
        for n in &self.neighbors {
            cfg += render_filters(n);
        }

        cfg
    }
}

impl RouterConfig {
    fn render_family(&self, family: IpFamily) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();

        let networks = match family {
            IpFamily::Ipv4 => &self.ipv4_prefixes,
            _ => &self.ipv6_prefixes,
        };
        let active: Vec<_> = self
            .neighbors
            .iter()
            .filter(|n| activates(n, family))
            .collect();
        if networks.is_empty() && active.is_empty() {
            return cfg;
        }

        cfg += format!(" address-family {family} unicast");
        for p in networks {
            cfg += format!("  network {p}");
        }
        for n in active {
            let peer = n.peer_id();
            cfg += format!("  neighbor {peer} activate");
            cfg += format!("  neighbor {peer} route-map {}-in in", n.name);
            cfg += format!("  neighbor {peer} route-map {}-out out", n.name);
        }
        cfg += " exit-address-family";

        cfg
    }
}

impl Render for Config {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();

        cfg += "frr defaults traditional";
        if !self.hostname.is_empty() {
            cfg += format!("hostname {}", self.hostname);
        }
        cfg += "log file /etc/frr/frr.log informational";
        cfg += "log timestamp precision 3";
        cfg += "ip nht resolve-via-default";
        cfg += "ipv6 nht resolve-via-default";

        cfg += self.bfd_profiles.render(&());

        for r in &self.routers {
            cfg += r.render(&());
        }

        cfg += MARKER;
        cfg
    }
}
