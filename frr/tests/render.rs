// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Golden-file tests for the frr.conf renderer. Run with
//! `UPDATE_GOLDEN=1` to regenerate the golden files.

use frr::{
    AllowedIn, AllowedOut, BfdProfileConfig, Config, NeighborConfig, OutgoingFilter, RouterConfig,
    neighbor_name, render_config,
};
use ipfamily::IpFamily;

fn check_golden(name: &str, config: &Config) {
    let rendered = render_config(config);
    let golden_file = format!("testdata/{name}.golden");
    if std::env::var("UPDATE_GOLDEN").is_ok() {
        std::fs::write(&golden_file, &rendered).unwrap();
    }
    let golden = std::fs::read_to_string(&golden_file)
        .unwrap_or_else(|e| panic!("failed to read {golden_file}: {e}"));
    assert_eq!(
        rendered, golden,
        "rendered config for {name} differs from {golden_file}"
    );
}

fn neighbor(asn: u32, addr: &str) -> NeighborConfig {
    NeighborConfig {
        name: neighbor_name(asn, addr),
        ip_family: IpFamily::Ipv4,
        asn,
        addr: addr.to_string(),
        ..NeighborConfig::default()
    }
}

#[test]
fn single_session() {
    let config = Config {
        hostname: "dummyhostname".to_string(),
        routers: vec![RouterConfig {
            my_asn: 65000,
            neighbors: vec![NeighborConfig {
                port: Some(4567),
                outgoing: AllowedOut {
                    prefixes: vec![
                        OutgoingFilter::new("192.169.1.0/24", IpFamily::Ipv4),
                        OutgoingFilter::new("192.170.1.0/22", IpFamily::Ipv4),
                    ],
                    has_v4: true,
                    has_v6: false,
                },
                ..neighbor(65001, "192.168.1.2")
            }],
            ..RouterConfig::default()
        }],
        bfd_profiles: vec![],
    };
    check_golden("single_session", &config);
}

#[test]
fn two_routers_two_neighbors() {
    let config = Config {
        hostname: "dummyhostname".to_string(),
        routers: vec![
            RouterConfig {
                my_asn: 65000,
                neighbors: vec![NeighborConfig {
                    port: Some(4567),
                    outgoing: AllowedOut {
                        prefixes: vec![
                            OutgoingFilter::new("192.169.1.0/24", IpFamily::Ipv4),
                            OutgoingFilter::new("192.170.1.0/22", IpFamily::Ipv4),
                        ],
                        has_v4: true,
                        has_v6: false,
                    },
                    ..neighbor(65001, "192.168.1.2")
                }],
                ..RouterConfig::default()
            },
            RouterConfig {
                my_asn: 65000,
                vrf: "red".to_string(),
                ipv4_prefixes: vec!["192.169.1.0/24".to_string()],
                neighbors: vec![NeighborConfig {
                    outgoing: AllowedOut {
                        prefixes: vec![OutgoingFilter::new("192.169.1.0/24", IpFamily::Ipv4)],
                        has_v4: true,
                        has_v6: false,
                    },
                    vrf: "red".to_string(),
                    ..neighbor(65001, "192.168.1.3")
                }],
                ..RouterConfig::default()
            },
        ],
        bfd_profiles: vec![],
    };
    check_golden("two_routers_two_neighbors", &config);
}

#[test]
fn session_attributes() {
    let config = Config {
        hostname: "dummyhostname".to_string(),
        routers: vec![RouterConfig {
            my_asn: 65040,
            router_id: "192.0.2.20".to_string(),
            neighbors: vec![NeighborConfig {
                ebgp_multihop: true,
                src_addr: "192.0.2.2".to_string(),
                password: "secret".to_string(),
                hold_time: Some(90),
                keepalive_time: Some(30),
                connect_time: Some(10),
                bfd_profile: "prof1".to_string(),
                outgoing: AllowedOut {
                    prefixes: vec![
                        OutgoingFilter::new("192.0.2.0/24", IpFamily::Ipv4),
                        OutgoingFilter {
                            communities: vec![
                                "10:100".parse().unwrap(),
                                "large:123:456:7890".parse().unwrap(),
                            ],
                            local_pref: Some(150),
                            ..OutgoingFilter::new("192.0.4.0/24", IpFamily::Ipv4)
                        },
                    ],
                    has_v4: true,
                    has_v6: false,
                },
                incoming: AllowedIn {
                    all: true,
                    ..AllowedIn::default()
                },
                ..neighbor(65041, "192.0.2.21")
            }],
            ..RouterConfig::default()
        }],
        bfd_profiles: vec![BfdProfileConfig {
            receive_interval: Some(93),
            ..BfdProfileConfig::new("prof1")
        }],
    };
    check_golden("session_attributes", &config);
}

#[test]
fn two_sessions_accept_v4_and_v6() {
    use frr::IncomingFilter;
    let incoming = |prefixes: &[(&str, IpFamily)]| AllowedIn {
        all: false,
        prefixes: prefixes
            .iter()
            .map(|(p, f)| IncomingFilter::new(p, *f))
            .collect(),
        has_v4: true,
        has_v6: true,
    };
    let config = Config {
        hostname: "dummyhostname".to_string(),
        routers: vec![RouterConfig {
            my_asn: 65000,
            neighbors: vec![
                NeighborConfig {
                    port: Some(4567),
                    incoming: incoming(&[
                        ("192.168.1.0/24", IpFamily::Ipv4),
                        ("fc00:f853:ccd:e800::/64", IpFamily::Ipv6),
                    ]),
                    ..neighbor(65001, "192.168.1.2")
                },
                NeighborConfig {
                    port: Some(4567),
                    incoming: incoming(&[
                        ("192.169.1.0/24", IpFamily::Ipv4),
                        ("fc00:f853:ccd:e799::/64", IpFamily::Ipv6),
                    ]),
                    ..neighbor(65001, "192.168.1.3")
                },
            ],
            ..RouterConfig::default()
        }],
        bfd_profiles: vec![],
    };
    check_golden("two_sessions_accept_v4_and_v6", &config);
}
