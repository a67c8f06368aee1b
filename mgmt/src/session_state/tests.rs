// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::*;
use std::net::Ipv4Addr;

fn neighbor(id: &str, state: &str) -> Neighbor {
    Neighbor {
        id: id.to_string(),
        bgp_state: state.to_string(),
    }
}

fn bfd(peer: &str, status: &str) -> BfdPeer {
    BfdPeer {
        peer: peer.to_string(),
        status: status.to_string(),
    }
}

const NODE: &str = "test-node";

fn initial_neighbors() -> HashMap<String, Vec<Neighbor>> {
    let m = HashMap::from([
        (
            "default".to_string(),
            vec![
                neighbor("192.168.1.1", "Active"),
                neighbor("192.168.1.2", "Active"),
                neighbor("fc00:f853:ccd:e899::", "Active"),
                neighbor("eth0", "Active"),
            ],
        ),
        ("red".to_string(), vec![neighbor("192.168.1.1", "Active")]),
    ]);
    rename_default_vrf(m)
}

fn initial_bfds() -> HashMap<String, Vec<BfdPeer>> {
    let m = HashMap::from([
        ("default".to_string(), vec![bfd("192.168.1.1", "down")]),
        ("red".to_string(), vec![bfd("192.168.1.1", "down")]),
    ]);
    rename_default_vrf(m)
}

fn record_for(status: &BGPSessionStateStatus, name: &str) -> BGPSessionState {
    BGPSessionState {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("frr-k8s-system".to_string()),
            labels: Some(labels_for(status)),
            ..ObjectMeta::default()
        },
        spec: BGPSessionStateSpec::default(),
        status: Some(status.clone()),
    }
}

#[test]
fn encodes_peer_identifiers() {
    assert_eq!(encode_peer("192.168.1.1"), "192.168.1.1");
    assert_eq!(
        encode_peer("fc00:f853:ccd:e899::"),
        "fc00-f853-0ccd-e899-0000-0000-0000-0000"
    );
    assert_eq!(encode_peer("eth0"), "eth0");
}

#[test]
fn equivalent_v6_literals_share_a_label() {
    assert_eq!(encode_peer("::1"), encode_peer("0:0:0:0:0:0:0:1"));
}

#[test]
fn decodes_peer_labels() {
    assert_eq!(decode_peer("192.168.1.1"), "192.168.1.1");
    assert_eq!(
        decode_peer("fc00-f853-0ccd-e899-0000-0000-0000-0000")
            .parse::<IpAddr>()
            .unwrap(),
        "fc00:f853:ccd:e899::".parse::<IpAddr>().unwrap()
    );
    assert_eq!(decode_peer("eth0"), "eth0");
    // a dash in an interface name must not turn into a colon
    assert_eq!(decode_peer("eth-0"), "eth-0");
}

#[test]
fn peer_label_round_trip() {
    bolero::check!()
        .with_type::<(bool, [u8; 16])>()
        .for_each(|(v4, bytes)| {
            let ip: IpAddr = if *v4 {
                IpAddr::V4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
            } else {
                IpAddr::V6(Ipv6Addr::from(*bytes))
            };
            let encoded = encode_peer(&ip.to_string());
            assert!(!encoded.contains(':'));
            let decoded = decode_peer(&encoded);
            assert_eq!(decoded.parse::<IpAddr>().unwrap(), ip);
        });
}

#[test]
fn desired_states_cover_every_fetched_peer() {
    let desired = desired_states(NODE, &initial_neighbors(), &initial_bfds());
    assert_eq!(desired.len(), 5);

    let v6_label = "fc00-f853-0ccd-e899-0000-0000-0000-0000";
    let expect = |vrf: &str, peer: &str, bgp: &str, bfd: &str| {
        let status = &desired[&(vrf.to_string(), peer.to_string())];
        assert_eq!(status.node, NODE);
        assert_eq!(status.peer, peer);
        assert_eq!(status.vrf, vrf);
        assert_eq!(status.bgp_status, bgp);
        assert_eq!(status.bfd_status, bfd);
    };
    expect("", "192.168.1.1", "Active", "down");
    expect("", "192.168.1.2", "Active", "N/A");
    expect("", v6_label, "Active", "N/A");
    expect("", "eth0", "Active", "N/A");
    expect("red", "192.168.1.1", "Active", "down");
}

// FRR reports the default VRF as the literal string "default"; no record
// may carry it.
#[test]
fn default_vrf_is_normalized() {
    let neighbors = rename_default_vrf(HashMap::from([(
        "default".to_string(),
        vec![neighbor("192.168.1.1", "Established")],
    )]));
    let desired = desired_states(NODE, &neighbors, &HashMap::new());
    assert_eq!(desired.len(), 1);
    let status = &desired[&(String::new(), "192.168.1.1".to_string())];
    assert_eq!(status.vrf, "");
    assert!(!desired.keys().any(|(vrf, _)| vrf == "default"));
}

#[test]
fn first_reconcile_creates_everything() {
    let desired = desired_states(NODE, &initial_neighbors(), &initial_bfds());
    let ops = diff_states(Vec::new(), desired);
    assert!(ops.delete.is_empty());
    assert_eq!(ops.apply.len(), 5);
    assert!(ops.apply.iter().all(|(curr, _)| curr.is_none()));
}

#[test]
fn matching_records_are_left_alone() {
    let desired = desired_states(NODE, &initial_neighbors(), &initial_bfds());
    let existing: Vec<BGPSessionState> = desired
        .values()
        .enumerate()
        .map(|(i, status)| record_for(status, &format!("{NODE}-{i}")))
        .collect();
    let ops = diff_states(existing, desired);
    assert!(ops.delete.is_empty());
    assert!(ops.apply.is_empty());
}

#[test]
fn removed_and_changed_peers_reconcile() {
    let desired = desired_states(NODE, &initial_neighbors(), &initial_bfds());
    let existing: Vec<BGPSessionState> = desired
        .values()
        .enumerate()
        .map(|(i, status)| record_for(status, &format!("{NODE}-{i}")))
        .collect();

    // second+third+fourth default-VRF peers disappear, the surviving ones
    // move to Established/up
    let neighbors = rename_default_vrf(HashMap::from([
        (
            "default".to_string(),
            vec![neighbor("192.168.1.1", "Established")],
        ),
        (
            "red".to_string(),
            vec![neighbor("192.168.1.1", "Established")],
        ),
    ]));
    let bfds = rename_default_vrf(HashMap::from([
        ("default".to_string(), vec![bfd("192.168.1.1", "up")]),
        ("red".to_string(), vec![bfd("192.168.1.1", "up")]),
    ]));
    let next = desired_states(NODE, &neighbors, &bfds);

    let ops = diff_states(existing, next);
    assert_eq!(ops.delete.len(), 3);
    assert_eq!(ops.apply.len(), 2);
    for (curr, status) in &ops.apply {
        assert!(curr.is_some(), "update must preserve record identity");
        assert_eq!(status.bgp_status, "Established");
        assert_eq!(status.bfd_status, "up");
    }
}

#[test]
fn duplicate_records_collapse_to_one() {
    let desired = desired_states(NODE, &initial_neighbors(), &initial_bfds());
    let mut existing: Vec<BGPSessionState> = desired
        .values()
        .enumerate()
        .map(|(i, status)| record_for(status, &format!("{NODE}-{i}")))
        .collect();
    let dup_status = &desired[&(String::new(), "192.168.1.1".to_string())];
    existing.push(record_for(dup_status, "test-node-dup"));

    let ops = diff_states(existing, desired);
    assert_eq!(ops.delete.len(), 1);
    assert_eq!(ops.delete[0].metadata.name.as_deref(), Some("test-node-dup"));
    assert!(ops.apply.is_empty());
}
