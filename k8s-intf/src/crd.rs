// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `frrk8s.metallb.io/v1beta1` API types. `FRRConfiguration` is the
//! operator-authored routing intent, `FRRNodeState` surfaces per-node
//! conversion/reload status and `BGPSessionState` publishes the observed
//! per-(node, peer, VRF) session state.

use k8s_openapi::api::core::v1::SecretReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "frrk8s.metallb.io";
pub const VERSION: &str = "v1beta1";

/// Label carrying the owning node's name on `BGPSessionState` objects.
pub const NODE_LABEL: &str = "frrk8s.metallb.io/node";
/// Label carrying the encoded peer identifier.
pub const PEER_LABEL: &str = "frrk8s.metallb.io/peer";
/// Label carrying the VRF name, empty for the default VRF.
pub const VRF_LABEL: &str = "frrk8s.metallb.io/vrf";

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "frrk8s.metallb.io",
    version = "v1beta1",
    kind = "FRRConfiguration",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FRRConfigurationSpec {
    #[serde(default)]
    pub bgp: BGPConfig,
    /// Limits the nodes the configuration applies to. Empty matches all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<LabelSelector>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BGPConfig {
    #[serde(default)]
    pub routers: Vec<Router>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bfd_profiles: Vec<BFDProfile>,
}

/// One BGP router instance. Routers of different configurations targeting
/// the same VRF are merged on the node, provided they are compatible.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    pub asn: u32,
    /// Router id, an IPv4 literal. Empty lets FRR pick one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Target VRF; empty means the default VRF.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vrf: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighbors: Vec<Neighbor>,
    /// CIDRs this router may advertise, both families mixed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Neighbor {
    pub asn: u32,
    /// Peer address literal, v4 or v6. Mutually exclusive with `interface`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// Interface name for unnumbered peering.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Plain-text session password. Takes precedence over `password_secret`
    /// once the secret has been resolved by the intent loader.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<SecretReference>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_address: String,
    /// Hold time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_time: Option<u64>,
    /// Keepalive time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_time: Option<u64>,
    /// Connect time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_time: Option<u64>,
    #[serde(default)]
    pub ebgp_multi_hop: bool,
    /// Name of a profile in `bgp.bfdProfiles` enabling BFD for the session.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bfd_profile: String,
    #[serde(default)]
    pub to_advertise: Advertise,
    #[serde(default)]
    pub to_receive: Receive,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advertise {
    #[serde(default)]
    pub allowed: AllowedPrefixes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes_with_community: Vec<CommunityPrefixes>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes_with_local_pref: Vec<LocalPrefPrefixes>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receive {
    #[serde(default)]
    pub allowed: AllowedPrefixes,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllowedPrefixes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub mode: AllowMode,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AllowMode {
    /// Every prefix the router declares is allowed.
    #[serde(rename = "allow-all")]
    AllowAll,
    /// Only the prefixes enumerated next to the mode are allowed.
    #[default]
    #[serde(rename = "filtered")]
    AllowRestricted,
}

/// Community attached to a subset of the advertised prefixes. Standard
/// (`ASN:VALUE`) and large (`large:A:B:C`) syntaxes are accepted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPrefixes {
    pub community: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalPrefPrefixes {
    pub local_pref: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BFDProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmit_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_multiplier: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo_interval: Option<u32>,
    #[serde(default)]
    pub echo_mode: bool,
    #[serde(default)]
    pub passive_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_ttl: Option<u32>,
}

/// Cluster-scoped, one per node, named after the node. Only carries
/// status; its events also drive the session-state resync.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "frrk8s.metallb.io",
    version = "v1beta1",
    kind = "FRRNodeState",
    status = "FRRNodeStateStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct FRRNodeStateSpec {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FRRNodeStateStatus {
    /// The FRR configuration currently running on the node.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub running_config: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_conversion_result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_reload_result: String,
}

/// Namespaced observation of one BGP session, labeled with
/// [`NODE_LABEL`], [`PEER_LABEL`] and [`VRF_LABEL`].
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "frrk8s.metallb.io",
    version = "v1beta1",
    kind = "BGPSessionState",
    namespaced,
    status = "BGPSessionStateStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BGPSessionStateSpec {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BGPSessionStateStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub peer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vrf: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bgp_status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bfd_status: String,
}
