// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Session-state controller. Materializes one `BGPSessionState` record per
//! (peer, VRF) FRR reports, collapses duplicates, reclaims orphans and
//! stamps every record with an owner reference to the local agent pod.

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::forward_events;
use frr::{BfdPeer, FetchError, Neighbor, StateReader, rename_default_vrf};
use k8s_intf::{
    BGPSessionState, BGPSessionStateSpec, BGPSessionStateStatus, FRRNodeState, NODE_LABEL,
    PEER_LABEL, VRF_LABEL,
};

const NO_BFD_CONFIGURED: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("fetching FRR state: {0}")]
    Fetch(#[from] FetchError),
    #[error("cluster store error: {0}")]
    Kube(#[from] kube::Error),
    #[error("errors applying session states: {}", .0.join("; "))]
    Aggregate(Vec<String>),
}

/// Encode a peer identifier into a label-safe value. Label values cannot
/// contain colons and must be alphanumeric-bounded, so IPv6 literals are
/// expanded to all eight hextets and written with dashes.
pub fn encode_peer(id: &str) -> String {
    match id.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => id.to_string(),
        Ok(IpAddr::V6(addr)) => expanded_v6(addr).replace(':', "-"),
        // interface names pass through
        Err(_) => id.to_string(),
    }
}

/// Inverse of [`encode_peer`] for encoded IPv6 labels; anything else
/// passes through unchanged.
pub fn decode_peer(label: &str) -> String {
    let candidate = label.replace('-', ":");
    if candidate.parse::<Ipv6Addr>().is_ok() {
        candidate
    } else {
        label.to_string()
    }
}

fn expanded_v6(addr: Ipv6Addr) -> String {
    let segments = addr.segments();
    let groups: Vec<String> = segments.iter().map(|s| format!("{s:04x}")).collect();
    groups.join(":")
}

fn labels_for(status: &BGPSessionStateStatus) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NODE_LABEL.to_string(), status.node.clone()),
        (PEER_LABEL.to_string(), status.peer.clone()),
        (VRF_LABEL.to_string(), status.vrf.clone()),
    ])
}

/// Compute the desired record bodies from the fetched snapshots, keyed by
/// (vrf, encoded peer label). Both maps must already use the canonical
/// empty-string default VRF.
fn desired_states(
    node_name: &str,
    neighbors: &HashMap<String, Vec<Neighbor>>,
    bfds: &HashMap<String, Vec<BfdPeer>>,
) -> HashMap<(String, String), BGPSessionStateStatus> {
    let mut bfd_for_peer: HashMap<&str, HashMap<&str, &str>> = HashMap::new();
    for (vrf, peers) in bfds {
        let by_peer = bfd_for_peer.entry(vrf.as_str()).or_default();
        for p in peers {
            by_peer.insert(p.peer.as_str(), p.status.as_str());
        }
    }

    let mut desired = HashMap::new();
    for (vrf, neighs) in neighbors {
        for neigh in neighs {
            let peer_label = encode_peer(&neigh.id);
            let bfd_status = bfd_for_peer
                .get(vrf.as_str())
                .and_then(|m| m.get(neigh.id.as_str()))
                .copied()
                .filter(|s| !s.is_empty())
                .unwrap_or(NO_BFD_CONFIGURED);
            desired.insert(
                (vrf.clone(), peer_label.clone()),
                BGPSessionStateStatus {
                    node: node_name.to_string(),
                    peer: peer_label,
                    vrf: vrf.clone(),
                    bgp_status: neigh.bgp_state.clone(),
                    bfd_status: bfd_status.to_string(),
                },
            );
        }
    }
    desired
}

/// What a reconcile has to do to the cluster store.
#[derive(Debug, Default)]
struct SessionStateOps {
    /// Duplicate and orphaned records.
    delete: Vec<BGPSessionState>,
    /// `(existing record to update, desired status)`; `None` means create.
    apply: Vec<(Option<BGPSessionState>, BGPSessionStateStatus)>,
}

fn diff_states(
    existing: Vec<BGPSessionState>,
    desired: HashMap<(String, String), BGPSessionStateStatus>,
) -> SessionStateOps {
    let mut ops = SessionStateOps::default();

    let mut by_key: HashMap<(String, String), BGPSessionState> = HashMap::new();
    for s in existing {
        let labels = s.labels();
        let key = (
            labels.get(VRF_LABEL).cloned().unwrap_or_default(),
            labels.get(PEER_LABEL).cloned().unwrap_or_default(),
        );
        if by_key.contains_key(&key) {
            // self-healing: the list may transiently return duplicates
            ops.delete.push(s);
        } else {
            by_key.insert(key, s);
        }
    }

    for (key, status) in desired {
        match by_key.remove(&key) {
            Some(curr) => {
                let labels_match = *curr.labels() == labels_for(&status);
                let status_match = curr.status.as_ref() == Some(&status);
                if !(labels_match && status_match) {
                    ops.apply.push((Some(curr), status));
                }
            }
            None => ops.apply.push((None, status)),
        }
    }

    // whatever is left belongs to neighbors FRR no longer has
    ops.delete.extend(by_key.into_values());
    ops
}

pub struct SessionStateParams<R> {
    pub client: Client,
    pub state: Arc<R>,
    pub node_name: String,
    pub namespace: String,
    /// Owner reference to the local agent pod; record cleanup cascades
    /// from pod deletion.
    pub daemon_pod: OwnerReference,
    pub resync_period: Duration,
}

pub struct SessionStateController<R> {
    params: SessionStateParams<R>,
}

impl<R> SessionStateController<R>
where
    R: StateReader + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(params: SessionStateParams<R>) -> Self {
        Self { params }
    }

    /// Watch this node's session-state records and node-state object and
    /// reconcile on every event, with a periodic resync as a safety net.
    /// Events arriving while a reconcile runs coalesce into one follow-up.
    pub async fn run(self) {
        let p = &self.params;
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let states: Api<BGPSessionState> = Api::namespaced(p.client.clone(), &p.namespace);
        let cfg = watcher::Config::default().labels(&format!("{NODE_LABEL}={}", p.node_name));
        tokio::spawn(forward_events(watcher(states, cfg), tx.clone()));

        let node_states: Api<FRRNodeState> = Api::all(p.client.clone());
        let cfg = watcher::Config::default().fields(&format!("metadata.name={}", p.node_name));
        tokio::spawn(forward_events(watcher(node_states, cfg), tx.clone()));

        let resync_tx = tx.clone();
        let period = p.resync_period;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let _ = resync_tx.try_send(());
            }
        });

        let mut backoff = Duration::from_secs(1);
        const MAX_BACKOFF: Duration = Duration::from_secs(300);
        while rx.recv().await.is_some() {
            while rx.try_recv().is_ok() {}
            debug!("start session-state reconcile");
            match self.reconcile_once().await {
                Ok(()) => backoff = Duration::from_secs(1),
                Err(err) => {
                    warn!("session-state reconcile failed: {err}, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    let _ = tx.try_send(());
                }
            }
            debug!("end session-state reconcile");
        }
    }

    /// One full pass: list, fetch, diff, apply.
    pub async fn reconcile_once(&self) -> Result<(), ReconcileError> {
        let p = &self.params;
        let api: Api<BGPSessionState> = Api::namespaced(p.client.clone(), &p.namespace);

        let lp = ListParams::default().labels(&format!("{NODE_LABEL}={}", p.node_name));
        let existing = api.list(&lp).await?.items;

        // a fetch failure aborts the reconcile without touching records
        let neighbors = rename_default_vrf(p.state.bgp_neighbors()?);
        let bfds = rename_default_vrf(p.state.bfd_peers()?);

        let desired = desired_states(&p.node_name, &neighbors, &bfds);
        let ops = diff_states(existing, desired);

        let mut errs = Vec::new();
        for s in &ops.delete {
            if let Err(err) = self.delete_state(&api, s).await {
                errs.push(err.to_string());
            }
        }
        for (curr, status) in ops.apply {
            if let Err(err) = self.apply_state(&api, curr, status).await {
                errs.push(err.to_string());
            }
        }

        if !errs.is_empty() {
            return Err(ReconcileError::Aggregate(errs));
        }
        Ok(())
    }

    async fn delete_state(
        &self,
        api: &Api<BGPSessionState>,
        s: &BGPSessionState,
    ) -> Result<(), kube::Error> {
        let name = s.name_any();
        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("deleted session state {name}");
                Ok(())
            }
            // it vanished between list and delete
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn apply_state(
        &self,
        api: &Api<BGPSessionState>,
        curr: Option<BGPSessionState>,
        status: BGPSessionStateStatus,
    ) -> Result<(), kube::Error> {
        let p = &self.params;
        let labels = labels_for(&status);

        let name = match curr {
            Some(curr) => {
                let name = curr.name_any();
                let mut owner_refs = curr.owner_references().to_vec();
                if !owner_refs.iter().any(|r| r.uid == p.daemon_pod.uid) {
                    owner_refs.push(p.daemon_pod.clone());
                }
                let patch = json!({
                    "metadata": {
                        "labels": labels,
                        "ownerReferences": owner_refs,
                    }
                });
                api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                name
            }
            None => {
                let new_state = BGPSessionState {
                    metadata: ObjectMeta {
                        generate_name: Some(format!("{}-", p.node_name)),
                        namespace: Some(p.namespace.clone()),
                        labels: Some(labels),
                        owner_references: Some(vec![p.daemon_pod.clone()]),
                        ..ObjectMeta::default()
                    },
                    spec: BGPSessionStateSpec::default(),
                    status: None,
                };
                let created = api.create(&PostParams::default(), &new_state).await?;
                created.name_any()
            }
        };

        api.patch_status(
            &name,
            &PatchParams::default(),
            &Patch::Merge(&json!({"status": status})),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
