// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration controller. Watches the routing intent, selects the
//! records applying to this node, converts and merges them into one
//! canonical config, hands it to the applier and surfaces the conversion
//! and reload results on this node's `FRRNodeState` object.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, Secret};
use kube::api::{Api, ListParams, ObjectMeta, PostParams};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api_to_config::api_to_frr;
use crate::events::forward_events;
use crate::node_filter::matches_node;
use frr::{Config, ConfigApplier, render_config};
use k8s_intf::{
    FRRConfiguration, FRRNodeState, FRRNodeStateSpec, FRRNodeStateStatus,
    replace_node_state_status,
};

const CONVERSION_SUCCESS: &str = "success";

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("cluster store error: {0}")]
    Kube(#[from] kube::Error),
    #[error("replacing node state status: {0}")]
    ReplaceStatus(#[from] k8s_intf::ReplaceStatusError),
    #[error("apply error: {0}")]
    Apply(#[from] frr::ApplyError),
}

pub struct ConfigControllerParams {
    pub client: Client,
    pub node_name: String,
    pub namespace: String,
    /// Stamped into the rendered configuration.
    pub hostname: String,
    pub applier: ConfigApplier,
}

pub struct ConfigController {
    params: ConfigControllerParams,
}

/// Select the records applying to this node and convert them. Selector
/// and conversion failures are user-input problems: they are reported as
/// a message for the node state, not retried.
fn select_and_convert(
    configs: &[FRRConfiguration],
    node_labels: &BTreeMap<String, String>,
) -> Result<Config, String> {
    let mut applicable = Vec::new();
    for cfg in configs {
        match matches_node(cfg.spec.node_selector.as_ref(), node_labels) {
            Ok(true) => applicable.push(cfg.clone()),
            Ok(false) => {}
            Err(err) => {
                return Err(format!(
                    "invalid nodeSelector on {}: {err}",
                    cfg.name_any()
                ));
            }
        }
    }
    api_to_frr(&applicable).map_err(|err| err.to_string())
}

impl ConfigController {
    #[must_use]
    pub fn new(params: ConfigControllerParams) -> Self {
        Self { params }
    }

    /// Watch intent records, this node's state object, the node itself
    /// and the secrets living next to the intent; reconcile on every
    /// event with coalescing.
    pub async fn run(self) {
        let p = &self.params;
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let configs: Api<FRRConfiguration> = Api::namespaced(p.client.clone(), &p.namespace);
        tokio::spawn(forward_events(
            watcher(configs, watcher::Config::default()),
            tx.clone(),
        ));

        let node_states: Api<FRRNodeState> = Api::all(p.client.clone());
        let cfg = watcher::Config::default().fields(&format!("metadata.name={}", p.node_name));
        tokio::spawn(forward_events(watcher(node_states, cfg), tx.clone()));

        let nodes: Api<Node> = Api::all(p.client.clone());
        let cfg = watcher::Config::default().fields(&format!("metadata.name={}", p.node_name));
        tokio::spawn(forward_events(watcher(nodes, cfg), tx.clone()));

        let secrets: Api<Secret> = Api::namespaced(p.client.clone(), &p.namespace);
        tokio::spawn(forward_events(
            watcher(secrets, watcher::Config::default()),
            tx.clone(),
        ));

        // kick the first reconcile
        let _ = tx.try_send(());

        let mut backoff = Duration::from_secs(1);
        const MAX_BACKOFF: Duration = Duration::from_secs(300);
        while rx.recv().await.is_some() {
            while rx.try_recv().is_ok() {}
            debug!("start configuration reconcile");
            match self.reconcile_once().await {
                Ok(()) => backoff = Duration::from_secs(1),
                Err(err) => {
                    warn!("configuration reconcile failed: {err}, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    let _ = tx.try_send(());
                }
            }
            debug!("end configuration reconcile");
        }
    }

    /// One full pass: list intent, filter by node, convert, apply and
    /// surface results. Only cluster-store failures bubble up for retry.
    pub async fn reconcile_once(&self) -> Result<(), ControllerError> {
        let p = &self.params;

        let state_api: Api<FRRNodeState> = Api::all(p.client.clone());
        let current = self.ensure_node_state(&state_api).await?;

        let configs_api: Api<FRRConfiguration> = Api::namespaced(p.client.clone(), &p.namespace);
        let configs = configs_api.list(&ListParams::default()).await?.items;

        let nodes: Api<Node> = Api::all(p.client.clone());
        let node = nodes.get(&p.node_name).await?;
        let node_labels = node.labels();

        let mut status = current.status.clone().unwrap_or_default();
        match select_and_convert(&configs, node_labels) {
            Err(msg) => {
                info!("conversion failed, keeping previous FRR config: {msg}");
                status.last_conversion_result = msg;
            }
            Ok(mut config) => {
                config.hostname = p.hostname.clone();
                status.last_conversion_result = CONVERSION_SUCCESS.to_string();
                let outcome = p.applier.apply(config.clone()).await?;
                if outcome.is_ok() {
                    status.last_reload_result = CONVERSION_SUCCESS.to_string();
                    status.running_config = render_config(&config);
                } else {
                    status.last_reload_result = outcome.error.unwrap_or_default();
                }
            }
        }

        if current.status.as_ref() != Some(&status) {
            replace_node_state_status(p.client.clone(), &p.node_name, &status).await?;
        }
        Ok(())
    }

    async fn ensure_node_state(
        &self,
        api: &Api<FRRNodeState>,
    ) -> Result<FRRNodeState, ControllerError> {
        let p = &self.params;
        match api.get(&p.node_name).await {
            Ok(state) => Ok(state),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                info!("creating FRRNodeState for node {}", p.node_name);
                let state = FRRNodeState {
                    metadata: ObjectMeta {
                        name: Some(p.node_name.clone()),
                        ..ObjectMeta::default()
                    },
                    spec: FRRNodeStateSpec::default(),
                    status: None,
                };
                Ok(api.create(&PostParams::default(), &state).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_intf::{BGPConfig, FRRConfigurationSpec, Router};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

    fn configuration(selector: Option<LabelSelector>, asn: u32) -> FRRConfiguration {
        FRRConfiguration {
            metadata: ObjectMeta::default(),
            spec: FRRConfigurationSpec {
                bgp: BGPConfig {
                    routers: vec![Router {
                        asn,
                        ..Router::default()
                    }],
                    bfd_profiles: vec![],
                },
                node_selector: selector,
            },
        }
    }

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn selector_scopes_records_to_the_node() {
        let matching = LabelSelector {
            match_labels: Some(labels(&[("kubernetes.io/hostname", "node-a")])),
            match_expressions: None,
        };
        let other = LabelSelector {
            match_labels: Some(labels(&[("kubernetes.io/hostname", "node-b")])),
            match_expressions: None,
        };
        let configs = vec![
            configuration(None, 65001),
            configuration(Some(matching), 65001),
            configuration(Some(other), 65999),
        ];
        let node = labels(&[("kubernetes.io/hostname", "node-a")]);

        // the conflicting-ASN record targets another node, so conversion
        // must succeed with the remaining two merged
        let config = select_and_convert(&configs, &node).unwrap();
        assert_eq!(config.routers.len(), 1);
        assert_eq!(config.routers[0].my_asn, 65001);
    }

    #[test]
    fn conversion_errors_become_messages() {
        let configs = vec![
            configuration(None, 65001),
            configuration(None, 65999),
        ];
        let node = labels(&[]);
        let err = select_and_convert(&configs, &node).unwrap_err();
        assert!(err.contains("different asns"), "unexpected message: {err}");
    }

    #[test]
    fn invalid_selector_is_reported_not_propagated() {
        let bad = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![
                k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement {
                    key: "zone".to_string(),
                    operator: "Near".to_string(),
                    values: None,
                },
            ]),
        };
        let configs = vec![configuration(Some(bad), 65001)];
        let err = select_and_convert(&configs, &labels(&[])).unwrap_err();
        assert!(err.contains("invalid nodeSelector"), "unexpected: {err}");
    }
}
