// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The per-node FRR agent. Runs the configuration controller and the
//! session-state controller against the local FRR instance.

#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::Api;
use kube::{Client, ResourceExt};
use nix::unistd::gethostname;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use frr::{ConfigApplier, FrrPaths, VtyshReader};
use mgmt::{
    ConfigController, ConfigControllerParams, SessionStateController, SessionStateParams,
};

#[derive(Debug, Parser)]
#[command(about = "Per-node agent programming FRR from declarative routing intent")]
struct CmdArgs {
    /// Name of the node the agent runs on.
    #[arg(long, env = "NODE_NAME")]
    node_name: Option<String>,

    /// Namespace holding the intent records and the session states.
    #[arg(long, env = "NAMESPACE", default_value = "frr-k8s-system")]
    namespace: String,

    /// Name of the agent pod, used as owner of the session states.
    #[arg(long, env = "POD_NAME")]
    pod_name: String,

    /// Period of the session-state resync, in seconds.
    #[arg(long, default_value_t = 600)]
    resync_period: u64,

    /// vtysh binary used to query FRR runtime state.
    #[arg(long, default_value = "vtysh")]
    vtysh_bin: String,
}

fn init_node_name(args: &CmdArgs) -> Result<String, String> {
    if let Some(name) = &args.node_name {
        return Ok(name.clone());
    }
    let hostname =
        gethostname().map_err(|errno| format!("Failed to get hostname: {}", errno.desc()))?;
    let name = hostname
        .to_str()
        .ok_or_else(|| format!("Failed to convert hostname {}", hostname.display()))?;
    Ok(name.to_string())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

async fn pod_owner_reference(
    client: Client,
    namespace: &str,
    pod_name: &str,
) -> Result<OwnerReference, kube::Error> {
    let pods: Api<Pod> = Api::namespaced(client, namespace);
    let pod = pods.get(pod_name).await?;
    Ok(OwnerReference {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        name: pod.name_any(),
        uid: pod.uid().unwrap_or_default(),
        ..OwnerReference::default()
    })
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = CmdArgs::parse();

    let node_name = match init_node_name(&args) {
        Ok(name) => name,
        Err(e) => {
            eprintln!("Failed to determine node name: {e}");
            std::process::exit(1);
        }
    };
    info!("starting frr-agent on node '{node_name}'");

    let paths = match FrrPaths::from_env() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("FRR_CONFIG_FILE must be set: {e}");
            std::process::exit(1);
        }
    };

    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build cluster client: {e}");
            std::process::exit(1);
        }
    };

    let daemon_pod =
        match pod_owner_reference(client.clone(), &args.namespace, &args.pod_name).await {
            Ok(owner) => owner,
            Err(e) => {
                eprintln!("Failed to resolve agent pod {}: {e}", args.pod_name);
                std::process::exit(1);
            }
        };

    let (applier, applier_worker) = ConfigApplier::new(paths);
    let applier_handle = tokio::spawn(applier_worker.run());

    let config_controller = ConfigController::new(ConfigControllerParams {
        client: client.clone(),
        node_name: node_name.clone(),
        namespace: args.namespace.clone(),
        hostname: node_name.clone(),
        applier,
    });
    let config_handle = tokio::spawn(config_controller.run());

    let session_controller = SessionStateController::new(SessionStateParams {
        client,
        state: Arc::new(VtyshReader::with_bin(&args.vtysh_bin)),
        node_name,
        namespace: args.namespace,
        daemon_pod,
        resync_period: Duration::from_secs(args.resync_period),
    });
    let session_handle = tokio::spawn(session_controller.run());

    tokio::select! {
        _ = applier_handle => error!("applier worker exited unexpectedly"),
        _ = config_handle => error!("configuration controller exited unexpectedly"),
        _ = session_handle => error!("session-state controller exited unexpectedly"),
    }
    std::process::exit(1);
}
