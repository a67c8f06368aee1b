// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration applier. Renders a canonical config, writes it to a
//! scratch path, drives the FRR reload utility and promotes the scratch
//! file on success. Requests are coalesced: at most one apply runs at a
//! time and a newer request subsumes any that are still pending.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::reload::{ReloadError, reload_frr};
use crate::renderer::render_config;

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("reload error: {0}")]
    Reload(#[from] ReloadError),
    #[error("applier worker is gone")]
    WorkerGone,
}

/// Where the live configuration lives and how to reload FRR.
#[derive(Clone, Debug)]
pub struct FrrPaths {
    pub config_file: String,
    pub reload_bin: String,
}

pub const FRR_CONFIG_FILE_ENV: &str = "FRR_CONFIG_FILE";
pub const FRR_RELOAD_BIN_ENV: &str = "FRR_RELOAD_BIN";
const DEFAULT_RELOAD_BIN: &str = "/usr/lib/frr/frr-reload.py";

impl FrrPaths {
    /// Capture the process-scope configuration at start-up.
    ///
    /// # Errors
    /// Fails when `FRR_CONFIG_FILE` is unset.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            config_file: std::env::var(FRR_CONFIG_FILE_ENV)?,
            reload_bin: std::env::var(FRR_RELOAD_BIN_ENV)
                .unwrap_or_else(|_| DEFAULT_RELOAD_BIN.to_string()),
        })
    }
}

#[derive(Clone, Debug)]
struct Request {
    seq: u64,
    config: Config,
}

/// Outcome of the most recent apply, observed by all waiters.
#[derive(Clone, Debug, Default)]
pub struct ApplyOutcome {
    pub seq: u64,
    /// Whether FRR was actually reloaded; false when the rendered config
    /// matched the live file byte for byte.
    pub changed: bool,
    pub error: Option<String>,
}

impl ApplyOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Handle used to request configuration applies. Cloneable; all clones
/// feed the same single worker.
#[derive(Clone)]
pub struct ConfigApplier {
    seq: Arc<AtomicU64>,
    req_tx: watch::Sender<Option<Request>>,
    status_rx: watch::Receiver<ApplyOutcome>,
}

/// The single apply worker. Spawn [`ApplierWorker::run`] once.
pub struct ApplierWorker {
    paths: FrrPaths,
    req_rx: watch::Receiver<Option<Request>>,
    status_tx: watch::Sender<ApplyOutcome>,
}

impl ConfigApplier {
    #[must_use]
    pub fn new(paths: FrrPaths) -> (Self, ApplierWorker) {
        let (req_tx, req_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(ApplyOutcome::default());
        (
            Self {
                seq: Arc::new(AtomicU64::new(0)),
                req_tx,
                status_rx,
            },
            ApplierWorker {
                paths,
                req_rx,
                status_tx,
            },
        )
    }

    /// Request an apply and wait until this request, or a newer one that
    /// subsumed it, has been processed.
    pub async fn apply(&self, config: Config) -> Result<ApplyOutcome, ApplyError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.req_tx.send_replace(Some(Request { seq, config }));

        let mut rx = self.status_rx.clone();
        loop {
            {
                let outcome = rx.borrow_and_update();
                if outcome.seq >= seq {
                    return Ok(outcome.clone());
                }
            }
            if rx.changed().await.is_err() {
                return Err(ApplyError::WorkerGone);
            }
        }
    }
}

impl ApplierWorker {
    /// Drain apply requests until every [`ConfigApplier`] handle is gone.
    /// Events arriving while an apply is in flight coalesce into a single
    /// follow-up run.
    pub async fn run(mut self) {
        while self.req_rx.changed().await.is_ok() {
            let Some(req) = self.req_rx.borrow_and_update().clone() else {
                continue;
            };
            let outcome = match apply_once(&self.paths, &req.config) {
                Ok(changed) => ApplyOutcome {
                    seq: req.seq,
                    changed,
                    error: None,
                },
                Err(err) => {
                    warn!("failed to apply FRR config: {err}");
                    ApplyOutcome {
                        seq: req.seq,
                        changed: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            self.status_tx.send_replace(outcome);
        }
    }
}

/// One complete apply: render, skip if live config already matches, write
/// the scratch file, reload, promote. On reload failure the scratch file
/// is removed and the previous configuration remains effective.
fn apply_once(paths: &FrrPaths, config: &Config) -> Result<bool, ApplyError> {
    let rendered = render_config(config);

    if let Ok(current) = fs::read_to_string(&paths.config_file) {
        if current == rendered {
            debug!("rendered config identical to {}, skipping reload", paths.config_file);
            return Ok(false);
        }
    }

    let scratch = format!("{}.new", paths.config_file);
    fs::write(&scratch, &rendered)?;
    if let Err(err) = reload_frr(&paths.reload_bin, &scratch) {
        let _ = fs::remove_file(&scratch);
        return Err(err.into());
    }
    fs::rename(&scratch, &paths.config_file)?;
    info!("applied FRR config to {}", paths.config_file);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NeighborConfig, RouterConfig};
    use ipfamily::IpFamily;

    fn test_paths(name: &str, reload_script: &str) -> FrrPaths {
        let dir = format!("testdata/apply/{name}");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        FrrPaths {
            config_file: format!("{dir}/frr.conf"),
            reload_bin: format!("testdata/reload/{reload_script}"),
        }
    }

    fn sample_config(asn: u32) -> Config {
        Config {
            hostname: "dummyhostname".to_string(),
            routers: vec![RouterConfig {
                my_asn: asn,
                neighbors: vec![NeighborConfig {
                    name: "65001@192.168.1.2".to_string(),
                    ip_family: IpFamily::Ipv4,
                    asn: 65001,
                    addr: "192.168.1.2".to_string(),
                    port: Some(4567),
                    ..NeighborConfig::default()
                }],
                ..RouterConfig::default()
            }],
            bfd_profiles: vec![],
        }
    }

    fn reload_count(paths: &FrrPaths) -> usize {
        let dir = std::path::Path::new(&paths.config_file).parent().unwrap();
        fs::read_to_string(dir.join("reload-count"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn applies_and_promotes_scratch() {
        let paths = test_paths("applies_and_promotes_scratch", "pass.sh");
        let (applier, worker) = ConfigApplier::new(paths.clone());
        tokio::spawn(worker.run());

        let outcome = applier.apply(sample_config(65000)).await.unwrap();
        assert!(outcome.is_ok(), "unexpected error: {:?}", outcome.error);
        assert!(outcome.changed);
        let written = fs::read_to_string(&paths.config_file).unwrap();
        assert_eq!(written, render_config(&sample_config(65000)));
        assert!(!std::path::Path::new(&format!("{}.new", paths.config_file)).exists());
    }

    #[tokio::test]
    async fn identical_config_is_not_reapplied() {
        let paths = test_paths("identical_config_is_not_reapplied", "count.sh");
        let (applier, worker) = ConfigApplier::new(paths.clone());
        tokio::spawn(worker.run());

        let first = applier.apply(sample_config(65000)).await.unwrap();
        assert!(first.changed);
        // --test and --reload each log one invocation
        assert_eq!(reload_count(&paths), 2);

        let second = applier.apply(sample_config(65000)).await.unwrap();
        assert!(!second.changed);
        assert_eq!(reload_count(&paths), 2);

        let third = applier.apply(sample_config(65100)).await.unwrap();
        assert!(third.changed);
        assert_eq!(reload_count(&paths), 4);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_config() {
        let paths = test_paths("failed_reload_keeps_previous_config", "pass.sh");
        let (applier, worker) = ConfigApplier::new(paths.clone());
        tokio::spawn(worker.run());

        applier.apply(sample_config(65000)).await.unwrap();
        let before = fs::read_to_string(&paths.config_file).unwrap();

        let failing = FrrPaths {
            reload_bin: "testdata/reload/fail-errcode.sh".to_string(),
            ..paths.clone()
        };
        let (applier, worker) = ConfigApplier::new(failing.clone());
        tokio::spawn(worker.run());
        let outcome = applier.apply(sample_config(65100)).await.unwrap();
        assert!(!outcome.is_ok());
        assert_eq!(fs::read_to_string(&paths.config_file).unwrap(), before);
        assert!(!std::path::Path::new(&format!("{}.new", paths.config_file)).exists());
    }
}
