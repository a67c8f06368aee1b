// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime-state fetcher. Queries the local FRR instance through vtysh
//! and parses the JSON it returns into per-VRF neighbor and BFD records.

use std::collections::HashMap;
use std::process::{Command, Stdio};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to spawn {bin}: {err}")]
    Spawn { bin: String, err: std::io::Error },
    #[error("failed to wait for {bin}: {err}")]
    Wait { bin: String, err: std::io::Error },
    #[error("vtysh exited with status {status}: {stderr}")]
    NonZero { status: String, stderr: String },
    #[error("malformed vtysh output: {0}")]
    Json(#[from] serde_json::Error),
}

/// A BGP peer as FRR reports it. `id` is an address literal or an
/// interface name for unnumbered sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub id: String,
    pub bgp_state: String,
}

/// A BFD session as FRR reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BfdPeer {
    pub peer: String,
    pub status: String,
}

/// Read access to FRR's runtime neighbor and BFD tables, keyed by VRF.
/// FRR's `default` VRF key is renamed to the empty string.
pub trait StateReader {
    fn bgp_neighbors(&self) -> Result<HashMap<String, Vec<Neighbor>>, FetchError>;
    fn bfd_peers(&self) -> Result<HashMap<String, Vec<BfdPeer>>, FetchError>;
}

/// Renames FRR's `default` VRF key to the empty string used by the
/// canonical model. Idempotent.
#[must_use]
pub fn rename_default_vrf<T>(mut m: HashMap<String, Vec<T>>) -> HashMap<String, Vec<T>> {
    if let Some(v) = m.remove("default") {
        m.insert(String::new(), v);
    }
    m
}

/// [`StateReader`] backed by the vtysh binary.
pub struct VtyshReader {
    vtysh_bin: String,
}

const DEFAULT_VTYSH_BIN: &str = "vtysh";

impl Default for VtyshReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VtyshReader {
    #[must_use]
    pub fn new() -> Self {
        Self::with_bin(DEFAULT_VTYSH_BIN)
    }

    #[must_use]
    pub fn with_bin(bin: &str) -> Self {
        Self {
            vtysh_bin: bin.to_string(),
        }
    }

    fn run(&self, command: &str) -> Result<Vec<u8>, FetchError> {
        let output = Command::new(&self.vtysh_bin)
            .args(["-c", command])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| FetchError::Spawn {
                bin: self.vtysh_bin.clone(),
                err,
            })?
            .wait_with_output()
            .map_err(|err| FetchError::Wait {
                bin: self.vtysh_bin.clone(),
                err,
            })?;

        if !output.status.success() {
            return Err(FetchError::NonZero {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[derive(Deserialize)]
struct NeighborJson {
    #[serde(rename = "bgpState", default)]
    bgp_state: String,
}

#[derive(Deserialize)]
struct BfdPeerJson {
    peer: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    vrf: String,
}

impl StateReader for VtyshReader {
    fn bgp_neighbors(&self) -> Result<HashMap<String, Vec<Neighbor>>, FetchError> {
        let raw = self.run("show bgp vrf all neighbors json")?;
        let parsed: HashMap<String, HashMap<String, NeighborJson>> =
            serde_json::from_slice(&raw)?;

        let mut res = HashMap::new();
        for (vrf, neighbors) in parsed {
            let mut list: Vec<Neighbor> = neighbors
                .into_iter()
                .map(|(id, n)| Neighbor {
                    id,
                    bgp_state: n.bgp_state,
                })
                .collect();
            list.sort_by(|a, b| a.id.cmp(&b.id));
            res.insert(vrf, list);
        }
        Ok(rename_default_vrf(res))
    }

    fn bfd_peers(&self) -> Result<HashMap<String, Vec<BfdPeer>>, FetchError> {
        let raw = self.run("show bfd peers json")?;
        let parsed: Vec<BfdPeerJson> = serde_json::from_slice(&raw)?;

        let mut res: HashMap<String, Vec<BfdPeer>> = HashMap::new();
        for p in parsed {
            let vrf = if p.vrf.is_empty() {
                "default".to_string()
            } else {
                p.vrf
            };
            res.entry(vrf).or_default().push(BfdPeer {
                peer: p.peer,
                status: p.status,
            });
        }
        Ok(rename_default_vrf(res))
    }
}
