// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use kube::api::PostParams;
use kube::{Api, Client};

use tracing::debug;

use crate::crd::{FRRNodeState, FRRNodeStateStatus};

#[derive(Debug, thiserror::Error)]
pub enum ReplaceStatusError {
    #[error("Client error: {0}")]
    ClientError(#[from] kube::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Max conflict retries exceeded")]
    MaxConflictRetriesExceeded,
}

const NUM_CONFLICT_RETRIES: usize = 3;

/// Replace the status of this node's `FRRNodeState` object, retrying a
/// bounded number of times on resource-version conflicts.
///
/// # Errors
/// Returns an error if the replace request fails.
pub async fn replace_node_state_status(
    client: Client,
    node_name: &str,
    status: &FRRNodeStateStatus,
) -> Result<(), ReplaceStatusError> {
    let api: Api<FRRNodeState> = Api::all(client);

    for attempt_num in 0..NUM_CONFLICT_RETRIES {
        let mut status_obj = api.get_status(node_name).await?;
        status_obj.status = Some(status.clone());

        match api
            .replace_status(
                node_name,
                &PostParams::default(),
                serde_json::to_vec(&status_obj)?,
            )
            .await
        {
            Ok(_) => break,
            Err(kube::Error::Api(api_error)) => {
                if api_error.code == 409 {
                    if attempt_num < NUM_CONFLICT_RETRIES - 1 {
                        debug!("conflict replacing FRRNodeState status, retrying");
                        continue;
                    }
                    return Err(ReplaceStatusError::MaxConflictRetriesExceeded);
                }
                return Err(kube::Error::Api(api_error).into());
            }
            Err(e) => {
                return Err(e.into());
            }
        }
    }
    Ok(())
}
