// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Watch-event plumbing shared by the controllers: every event collapses
//! into a unit work item on a capacity-one channel, so bursts coalesce
//! into a single follow-up reconcile.

use futures::StreamExt;
use kube::runtime::{WatchStreamExt, watcher};
use tokio::sync::mpsc;
use tracing::warn;

pub(crate) async fn forward_events<K, S>(stream: S, tx: mpsc::Sender<()>)
where
    K: kube::Resource + Clone + std::fmt::Debug + Send + 'static,
    S: futures::Stream<Item = Result<watcher::Event<K>, watcher::Error>> + Send + 'static,
{
    let mut stream = std::pin::pin!(stream.default_backoff());
    while let Some(event) = stream.next().await {
        match event {
            Ok(_) => {
                let _ = tx.try_send(());
            }
            Err(err) => warn!("watch error: {err}"),
        }
    }
}
