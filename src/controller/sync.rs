//! Sync Loops
//!
//! Three independently scheduled loops started after Bootstrap: the condition
//! publisher, the node watcher, and the assigned-config sync. The loops share
//! no state beyond the pending-change signal and the checkpoint store.

use super::Controller;
use crate::checkpoint::store::CheckpointStore;
use crate::cluster::watch::EventCallback;
use crate::cluster::{ClusterClient, EventRecorder, NodeEvent, NodeEventKind, NodeWatcher};
use crate::concurrency::{jitter_until, spawn_supervised};
use crate::config::validate_node_config;
use crate::error::ControllerError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const SYNC_LOOP_PERIOD: Duration = Duration::from_secs(10);
const SYNC_LOOP_JITTER: f64 = 0.2;

impl Controller {
    /// Launch the sync loops.
    ///
    /// A no-op when `client` is absent; logs and returns when `node_name` is
    /// empty. The condition publisher always starts; the watcher and the
    /// assigned-config sync start only when dynamic config is enabled.
    pub fn start_sync(
        self: Arc<Self>,
        client: Option<Arc<dyn ClusterClient>>,
        events: Arc<dyn EventRecorder>,
        node_name: &str,
    ) {
        let Some(client) = client else {
            info!("no control plane client, will not start sync loops");
            return;
        };
        if node_name.is_empty() {
            error!("cannot start sync loops with empty node name");
            return;
        }
        let node_name = node_name.to_string();

        {
            let controller = Arc::clone(&self);
            let client = Arc::clone(&client);
            let node = node_name.clone();
            spawn_supervised("condition-sync", async move {
                info!("starting condition sync loop");
                jitter_until(SYNC_LOOP_PERIOD, SYNC_LOOP_JITTER, true, move || {
                    let controller = Arc::clone(&controller);
                    let client = Arc::clone(&client);
                    let node = node.clone();
                    async move {
                        if let Err(err) = controller.config_ok.sync(client.as_ref(), &node).await {
                            warn!(error = %err, "failed to publish config condition");
                        }
                    }
                })
                .await;
            });
        }

        if self.dynamic_config() {
            let watcher = NodeWatcher::new(
                Arc::clone(&client),
                node_name.clone(),
                watch_callback(&self),
                watch_callback(&self),
                watch_callback(&self),
            );
            let (stop_tx, stop_rx) = watch::channel(false);
            *self.watch_stop.lock() = Some(stop_tx);
            spawn_supervised("node-watch", async move {
                info!("starting node watch loop");
                watcher.run(stop_rx).await;
            });

            let controller = Arc::clone(&self);
            spawn_supervised("config-source-sync", async move {
                info!("starting config source sync loop");
                jitter_until(SYNC_LOOP_PERIOD, SYNC_LOOP_JITTER, true, move || {
                    let controller = Arc::clone(&controller);
                    let client = Arc::clone(&client);
                    let events = Arc::clone(&events);
                    let node = node_name.clone();
                    async move {
                        controller
                            .sync_config_source(client.as_ref(), events.as_ref(), &node)
                            .await;
                    }
                })
                .await;
            });
        } else {
            info!("dynamic config not enabled, will not sync to remote config");
        }
    }

    /// Watch callback: raise the pending-change signal when the node's
    /// desired assignment differs from the store's `current` pointer.
    pub fn pending_if_changed(&self, event: &NodeEvent) {
        let Some(store) = self.checkpoint_store.as_deref() else {
            return;
        };

        // a deleted node has no assignment left; treat it as a rollback to
        // local so the next sync tick reconciles
        let desired = match event.kind {
            NodeEventKind::Deleted => None,
            NodeEventKind::Added | NodeEventKind::Modified => event.assignment.clone(),
        };

        let current = match store.current() {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "failed to read current config source, scheduling sync");
                self.pending_source.raise();
                return;
            }
        };

        if desired != current {
            if self.pending_source.raise() {
                info!("assigned config source changed on node, scheduling sync");
            } else {
                debug!("assigned config source changed on node, sync already pending");
            }
        }
    }

    /// One iteration of the assigned-config sync loop: consume the pending
    /// signal and, if raised, reconcile `current` with the node's desired
    /// assignment. Transient failure re-raises the signal so the next tick
    /// retries.
    pub async fn sync_config_source(
        &self,
        client: &dyn ClusterClient,
        events: &dyn EventRecorder,
        node_name: &str,
    ) {
        if !self.pending_source.consume() {
            return;
        }
        let Some(store) = self.checkpoint_store.as_deref() else {
            return;
        };
        if let Err(err) = self.sync_once(store, client, events, node_name).await {
            warn!(error = %err, "failed to sync assigned config source, will retry");
            self.pending_source.raise();
        }
    }

    async fn sync_once(
        &self,
        store: &dyn CheckpointStore,
        client: &dyn ClusterClient,
        events: &dyn EventRecorder,
        node_name: &str,
    ) -> Result<(), ControllerError> {
        let desired = client.node_assignment(node_name).await?;
        let current = store.current()?;
        if desired == current {
            debug!("assigned config source is up to date");
            return Ok(());
        }

        // download, verify, and checkpoint before moving the pointer; a bad
        // download must not dislodge the running assignment
        if let Some(source) = &desired {
            let checkpoint = client.download(source).await?;
            let config = checkpoint.parse()?;
            validate_node_config(&config).map_err(ControllerError::Validation)?;
            store.save(&checkpoint)?;
        }
        store.set_current(desired.clone())?;

        let uid = desired
            .as_ref()
            .map(|source| source.uid.as_str())
            .unwrap_or("local");
        events.event(
            node_name,
            "ConfigChanged",
            &format!("assigned config changed to {}, restarting to apply", uid),
        );
        info!(uid, "assigned config source changed, restarting to apply");
        (self.restart)();
        Ok(())
    }
}

fn watch_callback(controller: &Arc<Controller>) -> EventCallback {
    let controller = Arc::clone(controller);
    Box::new(move |event: &NodeEvent| controller.pending_if_changed(event))
}
