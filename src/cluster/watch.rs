//! Node Watch Loop
//!
//! Subscribes to node-scoped change events from the control plane and invokes
//! the registered callbacks on add, update, and delete.

use super::{ClusterClient, NodeEvent, NodeEventKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const EVENT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Callback invoked with each change event.
pub type EventCallback = Box<dyn Fn(&NodeEvent) + Send + Sync>;

/// Subscription to node-scoped change events.
///
/// Constructed with a client handle, the node identity, and one callback per
/// event kind; `run` drives the subscription until the stop signal fires.
pub struct NodeWatcher {
    client: Arc<dyn ClusterClient>,
    node_name: String,
    on_add: EventCallback,
    on_update: EventCallback,
    on_delete: EventCallback,
}

impl NodeWatcher {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        node_name: impl Into<String>,
        on_add: EventCallback,
        on_update: EventCallback,
        on_delete: EventCallback,
    ) -> Self {
        Self {
            client,
            node_name: node_name.into(),
            on_add,
            on_update,
            on_delete,
        }
    }

    /// Run the watch loop until `stop` flips to true or its sender is
    /// dropped. Event fetch failures are logged and retried after a backoff.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!(node = %self.node_name, "node watch loop stopping");
                        return;
                    }
                }
                event = self.client.next_event(&self.node_name) => match event {
                    Ok(event) => self.dispatch(&event),
                    Err(err) => {
                        warn!(node = %self.node_name, error = %err, "node watch failed, backing off");
                        tokio::time::sleep(EVENT_RETRY_BACKOFF).await;
                    }
                }
            }
        }
    }

    fn dispatch(&self, event: &NodeEvent) {
        match event.kind {
            NodeEventKind::Added => (self.on_add)(event),
            NodeEventKind::Modified => (self.on_update)(event),
            NodeEventKind::Deleted => (self.on_delete)(event),
        }
    }
}
