//! Control-Plane Interfaces
//!
//! Contracts for the pieces of the control plane the controller talks to:
//! condition publishing, node assignment lookup, checkpoint download, and the
//! node-scoped change-event watch.

pub mod http;
pub mod watch;

use crate::checkpoint::{Checkpoint, ConfigSource};
use crate::error::ClusterError;
use crate::status::Condition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use http::HttpClusterClient;
pub use watch::NodeWatcher;

/// Kind of node-scoped change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEventKind {
    Added,
    Modified,
    Deleted,
}

/// A node-scoped change event from the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub kind: NodeEventKind,
    /// Desired config assignment carried on the node record, if any
    #[serde(default)]
    pub assignment: Option<ConfigSource>,
}

/// Client for the cluster control plane.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Publish the node's config health condition.
    async fn publish_condition(
        &self,
        node_name: &str,
        condition: &Condition,
    ) -> Result<(), ClusterError>;

    /// Fetch the node's desired config assignment.
    async fn node_assignment(&self, node_name: &str)
        -> Result<Option<ConfigSource>, ClusterError>;

    /// Download the checkpoint payload for an assigned source.
    async fn download(&self, source: &ConfigSource) -> Result<Checkpoint, ClusterError>;

    /// Wait for the next node-scoped change event (long poll).
    async fn next_event(&self, node_name: &str) -> Result<NodeEvent, ClusterError>;
}

/// Best-effort structured event recording.
pub trait EventRecorder: Send + Sync {
    fn event(&self, node_name: &str, reason: &str, message: &str);
}

/// Recorder that writes events to the log only.
pub struct LogEventRecorder;

impl EventRecorder for LogEventRecorder {
    fn event(&self, node_name: &str, reason: &str, message: &str) {
        info!(node = node_name, reason, message, "node event");
    }
}
