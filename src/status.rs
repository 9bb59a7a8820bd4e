//! Config Health Condition
//!
//! Maintains the node's cluster-visible config condition in memory and pushes
//! it to the control plane on a periodic schedule. Reason codes are stable,
//! classifiable strings so operators can tell a malformed remote config from
//! an unreachable control plane from disk corruption.

use crate::cluster::ClusterClient;
use crate::error::ClusterError;
use crate::types::Timestamp;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Reason: the local configuration resolved as the assigned config.
pub const LOCAL_OKAY_REASON: &str = "local-ok";

/// Reason: dynamic config is disabled and the local config is in use.
pub const DYNAMIC_DISABLED_REASON: &str = "dynamic-config-disabled";

/// Reason: the remote checkpoint for `uid` resolved successfully.
pub fn remote_okay_reason(uid: &str) -> String {
    format!("remote-ok:{}", uid)
}

/// Reason: the checkpoint for `uid` could not be loaded from the store.
pub fn load_failed_reason(uid: &str) -> String {
    format!("load-failed:{}", uid)
}

/// Reason: the checkpoint for `uid` could not be parsed.
pub fn parse_failed_reason(uid: &str) -> String {
    format!("parse-failed:{}", uid)
}

/// Reason: the configuration in the checkpoint for `uid` failed validation.
pub fn validate_failed_reason(uid: &str) -> String {
    format!("validate-failed:{}", uid)
}

pub const LOCAL_MESSAGE: &str = "using local config";
pub const DYNAMIC_DISABLED_MESSAGE: &str = "using local config, dynamic config disabled";
pub const LKG_LOCAL_MESSAGE: &str = "rolled back to last-known-good: local config";

pub fn remote_message(uid: &str) -> String {
    format!("using current config: {}", uid)
}

pub fn lkg_remote_message(uid: &str) -> String {
    format!("rolled back to last-known-good: {}", uid)
}

/// Cluster-visible config health condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Whether the active configuration is the intended one
    pub ok: bool,
    /// Stable, classifiable reason code
    pub reason: String,
    /// Human-readable description of the active configuration source
    pub message: String,
    /// When the condition last changed in memory
    pub last_update: Timestamp,
}

/// Thread-safe, in-memory holder for the node's config condition.
///
/// `set` takes effect immediately; the condition reaches the control plane on
/// the next `sync` tick. A failed push is retried on the following tick.
pub struct ConfigOkCondition {
    state: RwLock<Option<Condition>>,
}

impl ConfigOkCondition {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Replace the in-memory condition.
    pub fn set(&self, message: impl Into<String>, reason: impl Into<String>, ok: bool) {
        let condition = Condition {
            ok,
            reason: reason.into(),
            message: message.into(),
            last_update: Utc::now(),
        };
        *self.state.write() = Some(condition);
    }

    /// Snapshot of the current condition, if one has been set.
    pub fn get(&self) -> Option<Condition> {
        self.state.read().clone()
    }

    /// Push the current condition to the control plane. A no-op until the
    /// first `set`.
    pub async fn sync(
        &self,
        client: &dyn ClusterClient,
        node_name: &str,
    ) -> Result<(), ClusterError> {
        let Some(condition) = self.get() else {
            return Ok(());
        };
        client.publish_condition(node_name, &condition).await
    }
}

impl Default for ConfigOkCondition {
    fn default() -> Self {
        Self::new()
    }
}
