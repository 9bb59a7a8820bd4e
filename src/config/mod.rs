//! Node Agent Configuration
//!
//! The configuration object under management: the agent's full set of runtime
//! knobs, with compiled-in defaults, optional file override, and validation.

pub mod loader;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use loader::FsLoader;
pub use validation::validate_node_config;

/// Full runtime configuration for a node agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// How often the agent reconciles with the control plane (seconds)
    #[serde(default = "default_sync_period_secs")]
    pub sync_period_secs: u64,

    /// How long a newly assigned config must run before it can be promoted
    /// to last-known-good (seconds)
    #[serde(default = "default_trial_duration_secs")]
    pub trial_duration_secs: u64,

    /// Node heartbeat period (seconds)
    #[serde(default = "default_heartbeat_period_secs")]
    pub heartbeat_period_secs: u64,

    /// Maximum number of operations the agent runs in parallel
    #[serde(default = "default_max_parallel_ops")]
    pub max_parallel_ops: u32,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Arbitrary node labels reported to the control plane
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_sync_period_secs() -> u64 {
    10
}

fn default_trial_duration_secs() -> u64 {
    600
}

fn default_heartbeat_period_secs() -> u64 {
    30
}

fn default_max_parallel_ops() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync_period_secs: default_sync_period_secs(),
            trial_duration_secs: default_trial_duration_secs(),
            heartbeat_period_secs: default_heartbeat_period_secs(),
            max_parallel_ops: default_max_parallel_ops(),
            log_level: default_log_level(),
            labels: HashMap::new(),
        }
    }
}

impl NodeConfig {
    /// Trial period this configuration must survive before promotion.
    pub fn trial_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.trial_duration_secs as i64)
    }

    /// Reconcile period as a std duration.
    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(self.sync_period_secs)
    }

    /// Heartbeat period as a std duration.
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_period_secs)
    }
}
