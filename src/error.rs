//! Error types for configuration resolution, checkpoint storage, and sync.

use crate::types::ConfigUid;
use thiserror::Error;

/// Errors raised by the checkpoint store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store database error: {0}")]
    Database(#[from] sled::Error),

    /// Pointer records are written by `initialize`; reading them before that
    /// is a precondition failure.
    #[error("checkpoint store used before initialization: missing pointer record '{0}'")]
    Uninitialized(String),

    #[error("corrupt pointer record '{name}': {detail}")]
    CorruptPointer { name: String, detail: String },

    #[error("no checkpoint stored for uid {0}")]
    MissingCheckpoint(ConfigUid),

    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failure to parse a persisted checkpoint back into a configuration.
///
/// Distinct from validation failure: a checkpoint can deserialize cleanly and
/// still describe an invalid configuration.
#[derive(Debug, Error)]
#[error("checkpoint {uid} failed to parse: {source}")]
pub struct CheckpointError {
    pub uid: ConfigUid,
    #[source]
    pub source: serde_json::Error,
}

/// Errors from the control-plane client.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("control plane request failed: {0}")]
    Request(String),

    #[error("control plane returned unexpected status {0}")]
    Status(u16),

    #[error("malformed control plane response: {0}")]
    Decode(String),
}

/// Top-level controller errors.
///
/// Only fatal-at-startup conditions reach a `bootstrap` caller: an invalid
/// local configuration, a store that cannot initialize, or a last-known-good
/// configuration that fails to resolve. Everything else is absorbed and
/// surfaced through the published condition and logs.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("configuration failed validation: {0}")]
    Validation(String),

    #[error("failed to load local config file: {0}")]
    LocalConfig(#[from] ::config::ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// The assigned config failed and the last-known-good fallback failed
    /// too; there is no configuration the agent can safely trust.
    #[error("last-known-good config failed to resolve ({reason}): {message}")]
    LastKnownGood { reason: String, message: String },

    #[error("logging setup error: {0}")]
    Logging(String),
}
