//! Configuration Checkpoints
//!
//! Source records identify one remotely assigned configuration version;
//! checkpoints are the persisted, parseable encodings of those versions.

pub mod store;

use crate::config::NodeConfig;
use crate::error::{CheckpointError, StoreError};
use crate::types::ConfigUid;
use serde::{Deserialize, Serialize};

/// Immutable reference to a specific remotely assigned configuration version.
///
/// Absence (`Option::None`) is the sentinel meaning "the local configuration
/// is authoritative", which is distinct from a record that fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Object name as known to the control plane
    pub name: String,
    /// Unique version identifier
    pub uid: ConfigUid,
}

impl ConfigSource {
    pub fn new(name: impl Into<String>, uid: impl Into<ConfigUid>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// A persisted encoding of one [`NodeConfig`], addressed by the UID of the
/// source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    uid: ConfigUid,
    payload: Vec<u8>,
}

impl Checkpoint {
    /// Encode a configuration into a checkpoint for the given UID.
    pub fn encode(uid: impl Into<ConfigUid>, config: &NodeConfig) -> Result<Self, StoreError> {
        let payload = serde_json::to_vec(config).map_err(StoreError::Encode)?;
        Ok(Self {
            uid: uid.into(),
            payload,
        })
    }

    /// Wrap a raw payload as downloaded or loaded from the store.
    pub fn from_bytes(uid: impl Into<ConfigUid>, payload: Vec<u8>) -> Self {
        Self {
            uid: uid.into(),
            payload,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Parse the payload back into a configuration.
    ///
    /// Parse failure is distinct from validation failure; callers validate
    /// the returned configuration separately.
    pub fn parse(&self) -> Result<NodeConfig, CheckpointError> {
        serde_json::from_slice(&self.payload).map_err(|source| CheckpointError {
            uid: self.uid.clone(),
            source,
        })
    }
}
