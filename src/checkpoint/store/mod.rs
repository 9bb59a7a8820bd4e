//! Checkpoint Store
//!
//! Persistent, UID-addressed storage for configuration checkpoints plus the
//! two named pointers, `current` and `last-known-good`.

pub mod persistence;

use super::{Checkpoint, ConfigSource};
use crate::error::StoreError;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

pub use persistence::SledCheckpointStore;

/// Name of the pointer to the currently assigned configuration source.
pub(crate) const CURRENT_POINTER: &str = "current";

/// Name of the pointer to the last configuration that survived its trial.
pub(crate) const LAST_KNOWN_GOOD_POINTER: &str = "last-known-good";

/// Pointer record: a source-or-absent marker plus its modification timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerRecord {
    pub source: Option<ConfigSource>,
    pub modified: Timestamp,
}

/// Checkpoint store interface.
///
/// Pointer writes are atomic at the storage layer: a read concurrent with a
/// committing write observes either the old or the new record, never a torn
/// one. Callers stay stateless with respect to the pointers; no cached copies
/// across calls.
pub trait CheckpointStore: Send + Sync {
    /// Prepare the backing storage. Must be called before any pointer access;
    /// uninitialized access fails with [`StoreError::Uninitialized`].
    fn initialize(&self) -> Result<(), StoreError>;

    /// The currently assigned configuration source, if any.
    fn current(&self) -> Result<Option<ConfigSource>, StoreError>;

    /// Last modification time of the `current` pointer.
    ///
    /// Changes only when `current` is reassigned to a different value; this
    /// is what the trial-period computation keys off.
    fn current_modified(&self) -> Result<Timestamp, StoreError>;

    /// Reassign the `current` pointer.
    fn set_current(&self, source: Option<ConfigSource>) -> Result<(), StoreError>;

    /// The last-known-good configuration source, if any.
    fn last_known_good(&self) -> Result<Option<ConfigSource>, StoreError>;

    /// Reassign the `last-known-good` pointer.
    fn set_last_known_good(&self, source: Option<ConfigSource>) -> Result<(), StoreError>;

    /// Whether a checkpoint is stored for the given UID.
    fn contains(&self, uid: &str) -> Result<bool, StoreError>;

    /// Persist a checkpoint blob under its UID.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError>;

    /// Load the checkpoint blob for a UID.
    fn load(&self, uid: &str) -> Result<Checkpoint, StoreError>;
}
