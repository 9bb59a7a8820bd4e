//! Sled-backed checkpoint store.
//!
//! One tree holds checkpoint blobs keyed by UID; a second tree holds the two
//! pointer records. Sled gives single-key atomic writes, which is exactly the
//! consistency the pointer contract requires.

use super::{CheckpointStore, PointerRecord, CURRENT_POINTER, LAST_KNOWN_GOOD_POINTER};
use crate::checkpoint::{Checkpoint, ConfigSource};
use crate::error::StoreError;
use crate::types::Timestamp;
use chrono::Utc;
use std::path::Path;

const CHECKPOINTS_TREE: &str = "checkpoints";
const POINTERS_TREE: &str = "pointers";

/// Sled-backed implementation of [`CheckpointStore`].
pub struct SledCheckpointStore {
    db: sled::Db,
    checkpoints: sled::Tree,
    pointers: sled::Tree,
}

impl SledCheckpointStore {
    /// Open (or create) the store at the given directory.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Build a store on an already-open sled database.
    pub fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let checkpoints = db.open_tree(CHECKPOINTS_TREE)?;
        let pointers = db.open_tree(POINTERS_TREE)?;
        Ok(Self {
            db,
            checkpoints,
            pointers,
        })
    }

    fn read_pointer(&self, name: &str) -> Result<PointerRecord, StoreError> {
        let raw = self
            .pointers
            .get(name)?
            .ok_or_else(|| StoreError::Uninitialized(name.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::CorruptPointer {
            name: name.to_string(),
            detail: e.to_string(),
        })
    }

    fn write_pointer(&self, name: &str, record: &PointerRecord) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(record).map_err(StoreError::Encode)?;
        self.pointers.insert(name, raw)?;
        self.pointers.flush()?;
        Ok(())
    }
}

impl CheckpointStore for SledCheckpointStore {
    fn initialize(&self) -> Result<(), StoreError> {
        // idempotent: existing pointer records are left untouched
        for name in [CURRENT_POINTER, LAST_KNOWN_GOOD_POINTER] {
            if self.pointers.get(name)?.is_none() {
                self.write_pointer(
                    name,
                    &PointerRecord {
                        source: None,
                        modified: Utc::now(),
                    },
                )?;
            }
        }
        self.db.flush()?;
        Ok(())
    }

    fn current(&self) -> Result<Option<ConfigSource>, StoreError> {
        Ok(self.read_pointer(CURRENT_POINTER)?.source)
    }

    fn current_modified(&self) -> Result<Timestamp, StoreError> {
        Ok(self.read_pointer(CURRENT_POINTER)?.modified)
    }

    fn set_current(&self, source: Option<ConfigSource>) -> Result<(), StoreError> {
        let prev = self.read_pointer(CURRENT_POINTER)?;
        // the modification timestamp moves only on reassignment to a
        // different value; rewriting the same source keeps the trial clock
        let modified = if prev.source == source {
            prev.modified
        } else {
            Utc::now()
        };
        self.write_pointer(CURRENT_POINTER, &PointerRecord { source, modified })
    }

    fn last_known_good(&self) -> Result<Option<ConfigSource>, StoreError> {
        Ok(self.read_pointer(LAST_KNOWN_GOOD_POINTER)?.source)
    }

    fn set_last_known_good(&self, source: Option<ConfigSource>) -> Result<(), StoreError> {
        let modified = Utc::now();
        self.write_pointer(LAST_KNOWN_GOOD_POINTER, &PointerRecord { source, modified })
    }

    fn contains(&self, uid: &str) -> Result<bool, StoreError> {
        Ok(self.checkpoints.contains_key(uid)?)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.checkpoints
            .insert(checkpoint.uid(), checkpoint.payload())?;
        self.checkpoints.flush()?;
        Ok(())
    }

    fn load(&self, uid: &str) -> Result<Checkpoint, StoreError> {
        let raw = self
            .checkpoints
            .get(uid)?
            .ok_or_else(|| StoreError::MissingCheckpoint(uid.to_string()))?;
        Ok(Checkpoint::from_bytes(uid, raw.to_vec()))
    }
}
