//! Shared test doubles: a scripted cluster client, a counting event
//! recorder, and a checkpoint store wrapper with injectable behavior.

use async_trait::async_trait;
use confsync::checkpoint::store::{CheckpointStore, SledCheckpointStore};
use confsync::checkpoint::{Checkpoint, ConfigSource};
use confsync::config::NodeConfig;
use confsync::error::{ClusterError, StoreError};
use confsync::cluster::{ClusterClient, EventRecorder, NodeEvent};
use confsync::status::Condition;
use confsync::types::Timestamp;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Open a fresh sled-backed store under the given temp dir.
pub fn open_store(temp: &TempDir) -> Arc<SledCheckpointStore> {
    Arc::new(SledCheckpointStore::new(&temp.path().join("checkpoints")).unwrap())
}

/// A config that passes validation and is distinguishable from the default.
pub fn remote_config() -> NodeConfig {
    NodeConfig {
        trial_duration_secs: 600,
        max_parallel_ops: 8,
        ..NodeConfig::default()
    }
}

/// Seed a valid checkpoint for `uid` and return its source record.
pub fn seed_checkpoint(
    store: &dyn CheckpointStore,
    uid: &str,
    config: &NodeConfig,
) -> ConfigSource {
    let checkpoint = Checkpoint::encode(uid, config).unwrap();
    store.save(&checkpoint).unwrap();
    ConfigSource::new("node-config", uid)
}

/// Seed a checkpoint for `uid` whose payload does not parse.
pub fn seed_garbled_checkpoint(store: &dyn CheckpointStore, uid: &str) -> ConfigSource {
    let checkpoint = Checkpoint::from_bytes(uid, b"{not json".to_vec());
    store.save(&checkpoint).unwrap();
    ConfigSource::new("node-config", uid)
}

/// Scripted control-plane client.
#[derive(Default)]
pub struct MockClusterClient {
    pub assignment: Mutex<Option<ConfigSource>>,
    pub payloads: Mutex<HashMap<String, Vec<u8>>>,
    pub published: Mutex<Vec<Condition>>,
    pub fail_publish: AtomicBool,
    pub fail_assignment: AtomicBool,
    pub downloads: AtomicUsize,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_assignment(&self, source: Option<ConfigSource>) {
        *self.assignment.lock() = source;
    }

    pub fn add_payload(&self, uid: &str, config: &NodeConfig) {
        self.payloads
            .lock()
            .insert(uid.to_string(), serde_json::to_vec(config).unwrap());
    }

    pub fn add_raw_payload(&self, uid: &str, payload: &[u8]) {
        self.payloads.lock().insert(uid.to_string(), payload.to_vec());
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn publish_condition(
        &self,
        _node_name: &str,
        condition: &Condition,
    ) -> Result<(), ClusterError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ClusterError::Request("publish refused".to_string()));
        }
        self.published.lock().push(condition.clone());
        Ok(())
    }

    async fn node_assignment(
        &self,
        _node_name: &str,
    ) -> Result<Option<ConfigSource>, ClusterError> {
        if self.fail_assignment.load(Ordering::SeqCst) {
            return Err(ClusterError::Request("assignment refused".to_string()));
        }
        Ok(self.assignment.lock().clone())
    }

    async fn download(&self, source: &ConfigSource) -> Result<Checkpoint, ClusterError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match self.payloads.lock().get(&source.uid) {
            Some(payload) => Ok(Checkpoint::from_bytes(source.uid.clone(), payload.clone())),
            None => Err(ClusterError::Status(404)),
        }
    }

    async fn next_event(&self, _node_name: &str) -> Result<NodeEvent, ClusterError> {
        std::future::pending().await
    }
}

/// Event recorder that counts invocations.
#[derive(Default)]
pub struct CountingRecorder {
    pub events: Mutex<Vec<(String, String)>>,
}

impl CountingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventRecorder for CountingRecorder {
    fn event(&self, _node_name: &str, reason: &str, message: &str) {
        self.events
            .lock()
            .push((reason.to_string(), message.to_string()));
    }
}

/// Store wrapper that can backdate `current_modified` and inject
/// last-known-good write failures.
pub struct OverrideStore {
    pub inner: Arc<dyn CheckpointStore>,
    pub modified_override: Mutex<Option<Timestamp>>,
    pub fail_set_last_known_good: AtomicBool,
}

impl OverrideStore {
    pub fn new(inner: Arc<dyn CheckpointStore>) -> Self {
        Self {
            inner,
            modified_override: Mutex::new(None),
            fail_set_last_known_good: AtomicBool::new(false),
        }
    }

    pub fn backdate(&self, modified: Timestamp) {
        *self.modified_override.lock() = Some(modified);
    }
}

impl CheckpointStore for OverrideStore {
    fn initialize(&self) -> Result<(), StoreError> {
        self.inner.initialize()
    }

    fn current(&self) -> Result<Option<ConfigSource>, StoreError> {
        self.inner.current()
    }

    fn current_modified(&self) -> Result<Timestamp, StoreError> {
        if let Some(modified) = *self.modified_override.lock() {
            return Ok(modified);
        }
        self.inner.current_modified()
    }

    fn set_current(&self, source: Option<ConfigSource>) -> Result<(), StoreError> {
        self.inner.set_current(source)
    }

    fn last_known_good(&self) -> Result<Option<ConfigSource>, StoreError> {
        self.inner.last_known_good()
    }

    fn set_last_known_good(&self, source: Option<ConfigSource>) -> Result<(), StoreError> {
        if self.fail_set_last_known_good.load(Ordering::SeqCst) {
            return Err(StoreError::Uninitialized("injected failure".to_string()));
        }
        self.inner.set_last_known_good(source)
    }

    fn contains(&self, uid: &str) -> Result<bool, StoreError> {
        self.inner.contains(uid)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.inner.save(checkpoint)
    }

    fn load(&self, uid: &str) -> Result<Checkpoint, StoreError> {
        self.inner.load(uid)
    }
}
