//! Bootstrap fallback-chain scenarios.

use crate::support::*;
use chrono::{Duration, Utc};
use confsync::checkpoint::store::CheckpointStore;
use confsync::checkpoint::ConfigSource;
use confsync::config::NodeConfig;
use confsync::controller::Controller;
use confsync::error::ControllerError;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn invalid_local_config_aborts_bootstrap() {
    let bad_default = NodeConfig {
        sync_period_secs: 0,
        ..NodeConfig::default()
    };
    let controller = Controller::local_only(bad_default, None);
    match controller.bootstrap() {
        Err(ControllerError::Validation(msg)) => assert!(msg.contains("sync_period_secs")),
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
    // no condition is published for a deployment-level misconfiguration
    assert!(controller.condition().is_none());
}

#[test]
fn dynamic_disabled_returns_local_with_positive_condition() {
    let controller = Controller::local_only(NodeConfig::default(), None);
    let config = controller.bootstrap().unwrap();
    assert_eq!(config, NodeConfig::default());

    let condition = controller.condition().unwrap();
    assert!(condition.ok);
    assert_eq!(condition.reason, "dynamic-config-disabled");
}

#[test]
fn absent_current_pointer_resolves_local() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());

    let config = controller.bootstrap().unwrap();
    assert_eq!(config, NodeConfig::default());

    let condition = controller.condition().unwrap();
    assert!(condition.ok);
    assert_eq!(condition.reason, "local-ok");
    assert_eq!(condition.message, "using local config");
}

#[test]
fn valid_assigned_config_is_returned() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();
    let remote = remote_config();
    let source = seed_checkpoint(store.as_ref(), "v2", &remote);
    store.set_current(Some(source)).unwrap();

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let config = controller.bootstrap().unwrap();
    assert_eq!(config, remote);

    let condition = controller.condition().unwrap();
    assert!(condition.ok);
    assert_eq!(condition.reason, "remote-ok:v2");
    assert_eq!(condition.message, "using current config: v2");
}

#[test]
fn fresh_assignment_stays_in_trial() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();
    let source = seed_checkpoint(store.as_ref(), "v2", &remote_config());
    // set_current stamps the modification time to now, so the trial is open
    store.set_current(Some(source)).unwrap();

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    controller.bootstrap().unwrap();

    assert_eq!(store.last_known_good().unwrap(), None);
}

#[test]
fn assignment_past_trial_graduates_to_last_known_good() {
    let temp = TempDir::new().unwrap();
    let sled = open_store(&temp);
    sled.initialize().unwrap();
    // trial duration is 10 minutes; the pointer is an hour old
    let source = seed_checkpoint(sled.as_ref(), "v2", &remote_config());
    sled.set_current(Some(source.clone())).unwrap();
    let store = Arc::new(OverrideStore::new(sled));
    store.backdate(Utc::now() - Duration::hours(1));

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let config = controller.bootstrap().unwrap();
    assert_eq!(config, remote_config());

    let condition = controller.condition().unwrap();
    assert!(condition.ok);
    assert_eq!(condition.reason, "remote-ok:v2");
    assert_eq!(store.last_known_good().unwrap(), Some(source));
}

#[test]
fn graduation_failure_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    let sled = open_store(&temp);
    sled.initialize().unwrap();
    let source = seed_checkpoint(sled.as_ref(), "v2", &remote_config());
    sled.set_current(Some(source)).unwrap();
    let store = Arc::new(OverrideStore::new(sled));
    store.backdate(Utc::now() - Duration::hours(1));
    store
        .fail_set_last_known_good
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let config = controller.bootstrap().unwrap();
    assert_eq!(config, remote_config());
    assert_eq!(store.last_known_good().unwrap(), None);
}

#[test]
fn unparseable_assigned_config_falls_back_to_local_lkg() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();
    let source = seed_garbled_checkpoint(store.as_ref(), "v2");
    store.set_current(Some(source)).unwrap();

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let config = controller.bootstrap().unwrap();
    // last-known-good is absent, so the rollback target is the local config
    assert_eq!(config, NodeConfig::default());

    let condition = controller.condition().unwrap();
    assert!(!condition.ok);
    assert_eq!(condition.reason, "parse-failed:v2");
    assert_eq!(
        condition.message,
        "rolled back to last-known-good: local config"
    );
}

#[test]
fn invalid_assigned_config_falls_back_to_remote_lkg() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();

    // "bad" parses but fails validation; "v1" is the trusted fallback
    let invalid = NodeConfig {
        max_parallel_ops: 0,
        ..NodeConfig::default()
    };
    let bad = seed_checkpoint(store.as_ref(), "bad", &invalid);
    let v1_config = remote_config();
    let v1 = seed_checkpoint(store.as_ref(), "v1", &v1_config);
    store.set_current(Some(bad)).unwrap();
    store.set_last_known_good(Some(v1)).unwrap();

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let config = controller.bootstrap().unwrap();
    assert_eq!(config, v1_config);

    let condition = controller.condition().unwrap();
    assert!(!condition.ok);
    // the condition carries the original failure, not a fresh lkg reason
    assert_eq!(condition.reason, "validate-failed:bad");
    assert_eq!(condition.message, "rolled back to last-known-good: v1");
}

#[test]
fn failing_last_known_good_aborts_bootstrap() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();
    let bad = seed_garbled_checkpoint(store.as_ref(), "bad");
    store.set_current(Some(bad)).unwrap();
    // last-known-good points at a checkpoint that was never stored
    store
        .set_last_known_good(Some(ConfigSource::new("node-config", "gone")))
        .unwrap();

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    match controller.bootstrap() {
        Err(ControllerError::LastKnownGood { reason, .. }) => {
            assert_eq!(reason, "load-failed:gone");
        }
        other => panic!("expected last-known-good failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn resolver_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.initialize().unwrap();
    let remote = remote_config();
    let source = seed_checkpoint(store.as_ref(), "v5", &remote);

    let controller = Controller::with_store(NodeConfig::default(), None, store.clone());
    let local = NodeConfig::default();

    let first = controller
        .resolve_source(store.as_ref(), Some(source.clone()), &local)
        .unwrap();
    let second = controller
        .resolve_source(store.as_ref(), Some(source.clone()), &local)
        .unwrap();
    assert_eq!(first.config, second.config);
    assert_eq!(first.reason, second.reason);
    assert_eq!(first.source, second.source);
    assert_eq!(first.reason, "remote-ok:v5");

    // failures are just as repeatable
    let gone = Some(ConfigSource::new("node-config", "gone"));
    let first = controller
        .resolve_source(store.as_ref(), gone.clone(), &local)
        .unwrap_err();
    let second = controller
        .resolve_source(store.as_ref(), gone, &local)
        .unwrap_err();
    assert_eq!(first.reason, second.reason);
    assert_eq!(first.reason, "load-failed:gone");
}

#[test]
fn store_initialize_failure_is_fatal() {
    let store = Arc::new(FailingInitStore);
    let controller = Controller::with_store(NodeConfig::default(), None, store);
    assert!(matches!(
        controller.bootstrap(),
        Err(ControllerError::Store(_))
    ));
}

struct FailingInitStore;

impl CheckpointStore for FailingInitStore {
    fn initialize(&self) -> Result<(), confsync::error::StoreError> {
        Err(confsync::error::StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }

    fn current(&self) -> Result<Option<ConfigSource>, confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn current_modified(
        &self,
    ) -> Result<confsync::types::Timestamp, confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn set_current(
        &self,
        _source: Option<ConfigSource>,
    ) -> Result<(), confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn last_known_good(&self) -> Result<Option<ConfigSource>, confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn set_last_known_good(
        &self,
        _source: Option<ConfigSource>,
    ) -> Result<(), confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn contains(&self, _uid: &str) -> Result<bool, confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn save(
        &self,
        _checkpoint: &confsync::checkpoint::Checkpoint,
    ) -> Result<(), confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }

    fn load(
        &self,
        _uid: &str,
    ) -> Result<confsync::checkpoint::Checkpoint, confsync::error::StoreError> {
        unreachable!("bootstrap must stop at initialize")
    }
}

#[test]
fn config_file_override_is_used() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("node.toml");
    std::fs::write(&path, "max_parallel_ops = 16\n").unwrap();

    let controller = Controller::local_only(
        NodeConfig::default(),
        Some(confsync::config::FsLoader::new(&path)),
    );
    let config = controller.bootstrap().unwrap();
    assert_eq!(config.max_parallel_ops, 16);
}

#[test]
fn invalid_config_file_aborts_bootstrap() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("node.toml");
    std::fs::write(&path, "log_level = \"loud\"\n").unwrap();

    let controller = Controller::local_only(
        NodeConfig::default(),
        Some(confsync::config::FsLoader::new(&path)),
    );
    assert!(matches!(
        controller.bootstrap(),
        Err(ControllerError::Validation(_))
    ));
}
