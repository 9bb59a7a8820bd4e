//! Dynamic Configuration Controller
//!
//! Owns the bootstrap fallback state machine that picks the configuration the
//! agent runs: local -> assigned (remote or local) -> last-known-good, with
//! trial-period promotion of the assigned config. Bootstrap is synchronous
//! and runs once at process start; the sync loops in [`sync`] keep the
//! checkpoint store and the published condition current afterwards.

pub mod sync;

use crate::checkpoint::store::{CheckpointStore, SledCheckpointStore};
use crate::checkpoint::ConfigSource;
use crate::concurrency::ChangeSignal;
use crate::config::{validate_node_config, FsLoader, NodeConfig};
use crate::error::{ControllerError, StoreError};
use crate::status::{self, ConfigOkCondition};
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

const CHECKPOINTS_DIR: &str = "checkpoints";

/// A successfully resolved configuration source.
#[derive(Debug)]
pub struct Resolved {
    pub config: NodeConfig,
    /// The source the config came from; absent means local
    pub source: Option<ConfigSource>,
    /// Stable reason code, e.g. `remote-ok:<uid>`
    pub reason: String,
}

/// A classified failure to resolve a configuration source.
#[derive(Debug)]
pub struct ResolveFailure {
    pub source: Option<ConfigSource>,
    /// Stable reason code naming the failed stage and UID
    pub reason: String,
    pub error: ControllerError,
}

type RestartHandler = Box<dyn Fn() + Send + Sync>;

/// Process-lifetime controller state.
///
/// Created once at startup; `bootstrap` resolves the configuration the agent
/// will run, and `start_sync` launches the loops that keep the store and the
/// published condition current.
pub struct Controller {
    default_config: NodeConfig,
    file_loader: Option<FsLoader>,
    /// Absent when dynamic config is disabled
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    config_ok: ConfigOkCondition,
    pending_source: ChangeSignal,
    /// Invoked after a new assignment is persisted, so Bootstrap re-runs
    restart: RestartHandler,
    /// Stop handle for the node watcher once started
    watch_stop: Mutex<Option<watch::Sender<bool>>>,
}

impl Controller {
    /// Construct a controller.
    ///
    /// `config_file` of `None` skips the file loader; `store_dir` of `None`
    /// disables dynamic config entirely (but the condition publisher still
    /// runs if a client is later supplied to `start_sync`).
    pub fn new(
        default_config: NodeConfig,
        config_file: Option<PathBuf>,
        store_dir: Option<PathBuf>,
    ) -> Result<Self, ControllerError> {
        let checkpoint_store = match store_dir {
            Some(dir) => {
                let store = SledCheckpointStore::new(&dir.join(CHECKPOINTS_DIR))?;
                Some(Arc::new(store) as Arc<dyn CheckpointStore>)
            }
            None => None,
        };
        Ok(Self::assemble(
            default_config,
            config_file.map(FsLoader::new),
            checkpoint_store,
        ))
    }

    /// Construct a controller over an injected store (dynamic config on).
    pub fn with_store(
        default_config: NodeConfig,
        file_loader: Option<FsLoader>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self::assemble(default_config, file_loader, Some(store))
    }

    /// Construct a controller with dynamic config disabled.
    pub fn local_only(default_config: NodeConfig, file_loader: Option<FsLoader>) -> Self {
        Self::assemble(default_config, file_loader, None)
    }

    fn assemble(
        default_config: NodeConfig,
        file_loader: Option<FsLoader>,
        checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        Self {
            default_config,
            file_loader,
            checkpoint_store,
            config_ok: ConfigOkCondition::new(),
            pending_source: ChangeSignal::new(),
            restart: Box::new(|| std::process::exit(0)),
            watch_stop: Mutex::new(None),
        }
    }

    /// Replace the restart handler invoked after a new assignment lands.
    pub fn set_restart_handler(&mut self, handler: impl Fn() + Send + Sync + 'static) {
        self.restart = Box::new(handler);
    }

    /// Whether this controller syncs config from the control plane.
    pub fn dynamic_config(&self) -> bool {
        self.checkpoint_store.is_some()
    }

    /// Snapshot of the published config condition.
    pub fn condition(&self) -> Option<crate::status::Condition> {
        self.config_ok.get()
    }

    /// Schedule an assigned-config sync on the next loop tick.
    pub fn poke_config_source(&self) {
        if self.pending_source.raise() {
            debug!("scheduled assigned config sync");
        }
    }

    /// Resolve the configuration the agent will run.
    ///
    /// Synchronous; call once, before `start_sync`. Returns an error only for
    /// the fatal-at-startup cases: invalid local config, a store that cannot
    /// initialize, or a last-known-good that fails to resolve.
    pub fn bootstrap(&self) -> Result<NodeConfig, ControllerError> {
        info!("starting configuration controller");

        let local = self.load_local_config()?;

        // without dynamic config the local config is the whole story, but the
        // condition still gets reported
        let Some(store) = self.checkpoint_store.as_deref() else {
            self.config_ok.set(
                status::DYNAMIC_DISABLED_MESSAGE,
                status::DYNAMIC_DISABLED_REASON,
                true,
            );
            return Ok(local);
        };

        store.initialize()?;

        let failure = match self.resolve_assigned(store, &local) {
            Ok(assigned) => {
                match &assigned.source {
                    Some(source) => self.config_ok.set(
                        status::remote_message(&source.uid),
                        assigned.reason.clone(),
                        true,
                    ),
                    None => self
                        .config_ok
                        .set(status::LOCAL_MESSAGE, assigned.reason.clone(), true),
                }

                // once the trial period is over, the assigned config becomes
                // the last-known-good; failure to persist that is non-fatal
                match self.in_trial(store, assigned.config.trial_duration()) {
                    Err(err) => {
                        error!(error = %err, "failed to check trial period for assigned config")
                    }
                    Ok(true) => {}
                    Ok(false) => {
                        info!("assigned config passed trial period, promoting to last-known-good");
                        if let Err(err) = self.graduate_assigned_to_last_known_good(store) {
                            error!(error = %err, "failed to set last-known-good to assigned config");
                        }
                    }
                }

                return Ok(assigned.config);
            }
            Err(failure) => failure,
        };

        error!(
            reason = %failure.reason,
            error = %failure.error,
            "assigned config failed to resolve, falling back to last-known-good"
        );

        let lkg_pointer = store
            .last_known_good()
            .map_err(|err| ControllerError::LastKnownGood {
                reason: status::load_failed_reason("unknown"),
                message: err.to_string(),
            })?;
        let lkg = self
            .resolve_source(store, lkg_pointer, &local)
            .map_err(|lkg_failure| ControllerError::LastKnownGood {
                reason: lkg_failure.reason,
                message: lkg_failure.error.to_string(),
            })?;

        // the condition carries the original failure reason, not a new one:
        // operators see why the rollback happened and what is running now
        match &lkg.source {
            Some(source) => self.config_ok.set(
                status::lkg_remote_message(&source.uid),
                failure.reason.clone(),
                false,
            ),
            None => self
                .config_ok
                .set(status::LKG_LOCAL_MESSAGE, failure.reason.clone(), false),
        }

        Ok(lkg.config)
    }

    /// Resolve a pointer value against the store.
    ///
    /// An absent pointer resolves to the local config. Reads only; calling
    /// twice with unchanged store contents yields identical results.
    pub fn resolve_source(
        &self,
        store: &dyn CheckpointStore,
        pointer: Option<ConfigSource>,
        local: &NodeConfig,
    ) -> Result<Resolved, ResolveFailure> {
        let Some(source) = pointer else {
            return Ok(Resolved {
                config: local.clone(),
                source: None,
                reason: status::LOCAL_OKAY_REASON.to_string(),
            });
        };

        let uid = source.uid.clone();
        let checkpoint = match store.load(&uid) {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                return Err(ResolveFailure {
                    reason: status::load_failed_reason(&uid),
                    source: Some(source),
                    error: err.into(),
                })
            }
        };

        let config = match checkpoint.parse() {
            Ok(config) => config,
            Err(err) => {
                return Err(ResolveFailure {
                    reason: status::parse_failed_reason(&uid),
                    source: Some(source),
                    error: err.into(),
                })
            }
        };

        if let Err(msg) = validate_node_config(&config) {
            return Err(ResolveFailure {
                reason: status::validate_failed_reason(&uid),
                source: Some(source),
                error: ControllerError::Validation(msg),
            });
        }

        Ok(Resolved {
            config,
            reason: status::remote_okay_reason(&uid),
            source: Some(source),
        })
    }

    /// Resolve the store's `current` pointer.
    fn resolve_assigned(
        &self,
        store: &dyn CheckpointStore,
        local: &NodeConfig,
    ) -> Result<Resolved, ResolveFailure> {
        let pointer = store.current().map_err(|err| ResolveFailure {
            source: None,
            reason: status::load_failed_reason("unknown"),
            error: err.into(),
        })?;
        self.resolve_source(store, pointer, local)
    }

    /// Validate the local config: defaults, then the file override if one is
    /// configured. The local config is the trust anchor; failure here aborts
    /// Bootstrap entirely.
    fn load_local_config(&self) -> Result<NodeConfig, ControllerError> {
        debug!("validating combination of defaults and overrides");
        validate_node_config(&self.default_config).map_err(|msg| {
            ControllerError::Validation(format!("default config failed validation: {}", msg))
        })?;

        if let Some(loader) = &self.file_loader {
            info!(path = %loader.path().display(), "loading node config file");
            let config = loader.load()?;
            validate_node_config(&config).map_err(|msg| {
                ControllerError::Validation(format!("config file failed validation: {}", msg))
            })?;
            return Ok(config);
        }

        Ok(self.default_config.clone())
    }

    /// Whether the elapsed time since `current` was last reassigned is still
    /// within the trial period.
    fn in_trial(
        &self,
        store: &dyn CheckpointStore,
        trial: chrono::Duration,
    ) -> Result<bool, StoreError> {
        let modified = store.current_modified()?;
        Ok(Utc::now().signed_duration_since(modified) <= trial)
    }

    /// Copy the `current` pointer value onto `last-known-good`.
    fn graduate_assigned_to_last_known_good(
        &self,
        store: &dyn CheckpointStore,
    ) -> Result<(), StoreError> {
        let current = store.current()?;
        store.set_last_known_good(current)
    }
}
