//! Local configuration loading: defaults, file override, environment overlay.
//!
//! Precedence: compiled-in defaults (lowest) -> config file -> `CONFSYNC_*`
//! environment variables (highest).

use super::NodeConfig;
use crate::error::ControllerError;
use std::path::{Path, PathBuf};

/// Loader for the local file-based configuration.
pub struct FsLoader {
    path: PathBuf,
}

impl FsLoader {
    /// Create a loader for the given config file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the config file this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config file layered over defaults with an environment overlay.
    pub fn load(&self) -> Result<NodeConfig, ControllerError> {
        let builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&NodeConfig::default())?)
            .add_source(::config::File::from(self.path.as_path()))
            .add_source(
                ::config::Environment::with_prefix("CONFSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        let merged = builder.build()?;
        Ok(merged.try_deserialize()?)
    }
}
