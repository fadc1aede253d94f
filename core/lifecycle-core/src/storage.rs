//! Storage paths for lifecycle configuration and metrics.
//!
//! On device the host passes its container directory via
//! [`StorageConfig::with_root`]. Desktop tooling falls back to `~/.lifecycle`.

use std::path::{Path, PathBuf};

use crate::error::{LifecycleError, Result};

const DEFAULT_DIR_NAME: &str = ".lifecycle";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// `~/.lifecycle`, for tools running outside the app container.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(LifecycleError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(DEFAULT_DIR_NAME),
        })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to lifecycle.toml (runtime configuration).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("lifecycle.toml")
    }

    /// Path to invalid-transitions.json (persisted daily metrics).
    pub fn metrics_file(&self) -> PathBuf {
        self.root.join("invalid-transitions.json")
    }
}
