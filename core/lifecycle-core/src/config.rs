//! Runtime configuration (`lifecycle.toml`).
//!
//! Every section and field has a default, so a missing file, an empty file or
//! a partial file all load. Only unreadable or malformed files are errors.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LifecycleError, Result};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Emit an error-level log line for each rejected event.
    pub log_invalid_transitions: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_invalid_transitions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Write the aggregated counters to the metrics file.
    pub persist: bool,
    pub retention_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Loads configuration from `path`, returning defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<LifecycleConfig> {
    if !path.exists() {
        return Ok(LifecycleConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| LifecycleError::Io {
        context: format!("reading config {}", path.display()),
        source,
    })?;

    toml::from_str::<LifecycleConfig>(&content).map_err(|err| LifecycleError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
