//! Error types for lifecycle-core operations.
//! Keep LifecycleFfiError minimal and stable to avoid breaking FFI clients.
//!
//! The transition function itself never fails; these errors come from the
//! surrounding layers (configuration, metrics persistence, event decoding).

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Swift/Kotlin)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LifecycleFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<LifecycleError> for LifecycleFfiError {
    fn from(err: LifecycleError) -> Self {
        LifecycleFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur around the lifecycle core.
///
/// For FFI boundaries, use `LifecycleFfiError` instead.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // Event Decoding Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown lifecycle event: {0}")]
    UnknownEvent(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using LifecycleError.
pub type Result<T> = std::result::Result<T, LifecycleError>;
