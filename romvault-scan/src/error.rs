//! Error types for romvault-scan
//!
//! Only `Config` and `AlreadyRunning` reach the caller of a scan start.
//! `Read` and `Provider` failures are recovered per entry and recorded on
//! the entry; `AmbiguousLayout` is logged and the scan falls back to
//! layout A.

use romvault_common::models::ProviderId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Scan engine error taxonomy
#[derive(Debug, Error)]
pub enum ScanError {
    /// Library root missing/unreadable or invalid settings; aborts before start
    #[error("Configuration error: {0}")]
    Config(String),

    /// File could not be read; entry-scoped
    #[error("Read error on {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Metadata source failed for one entry; provider-scoped
    #[error("Provider {provider} failed: {message}")]
    Provider { provider: ProviderId, message: String },

    /// Library root matches both or neither folder layout
    #[error("Ambiguous library layout at {root}: {detail}")]
    AmbiguousLayout { root: PathBuf, detail: String },

    /// A scan run is already active on this library root
    #[error("A scan is already running (run {0})")]
    AlreadyRunning(uuid::Uuid),

    /// Rename target already exists on disk
    #[error("ROM already exists: {0}")]
    RomAlreadyExists(String),

    /// Catalog persistence error
    #[error("Catalog error: {0}")]
    Catalog(#[from] romvault_common::Error),

    /// I/O error outside entry scope
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScanError::Read {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn provider(provider: ProviderId, err: impl std::fmt::Display) -> Self {
        ScanError::Provider {
            provider,
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for ScanError {
    fn from(err: sqlx::Error) -> Self {
        ScanError::Catalog(romvault_common::Error::Database(err))
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Catalog(romvault_common::Error::Serialization(err))
    }
}
