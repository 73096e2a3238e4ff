//! # kbsync - SCKAN knowledge store synchronization
//!
//! Keeps a local SQLite knowledge store in step with an authoritative
//! connectivity knowledge source.
//!
//! kbsync provides:
//! - A SQLite-backed knowledge store with per-source replace semantics
//! - Derived index tables (labels, publications, connectivity nodes)
//! - Load from a remote knowledge source, one transaction per source
//! - Extract/restore of a source as a portable JSON snapshot

pub mod knowledge;
pub mod storage;
pub mod snapshot;
pub mod remote;
pub mod sync;
pub mod ui;
pub mod output;
pub mod config;

use std::path::PathBuf;

// Re-exports for convenient access
pub use knowledge::{ConnectivityNode, KnowledgeRecord, Payload};
pub use storage::{KnowledgeStore, OpenMode};
pub use snapshot::Snapshot;
pub use remote::{HttpRemote, RemoteSource};
pub use sync::SyncEngine;

/// Result type alias for kbsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for kbsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to open knowledge store {path}: {reason}")]
    StoreOpen { path: PathBuf, reason: String },

    #[error("Knowledge store is locked by another writer: {0}")]
    StoreBusy(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Remote knowledge source unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("No valid knowledge sources in {0}")]
    NoSource(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Malformed knowledge for `{entity}`: {reason}")]
    MalformedRecord { entity: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                Error::StoreBusy(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}
