//! Durable storage for the encoding store.
//!
//! Backends are blocking; [`crate::store::EncodingStore`] drives them from
//! `spawn_blocking` under a timeout.

pub mod json;
pub mod sqlite;

use crate::types::Record;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use json::JsonFileBackend;
pub use sqlite::SqliteBackend;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt record {name:?}: {reason}")]
    Corrupt { name: String, reason: String },
    #[error("unsupported store document version {0}")]
    UnsupportedVersion(u32),
}

/// Persistence for the full set of records.
pub trait StoreBackend: Send + Sync + 'static {
    /// Load every persisted record in stored order.
    fn load(&self) -> Result<Vec<Record>, BackendError>;

    /// Atomically replace the persisted state with `records`.
    ///
    /// Either the whole snapshot is durable on return, or the previous
    /// state is left intact.
    fn persist(&self, records: &[Record]) -> Result<(), BackendError>;

    /// Short human-readable description for logs and status output.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Json,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown backend {other:?} (expected sqlite or json)")),
        }
    }
}

/// Open the backend of the given kind at `path`.
pub fn open_backend(
    kind: BackendKind,
    path: &Path,
) -> Result<Arc<dyn StoreBackend>, BackendError> {
    Ok(match kind {
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(path)?),
        BackendKind::Json => Arc::new(JsonFileBackend::new(path)),
    })
}
