//! facematch-core: Face encoding store and nearest-match engine.
//!
//! Holds named face encodings behind a durable backend (SQLite or a JSON
//! file) and classifies probe encodings by Euclidean distance against them.
//! Face detection and encoding are external; see [`encoder::FaceEncoder`].

pub mod backend;
pub mod encoder;
pub mod matcher;
pub mod store;
pub mod types;

use std::path::PathBuf;

pub use backend::{open_backend, BackendError, BackendKind, StoreBackend};
pub use encoder::{EncodingError, FaceEncoder};
pub use matcher::{
    EuclideanMatcher, MatchError, Matcher, DEFAULT_DISTANCE_SCALE, DEFAULT_THRESHOLD,
};
pub use store::{DuplicatePolicy, EncodingStore, RegisterOutcome, StoreConfig, StoreError};
pub use types::{FaceEncoding, MatchResult, Record, DEFAULT_ENCODING_DIM};

/// Default data directory: `$XDG_DATA_HOME/facematch`, falling back to
/// `~/.local/share/facematch`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facematch")
}

/// Default store path for the given backend.
pub fn default_store_path(kind: BackendKind) -> PathBuf {
    match kind {
        BackendKind::Sqlite => default_data_dir().join("faces.db"),
        BackendKind::Json => default_data_dir().join("faces.json"),
    }
}
