use facematch_core::{
    BackendKind, DuplicatePolicy, StoreConfig, DEFAULT_DISTANCE_SCALE, DEFAULT_ENCODING_DIM,
    DEFAULT_THRESHOLD,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (default: 0.0.0.0:5000).
    pub bind: String,
    /// Storage backend kind.
    pub backend: BackendKind,
    /// Path to the database or JSON file.
    pub db_path: PathBuf,
    /// Maximum L2 distance (exclusive) for a positive match.
    pub threshold: f32,
    /// Distance at which confidence reaches zero.
    pub distance_scale: f32,
    /// Required encoding dimensionality.
    pub encoding_dim: usize,
    /// Bound on each persistence operation.
    pub storage_timeout_secs: u64,
    pub duplicate_policy: DuplicatePolicy,
    /// Directory for registration images; `None` disables saving them.
    pub image_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `FACEMATCH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let backend = env_parse("FACEMATCH_BACKEND", BackendKind::Sqlite);

        let db_path = std::env::var("FACEMATCH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| facematch_core::default_store_path(backend));

        // Unset: next to the store. Set but empty: disabled.
        let image_dir = match std::env::var("FACEMATCH_IMAGE_DIR") {
            Ok(dir) if dir.trim().is_empty() => None,
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => Some(default_image_dir(&db_path)),
        };

        Self {
            bind: std::env::var("FACEMATCH_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            backend,
            db_path,
            threshold: env_parse("FACEMATCH_THRESHOLD", DEFAULT_THRESHOLD),
            distance_scale: env_parse("FACEMATCH_DISTANCE_SCALE", DEFAULT_DISTANCE_SCALE),
            encoding_dim: env_parse("FACEMATCH_ENCODING_DIM", DEFAULT_ENCODING_DIM),
            storage_timeout_secs: env_parse("FACEMATCH_STORAGE_TIMEOUT_SECS", 5),
            duplicate_policy: env_parse("FACEMATCH_DUPLICATE_POLICY", DuplicatePolicy::Overwrite),
            image_dir,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dimension: self.encoding_dim,
            duplicate_policy: self.duplicate_policy,
            io_timeout: Duration::from_secs(self.storage_timeout_secs.max(1)),
        }
    }
}

/// `registered_faces/` beside the store file.
fn default_image_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("registered_faces")
}

/// Parse `key` if set; unset or unparsable values fall back to `default`.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable setting");
                default
            }
        },
        Err(_) => default,
    }
}
