//! Name-keyed encoding store.
//!
//! Readers get an immutable snapshot (`Arc<Vec<Record>>`) and never observe
//! a half-applied mutation. Writers are serialized by an async mutex, build
//! the next snapshot off to the side, persist it through the backend, and
//! only then publish it. A failed or timed-out persist leaves both the
//! published snapshot and (once the stalled write drains) the backend
//! untouched.

use crate::backend::{BackendError, StoreBackend};
use crate::matcher::{MatchError, Matcher};
use crate::types::{FaceEncoding, MatchResult, Record, DEFAULT_ENCODING_DIM};
use std::sync::atomic::{AtomicU8, Ordering::SeqCst};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinError;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

// Handshake between a persist task and the caller waiting on it.
const PERSIST_PENDING: u8 = 0;
const PERSIST_DONE: u8 = 1;
const PERSIST_ABANDONED: u8 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("face not found: {0}")]
    NotFound(String),
    #[error("name already registered: {0}")]
    AlreadyRegistered(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// What to do when a name is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Last write wins; the record keeps its original position.
    #[default]
    Overwrite,
    /// Fail with [`StoreError::AlreadyRegistered`].
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown duplicate policy {other:?} (expected overwrite or reject)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Required length of every registered encoding.
    pub dimension: usize,
    pub duplicate_policy: DuplicatePolicy,
    /// Upper bound on each backend call (and on waiting for the writer lock).
    pub io_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_ENCODING_DIM,
            duplicate_policy: DuplicatePolicy::default(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Whether a successful registration created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Inserted,
    Replaced,
}

pub struct EncodingStore {
    config: StoreConfig,
    backend: Arc<dyn StoreBackend>,
    snapshot: RwLock<Arc<Vec<Record>>>,
    writer: Arc<Mutex<()>>,
}

impl EncodingStore {
    /// Load persisted records and build the store.
    ///
    /// Records whose dimensionality disagrees with the configuration are
    /// kept (so they can be deleted) but logged; recognition reports them
    /// as errors until removed.
    pub async fn open(
        backend: Arc<dyn StoreBackend>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let loader = Arc::clone(&backend);
        let records = run_blocking(config.io_timeout, move || loader.load()).await?;

        for record in records.iter().filter(|r| r.encoding.len() != config.dimension) {
            tracing::warn!(
                name = %record.name,
                dim = record.encoding.len(),
                expected = config.dimension,
                "stored encoding has unexpected dimension"
            );
        }

        tracing::info!(
            backend = %backend.describe(),
            faces = records.len(),
            dimension = config.dimension,
            "encoding store opened"
        );

        Ok(Self {
            config,
            backend,
            snapshot: RwLock::new(Arc::new(records)),
            writer: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    /// Insert or (per policy) replace the record for `name`.
    ///
    /// The name is trimmed of surrounding whitespace before use.
    pub async fn register(
        &self,
        name: &str,
        encoding: FaceEncoding,
    ) -> Result<RegisterOutcome, StoreError> {
        let name = validate_name(name)?;
        self.validate_encoding(&encoding)?;
        let policy = self.config.duplicate_policy;
        let logged = name.clone();

        let outcome = self
            .commit(move |records| {
                let record = Record::new(name.clone(), encoding);
                match records.iter().position(|r| r.name == name) {
                    Some(_) if policy == DuplicatePolicy::Reject => {
                        Err(StoreError::AlreadyRegistered(name))
                    }
                    Some(idx) => {
                        records[idx] = record;
                        Ok(RegisterOutcome::Replaced)
                    }
                    None => {
                        records.push(record);
                        Ok(RegisterOutcome::Inserted)
                    }
                }
            })
            .await?;

        tracing::info!(name = %logged, ?outcome, "face registered");
        Ok(outcome)
    }

    /// Remove the record for `name`; absent names are [`StoreError::NotFound`].
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let name = name.trim().to_string();
        let target = name.clone();
        self.commit(move |records| {
            let idx = records
                .iter()
                .position(|r| r.name == target)
                .ok_or_else(|| StoreError::NotFound(target.clone()))?;
            records.remove(idx);
            Ok(())
        })
        .await?;

        tracing::info!(name = %name, "face deleted");
        Ok(())
    }

    /// Merge `incoming` into the store with a single persist.
    ///
    /// Every record is validated first; nothing is applied if any fails.
    /// Returns the number of records inserted or replaced.
    pub async fn import(&self, incoming: Vec<Record>) -> Result<usize, StoreError> {
        let mut cleaned = Vec::with_capacity(incoming.len());
        for mut record in incoming {
            record.name = validate_name(&record.name)?;
            self.validate_encoding(&record.encoding)?;
            cleaned.push(record);
        }
        let policy = self.config.duplicate_policy;

        let count = self
            .commit(move |records| {
                let count = cleaned.len();
                for record in cleaned {
                    match records.iter().position(|r| r.name == record.name) {
                        Some(_) if policy == DuplicatePolicy::Reject => {
                            return Err(StoreError::AlreadyRegistered(record.name));
                        }
                        Some(idx) => records[idx] = record,
                        None => records.push(record),
                    }
                }
                Ok(count)
            })
            .await?;

        tracing::info!(count, "faces imported");
        Ok(count)
    }

    /// Registered names in stored (registration) order.
    pub fn list_names(&self) -> Vec<String> {
        self.all_records().iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.all_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_records().is_empty()
    }

    /// Consistent snapshot of every record, including raw encodings.
    ///
    /// For matching and local administration only; never hand this to
    /// remote clients.
    pub fn all_records(&self) -> Arc<Vec<Record>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Match `probe` against the current snapshot.
    pub fn recognize(
        &self,
        matcher: &dyn Matcher,
        probe: &FaceEncoding,
        threshold: f32,
    ) -> Result<MatchResult, MatchError> {
        let records = self.all_records();
        matcher.compare(probe, &records, threshold)
    }

    fn validate_encoding(&self, encoding: &FaceEncoding) -> Result<(), StoreError> {
        if encoding.len() != self.config.dimension {
            return Err(StoreError::InvalidInput(format!(
                "encoding has {} dimensions, expected {}",
                encoding.len(),
                self.config.dimension
            )));
        }
        if !encoding.is_finite() {
            return Err(StoreError::InvalidInput(
                "encoding contains non-finite values".into(),
            ));
        }
        Ok(())
    }

    /// Apply `mutate` to a copy of the current records, persist the copy,
    /// then publish it.
    ///
    /// A persist that outlives `io_timeout` is abandoned: if it later
    /// succeeds, the blocking task writes the previous snapshot back before
    /// releasing the writer lock, so a failed call never shows up on disk.
    async fn commit<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<Record>) -> Result<T, StoreError>,
    {
        let timeout = self.config.io_timeout;
        let guard: OwnedMutexGuard<()> =
            tokio::time::timeout(timeout, Arc::clone(&self.writer).lock_owned())
                .await
                .map_err(|_| {
                    StoreError::StorageUnavailable(
                        "timed out waiting for a pending write".into(),
                    )
                })?;

        let previous = self.all_records();
        let mut next = Vec::clone(&previous);
        let out = mutate(&mut next)?;
        let next = Arc::new(next);

        let backend = Arc::clone(&self.backend);
        let pending = Arc::clone(&next);
        let state = Arc::new(AtomicU8::new(PERSIST_PENDING));
        let task_state = Arc::clone(&state);
        let started = std::time::Instant::now();
        // The guard rides along with the write so that an abandoned persist
        // still blocks the next writer until it has been rolled back.
        let persist = move || -> Result<OwnedMutexGuard<()>, BackendError> {
            backend.persist(&pending)?;
            if task_state
                .compare_exchange(PERSIST_PENDING, PERSIST_DONE, SeqCst, SeqCst)
                .is_err()
            {
                tracing::warn!("late persist landed after timeout; restoring previous snapshot");
                if let Err(e) = backend.persist(&previous) {
                    tracing::error!(error = %e, "failed to restore previous snapshot");
                }
            }
            Ok(guard)
        };
        let mut task = tokio::task::spawn_blocking(persist);

        let waited = tokio::time::timeout(timeout, &mut task).await;
        let joined = match waited {
            Ok(joined) => joined,
            Err(_) => {
                if state
                    .compare_exchange(PERSIST_PENDING, PERSIST_ABANDONED, SeqCst, SeqCst)
                    .is_ok()
                {
                    tracing::warn!(timeout_ms = timeout.as_millis() as u64, "storage timed out");
                    return Err(StoreError::StorageUnavailable(format!(
                        "storage did not respond within {timeout:?}"
                    )));
                }
                // The write committed just as the deadline passed; the guard
                // is on its way back.
                task.await
            }
        };
        let guard = fold_join(joined)?;
        tracing::debug!(
            records = next.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "store persisted"
        );

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
        drop(guard);
        Ok(out)
    }
}

fn validate_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Run a blocking backend call with a deadline, folding every failure
/// into [`StoreError::StorageUnavailable`].
async fn run_blocking<T, F>(timeout: Duration, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => fold_join(joined),
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "storage timed out");
            Err(StoreError::StorageUnavailable(format!(
                "storage did not respond within {timeout:?}"
            )))
        }
    }
}

fn fold_join<T>(joined: Result<Result<T, BackendError>, JoinError>) -> Result<T, StoreError> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "storage backend failed");
            Err(StoreError::StorageUnavailable(e.to_string()))
        }
        Err(join) => {
            tracing::warn!(error = %join, "storage task aborted");
            Err(StoreError::StorageUnavailable(format!(
                "storage task aborted: {join}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JsonFileBackend, SqliteBackend};
    use crate::matcher::EuclideanMatcher;
    use std::sync::atomic::{AtomicBool, Ordering};

    const DIM: usize = 8;

    fn config(policy: DuplicatePolicy) -> StoreConfig {
        StoreConfig {
            dimension: DIM,
            duplicate_policy: policy,
            io_timeout: Duration::from_millis(500),
        }
    }

    fn enc(seed: f32) -> FaceEncoding {
        FaceEncoding::new((0..DIM).map(|i| seed + i as f32 * 0.01).collect())
    }

    /// Backend that keeps records in memory and can be told to fail or stall.
    #[derive(Default)]
    struct FlakyBackend {
        records: std::sync::Mutex<Vec<Record>>,
        fail: AtomicBool,
        stall: AtomicBool,
    }

    impl StoreBackend for FlakyBackend {
        fn load(&self) -> Result<Vec<Record>, BackendError> {
            Ok(self.records.lock().unwrap().clone())
        }

        fn persist(&self, records: &[Record]) -> Result<(), BackendError> {
            if self.stall.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_secs(2));
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(BackendError::Io(std::io::Error::other("disk full")));
            }
            *self.records.lock().unwrap() = records.to_vec();
            Ok(())
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    async fn open_flaky(policy: DuplicatePolicy) -> (EncodingStore, Arc<FlakyBackend>) {
        let backend = Arc::new(FlakyBackend::default());
        let store = EncodingStore::open(backend.clone(), config(policy)).await.unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn test_register_then_list() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        assert_eq!(
            store.register("Alice", enc(0.1)).await.unwrap(),
            RegisterOutcome::Inserted
        );
        assert_eq!(store.list_names(), vec!["Alice".to_string()]);
    }

    #[tokio::test]
    async fn test_overwrite_policy_keeps_single_entry_in_place() {
        let (store, backend) = open_flaky(DuplicatePolicy::Overwrite).await;
        store.register("Alice", enc(0.1)).await.unwrap();
        store.register("Bob", enc(0.5)).await.unwrap();
        assert_eq!(
            store.register("Alice", enc(0.9)).await.unwrap(),
            RegisterOutcome::Replaced
        );

        assert_eq!(store.list_names(), vec!["Alice", "Bob"]);
        assert_eq!(store.all_records()[0].encoding, enc(0.9));
        assert_eq!(backend.load().unwrap()[0].encoding, enc(0.9));
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_duplicate() {
        let (store, _) = open_flaky(DuplicatePolicy::Reject).await;
        store.register("Alice", enc(0.1)).await.unwrap();
        assert_eq!(
            store.register("Alice", enc(0.9)).await,
            Err(StoreError::AlreadyRegistered("Alice".into()))
        );
        assert_eq!(store.all_records()[0].encoding, enc(0.1));
    }

    #[tokio::test]
    async fn test_name_is_trimmed() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        store.register("  Alice ", enc(0.1)).await.unwrap();
        store.register("Alice", enc(0.2)).await.unwrap();
        assert_eq!(store.list_names(), vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_rejects_blank_name() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        for name in ["", "   ", "\t\n"] {
            assert!(matches!(
                store.register(name, enc(0.1)).await,
                Err(StoreError::InvalidInput(_))
            ));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        let short = FaceEncoding::new(vec![0.0; DIM - 1]);
        let long = FaceEncoding::new(vec![0.0; DIM + 1]);
        assert!(matches!(
            store.register("a", short).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("a", long).await,
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_finite_encoding() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        let mut values = vec![0.0; DIM];
        values[3] = f32::INFINITY;
        assert!(matches!(
            store.register("a", FaceEncoding::new(values)).await,
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        store.register("Alice", enc(0.1)).await.unwrap();
        store.delete("Alice").await.unwrap();
        assert!(store.list_names().is_empty());
        assert_eq!(
            store.delete("Alice").await,
            Err(StoreError::NotFound("Alice".into()))
        );
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let (store, backend) = open_flaky(DuplicatePolicy::Overwrite).await;
        store.register("Alice", enc(0.1)).await.unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.register("Bob", enc(0.2)).await,
            Err(StoreError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.delete("Alice").await,
            Err(StoreError::StorageUnavailable(_))
        ));
        assert_eq!(store.list_names(), vec!["Alice"]);

        // Retrying the same input once storage recovers succeeds.
        backend.fail.store(false, Ordering::SeqCst);
        store.register("Bob", enc(0.2)).await.unwrap();
        assert_eq!(store.list_names(), vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_stalled_persist_times_out() {
        let (store, backend) = open_flaky(DuplicatePolicy::Overwrite).await;
        backend.stall.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.register("Alice", enc(0.1)).await,
            Err(StoreError::StorageUnavailable(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_register_never_reaches_disk() {
        let (store, backend) = open_flaky(DuplicatePolicy::Overwrite).await;
        store.register("Alice", enc(0.1)).await.unwrap();

        backend.stall.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.register("Bob", enc(0.2)).await,
            Err(StoreError::StorageUnavailable(_))
        ));
        backend.stall.store(false, Ordering::SeqCst);

        // Give the stalled write time to land and be undone.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(store.list_names(), vec!["Alice"]);

        let reopened = EncodingStore::open(backend.clone(), config(DuplicatePolicy::Overwrite))
            .await
            .unwrap();
        assert_eq!(reopened.list_names(), vec!["Alice"]);

        store.register("Carol", enc(0.3)).await.unwrap();
        let on_disk: Vec<String> = backend.load().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(on_disk, vec!["Alice", "Carol"]);
    }

    #[tokio::test]
    async fn test_recognize_uses_current_snapshot() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        let matcher = EuclideanMatcher::default();
        assert_eq!(
            store.recognize(&matcher, &enc(0.1), 0.6).unwrap(),
            MatchResult::NoMatch
        );

        store.register("Alice", enc(0.1)).await.unwrap();
        store.register("Bob", enc(3.0)).await.unwrap();
        let result = store.recognize(&matcher, &enc(0.1), 0.6).unwrap();
        assert_eq!(result.name(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (store, _) = open_flaky(DuplicatePolicy::Overwrite).await;
        let batch = vec![
            Record::new("a", enc(0.1)),
            Record::new("b", FaceEncoding::new(vec![0.0; 3])),
        ];
        assert!(store.import(batch).await.is_err());
        assert!(store.is_empty());

        let batch = vec![Record::new("a", enc(0.1)), Record::new(" b ", enc(0.2))];
        assert_eq!(store.import(batch).await.unwrap(), 2);
        assert_eq!(store.list_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mismatched_stored_record_surfaces_on_recognize() {
        let backend = Arc::new(FlakyBackend::default());
        backend
            .persist(&[Record::new("legacy", FaceEncoding::new(vec![0.0; 4]))])
            .unwrap();
        let store = EncodingStore::open(backend, config(DuplicatePolicy::Overwrite))
            .await
            .unwrap();

        let err = store
            .recognize(&EuclideanMatcher::default(), &enc(0.0), 0.6)
            .unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));

        store.delete("legacy").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.db");
        let expected = {
            let backend = Arc::new(SqliteBackend::open(&path).unwrap());
            let store = EncodingStore::open(backend, config(DuplicatePolicy::Overwrite))
                .await
                .unwrap();
            store.register("Alice", enc(0.123_456_7)).await.unwrap();
            store.register("Bob", enc(-4.2)).await.unwrap();
            store.register("Carol", enc(1e-6)).await.unwrap();
            store.delete("Bob").await.unwrap();
            store.all_records()
        };

        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        let reopened = EncodingStore::open(backend, config(DuplicatePolicy::Overwrite))
            .await
            .unwrap();
        assert_eq!(reopened.list_names(), vec!["Alice", "Carol"]);
        assert_eq!(*reopened.all_records(), *expected);
    }

    #[tokio::test]
    async fn test_json_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.json");
        let expected = {
            let backend = Arc::new(JsonFileBackend::new(&path));
            let store = EncodingStore::open(backend, config(DuplicatePolicy::Overwrite))
                .await
                .unwrap();
            store.register("Zoe", enc(0.7)).await.unwrap();
            store.register("Adam", enc(0.000_31)).await.unwrap();
            store.all_records()
        };

        let backend = Arc::new(JsonFileBackend::new(&path));
        let reopened = EncodingStore::open(backend, config(DuplicatePolicy::Overwrite))
            .await
            .unwrap();
        assert_eq!(reopened.list_names(), vec!["Zoe", "Adam"]);
        assert_eq!(*reopened.all_records(), *expected);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_all_applied() {
        let (store, backend) = open_flaky(DuplicatePolicy::Overwrite).await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.register(&format!("person-{i}"), enc(i as f32)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.len(), 16);
        assert_eq!(backend.load().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_register_recognize_walkthrough() {
        let backend = Arc::new(FlakyBackend::default());
        let store = EncodingStore::open(backend, StoreConfig::default()).await.unwrap();
        let matcher = EuclideanMatcher::default();

        let alice: Vec<f32> = (0..128).map(|i| (i % 9 + 1) as f32 / 10.0).collect();
        store
            .register("Alice", FaceEncoding::new(alice.clone()))
            .await
            .unwrap();
        assert_eq!(store.list_names(), vec!["Alice"]);

        match store
            .recognize(&matcher, &FaceEncoding::new(alice.clone()), 0.6)
            .unwrap()
        {
            MatchResult::Match {
                name, confidence, ..
            } => {
                assert_eq!(name, "Alice");
                assert!((confidence - 1.0).abs() < 1e-6);
            }
            MatchResult::NoMatch => panic!("identical probe must match"),
        }

        let mut far = alice;
        far[0] += 0.9;
        assert_eq!(
            store.recognize(&matcher, &FaceEncoding::new(far), 0.6).unwrap(),
            MatchResult::NoMatch
        );
    }

    #[test]
    fn test_duplicate_policy_parse() {
        assert_eq!("overwrite".parse(), Ok(DuplicatePolicy::Overwrite));
        assert_eq!("Reject".parse(), Ok(DuplicatePolicy::Reject));
        assert!("merge".parse::<DuplicatePolicy>().is_err());
    }
}
