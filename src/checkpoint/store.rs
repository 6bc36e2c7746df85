//! Checkpoint storage backends.
//!
//! [`CheckpointStore`] and [`AsyncCheckpointStore`] are two explicit traits
//! rather than one trait with a runtime `is_async` flag: a store backend is
//! either blocking or not, and callers pick the matching trait at the type
//! level. [`BlockingStoreAdapter`] bridges any [`CheckpointStore`] into an
//! [`AsyncCheckpointStore`] for callers on the async facade who only have a
//! sync store (e.g. the file store) available.

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::checkpoint::codec::{expiry_from_ttl, now_epoch_seconds, CheckpointRecord};
use crate::checkpoint::state::CheckpointState;
use crate::error::{BojApiError, FailureCause};
use crate::telemetry::{BojEvent, BojObserver, NoopObserver};
use crate::validate::validate_checkpoint_id;

fn new_checkpoint_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Blocking checkpoint storage contract: save/load/delete a deep copy of a
/// [`CheckpointState`] by opaque id.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, state: CheckpointState, ttl: Duration) -> Result<String, BojApiError>;
    fn load(&self, id: &str) -> Result<CheckpointState, BojApiError>;
    fn delete(&self, id: &str) -> Result<(), BojApiError>;
}

/// Async counterpart of [`CheckpointStore`] for natively async backends.
#[async_trait]
pub trait AsyncCheckpointStore: Send + Sync {
    async fn save(&self, state: CheckpointState, ttl: Duration) -> Result<String, BojApiError>;
    async fn load(&self, id: &str) -> Result<CheckpointState, BojApiError>;
    async fn delete(&self, id: &str) -> Result<(), BojApiError>;
}

fn purge_expired(records: &mut HashMap<String, CheckpointRecord>) {
    let now = now_epoch_seconds();
    let expired: Vec<String> =
        records.iter().filter(|(_, record)| record.is_expired_at(now)).map(|(id, _)| id.clone()).collect();
    for id in expired {
        records.remove(&id);
    }
}

/// In-process checkpoint store, for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: Mutex<HashMap<String, CheckpointRecord>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, state: CheckpointState, ttl: Duration) -> Result<String, BojApiError> {
        let id = new_checkpoint_id();
        let record = CheckpointRecord { id: id.clone(), expires_at_epoch_seconds: expiry_from_ttl(ttl), state };
        let mut records = self.records.lock().expect("checkpoint store mutex poisoned");
        purge_expired(&mut records);
        records.insert(id.clone(), record);
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<CheckpointState, BojApiError> {
        validate_checkpoint_id(id)?;
        let mut records = self.records.lock().expect("checkpoint store mutex poisoned");
        let now = now_epoch_seconds();
        match records.get(id) {
            None => Err(BojApiError::validation(format!("checkpoint '{id}' not found"))),
            Some(record) if record.is_expired_at(now) => {
                records.remove(id);
                Err(BojApiError::validation(format!("checkpoint '{id}' has expired")))
            }
            Some(record) => Ok(record.state.clone()),
        }
    }

    fn delete(&self, id: &str) -> Result<(), BojApiError> {
        validate_checkpoint_id(id)?;
        let mut records = self.records.lock().expect("checkpoint store mutex poisoned");
        match records.remove(id) {
            Some(_) => Ok(()),
            None => Err(BojApiError::validation(format!("checkpoint '{id}' not found"))),
        }
    }
}

/// File-backed checkpoint store: one JSON document per checkpoint, written
/// atomically (temp file, `fsync`, rename) so a crash mid-write never leaves
/// a half-written record for [`FileCheckpointStore::load`] to trip over.
pub struct FileCheckpointStore {
    base_dir: PathBuf,
    observer: Arc<dyn BojObserver>,
}

impl FileCheckpointStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, BojApiError> {
        Self::with_observer(base_dir, Arc::new(NoopObserver))
    }

    pub fn with_observer(base_dir: impl Into<PathBuf>, observer: Arc<dyn BojObserver>) -> Result<Self, BojApiError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|err| BojApiError::transport(format!("failed to create checkpoint directory: {err}"), FailureCause::Network))?;
        Ok(Self { base_dir, observer })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, BojApiError> {
        validate_checkpoint_id(id)?;
        let path = self.base_dir.join(format!("{id}.json"));
        if path.parent() != Some(self.base_dir.as_path()) {
            return Err(BojApiError::validation("checkpoint id escapes the checkpoint directory"));
        }
        Ok(path)
    }

    fn write_atomically(&self, path: &Path, record: &CheckpointRecord) -> Result<(), BojApiError> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(record)
            .map_err(|err| BojApiError::transport(format!("failed to encode checkpoint: {err}"), FailureCause::Network))?;
        let mut file = fs::File::create(&tmp_path)
            .map_err(|err| BojApiError::transport(format!("failed to create checkpoint temp file: {err}"), FailureCause::Network))?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .map_err(|err| BojApiError::transport(format!("failed to write checkpoint: {err}"), FailureCause::Network))?;
        fs::rename(&tmp_path, path)
            .map_err(|err| BojApiError::transport(format!("failed to install checkpoint file: {err}"), FailureCause::Network))?;
        Ok(())
    }

    fn read_record(&self, id: &str, path: &Path) -> Result<Option<CheckpointRecord>, BojApiError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(BojApiError::transport(format!("failed to read checkpoint: {err}"), FailureCause::Network))
            }
        };
        match serde_json::from_slice::<CheckpointRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                self.observer.emit(BojEvent::CheckpointCorrupt { checkpoint_id: id.to_string(), reason: err.to_string() });
                let _ = fs::remove_file(path);
                Ok(None)
            }
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, state: CheckpointState, ttl: Duration) -> Result<String, BojApiError> {
        let id = new_checkpoint_id();
        let path = self.path_for(&id)?;
        let record = CheckpointRecord { id: id.clone(), expires_at_epoch_seconds: expiry_from_ttl(ttl), state };
        self.write_atomically(&path, &record)?;
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<CheckpointState, BojApiError> {
        let path = self.path_for(id)?;
        match self.read_record(id, &path)? {
            None => Err(BojApiError::validation(format!("checkpoint '{id}' not found"))),
            Some(record) if record.is_expired_at(now_epoch_seconds()) => {
                let _ = fs::remove_file(&path);
                Err(BojApiError::validation(format!("checkpoint '{id}' has expired")))
            }
            Some(record) => Ok(record.state),
        }
    }

    fn delete(&self, id: &str) -> Result<(), BojApiError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BojApiError::validation(format!("checkpoint '{id}' not found")))
            }
            Err(err) => Err(BojApiError::transport(format!("failed to delete checkpoint: {err}"), FailureCause::Network)),
        }
    }
}

/// Bridges a blocking [`CheckpointStore`] into [`AsyncCheckpointStore`] by
/// running each call on `tokio`'s blocking thread pool, so an async caller
/// never stalls its reactor thread on file I/O.
pub struct BlockingStoreAdapter<S> {
    inner: Arc<S>,
}

impl<S: CheckpointStore + 'static> BlockingStoreAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

fn join_error(err: tokio::task::JoinError) -> BojApiError {
    BojApiError::transport(format!("checkpoint store task panicked: {err}"), FailureCause::Network)
}

#[async_trait]
impl<S: CheckpointStore + 'static> AsyncCheckpointStore for BlockingStoreAdapter<S> {
    async fn save(&self, state: CheckpointState, ttl: Duration) -> Result<String, BojApiError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.save(state, ttl)).await.map_err(join_error)?
    }

    async fn load(&self, id: &str) -> Result<CheckpointState, BojApiError> {
        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || inner.load(&id)).await.map_err(join_error)?
    }

    async fn delete(&self, id: &str) -> Result<(), BojApiError> {
        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || inner.delete(&id)).await.map_err(join_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigSnapshot, DataCodeQuery};
    use std::collections::HashMap as StdHashMap;

    fn sample_state() -> CheckpointState {
        CheckpointState::DataCode(crate::model::DataCodeCheckpointState {
            query: DataCodeQuery::new("DB", vec!["A".into()]),
            config_snapshot: ConfigSnapshot {
                max_attempts: 3,
                max_backoff_seconds: 30.0,
                total_retry_budget_seconds: 60.0,
                min_wait_interval_seconds: 1.0,
                enable_layer_auto_partition: true,
                checkpoint_enabled: true,
                checkpoint_ttl_seconds: 3600,
            },
            by_code: StdHashMap::new(),
            last_envelope: None,
            chunk_index: 0,
            start_position: 1,
        })
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCheckpointStore::new();
        let id = store.save(sample_state(), Duration::from_secs(3600)).unwrap();
        assert_eq!(store.load(&id).unwrap(), sample_state());
        store.delete(&id).unwrap();
        assert!(store.load(&id).is_err());
    }

    #[test]
    fn memory_store_expires_immediately_with_zero_ttl() {
        let store = MemoryCheckpointStore::new();
        let id = store.save(sample_state(), Duration::from_secs(0)).unwrap();
        assert!(store.load(&id).unwrap_err().is_validation());
    }

    #[test]
    fn memory_store_rejects_malformed_id() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("not-a-valid-id").is_err());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        let id = store.save(sample_state(), Duration::from_secs(3600)).unwrap();
        assert_eq!(store.load(&id).unwrap(), sample_state());
        store.delete(&id).unwrap();
        assert!(store.load(&id).is_err());
    }

    #[test]
    fn file_store_treats_corrupt_file_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        let id = "a".repeat(32);
        fs::write(dir.path().join(format!("{id}.json")), b"not json").unwrap();
        assert!(store.load(&id).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn blocking_adapter_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = BlockingStoreAdapter::new(FileCheckpointStore::new(dir.path()).unwrap());
        let id = adapter.save(sample_state(), Duration::from_secs(3600)).await.unwrap();
        assert_eq!(adapter.load(&id).await.unwrap(), sample_state());
        adapter.delete(&id).await.unwrap();
        assert!(adapter.load(&id).await.is_err());
    }
}
