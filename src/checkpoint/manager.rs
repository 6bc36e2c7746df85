//! Typed gateway in front of a [`CheckpointStore`]/[`AsyncCheckpointStore`]:
//! callers never see a bare [`CheckpointState`], only the state shape for
//! the operation they're resuming, with the query/config fingerprint check
//! already applied.

use std::time::Duration;

use crate::checkpoint::codec::check_fingerprint;
use crate::checkpoint::state::CheckpointState;
use crate::checkpoint::store::{AsyncCheckpointStore, CheckpointStore};
use crate::error::BojApiError;
use crate::model::{
    ConfigSnapshot, DataCodeCheckpointState, DataCodeQuery, DataLayerAutoPartitionCheckpointState,
    DataLayerDirectCheckpointState, DataLayerQuery,
};

fn wrong_kind() -> BojApiError {
    BojApiError::validation("checkpoint id refers to a different operation kind")
}

/// Which `get_data_layer` sub-path a resumed checkpoint belongs to, decoded
/// in one load rather than requiring the caller to guess and retry against
/// both typed loaders.
pub enum DataLayerResume {
    Direct(DataLayerDirectCheckpointState),
    AutoPartition(DataLayerAutoPartitionCheckpointState),
}

/// Checkpoint gateway for blocking callers. Holds its store as a trait
/// object so the facade can stay a concrete, non-generic type regardless of
/// which [`CheckpointStore`] backend is configured.
pub struct CheckpointManager {
    store: Box<dyn CheckpointStore>,
    config_snapshot: ConfigSnapshot,
    ttl: Duration,
}

impl CheckpointManager {
    pub fn new(store: impl CheckpointStore + 'static, config_snapshot: ConfigSnapshot, ttl: Duration) -> Self {
        Self { store: Box::new(store), config_snapshot, ttl }
    }

    /// Same as [`CheckpointManager::new`] but accepts an already-boxed
    /// store, for callers (the facade) that accept a store as a trait
    /// object rather than a concrete generic type.
    pub fn new_boxed(store: Box<dyn CheckpointStore>, config_snapshot: ConfigSnapshot, ttl: Duration) -> Self {
        Self { store, config_snapshot, ttl }
    }

    pub fn save_data_code(&self, state: DataCodeCheckpointState) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataCode(state), self.ttl)
    }

    pub fn load_data_code(&self, id: &str, query: &DataCodeQuery) -> Result<DataCodeCheckpointState, BojApiError> {
        match self.store.load(id)? {
            CheckpointState::DataCode(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    pub fn save_data_layer_direct(&self, state: DataLayerDirectCheckpointState) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataLayerDirect(state), self.ttl)
    }

    pub fn load_data_layer_direct(
        &self,
        id: &str,
        query: &DataLayerQuery,
    ) -> Result<DataLayerDirectCheckpointState, BojApiError> {
        match self.store.load(id)? {
            CheckpointState::DataLayerDirect(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    pub fn save_data_layer_auto_partition(
        &self,
        state: DataLayerAutoPartitionCheckpointState,
    ) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataLayerAutoPartition(state), self.ttl)
    }

    pub fn load_data_layer_auto_partition(
        &self,
        id: &str,
        query: &DataLayerQuery,
    ) -> Result<DataLayerAutoPartitionCheckpointState, BojApiError> {
        match self.store.load(id)? {
            CheckpointState::DataLayerAutoPartition(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    /// Load a layer checkpoint without knowing its sub-path ahead of time.
    pub fn load_data_layer(&self, id: &str, query: &DataLayerQuery) -> Result<DataLayerResume, BojApiError> {
        match self.store.load(id)? {
            CheckpointState::DataLayerDirect(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(DataLayerResume::Direct(state))
            }
            CheckpointState::DataLayerAutoPartition(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(DataLayerResume::AutoPartition(state))
            }
            CheckpointState::DataCode(_) => Err(wrong_kind()),
        }
    }

    pub fn config_snapshot(&self) -> &ConfigSnapshot {
        &self.config_snapshot
    }

    /// Delete a checkpoint that is no longer needed (the call it backed
    /// succeeded, or a resume attempt's fingerprint check failed). Best
    /// effort: a missing checkpoint is not an error here.
    pub fn cleanup(&self, id: &str) {
        let _ = self.store.delete(id);
    }
}

/// Async counterpart of [`CheckpointManager`].
pub struct AsyncCheckpointManager {
    store: Box<dyn AsyncCheckpointStore>,
    config_snapshot: ConfigSnapshot,
    ttl: Duration,
}

impl AsyncCheckpointManager {
    pub fn new(store: impl AsyncCheckpointStore + 'static, config_snapshot: ConfigSnapshot, ttl: Duration) -> Self {
        Self { store: Box::new(store), config_snapshot, ttl }
    }

    /// Same as [`AsyncCheckpointManager::new`] but accepts an already-boxed
    /// store.
    pub fn new_boxed(store: Box<dyn AsyncCheckpointStore>, config_snapshot: ConfigSnapshot, ttl: Duration) -> Self {
        Self { store, config_snapshot, ttl }
    }

    pub async fn save_data_code(&self, state: DataCodeCheckpointState) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataCode(state), self.ttl).await
    }

    pub async fn load_data_code(
        &self,
        id: &str,
        query: &DataCodeQuery,
    ) -> Result<DataCodeCheckpointState, BojApiError> {
        match self.store.load(id).await? {
            CheckpointState::DataCode(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    pub async fn save_data_layer_direct(&self, state: DataLayerDirectCheckpointState) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataLayerDirect(state), self.ttl).await
    }

    pub async fn load_data_layer_direct(
        &self,
        id: &str,
        query: &DataLayerQuery,
    ) -> Result<DataLayerDirectCheckpointState, BojApiError> {
        match self.store.load(id).await? {
            CheckpointState::DataLayerDirect(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    pub async fn save_data_layer_auto_partition(
        &self,
        state: DataLayerAutoPartitionCheckpointState,
    ) -> Result<String, BojApiError> {
        self.store.save(CheckpointState::DataLayerAutoPartition(state), self.ttl).await
    }

    pub async fn load_data_layer_auto_partition(
        &self,
        id: &str,
        query: &DataLayerQuery,
    ) -> Result<DataLayerAutoPartitionCheckpointState, BojApiError> {
        match self.store.load(id).await? {
            CheckpointState::DataLayerAutoPartition(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(state)
            }
            _ => Err(wrong_kind()),
        }
    }

    pub async fn load_data_layer(&self, id: &str, query: &DataLayerQuery) -> Result<DataLayerResume, BojApiError> {
        match self.store.load(id).await? {
            CheckpointState::DataLayerDirect(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(DataLayerResume::Direct(state))
            }
            CheckpointState::DataLayerAutoPartition(state) => {
                check_fingerprint(&state.query, query, &state.config_snapshot, &self.config_snapshot)?;
                Ok(DataLayerResume::AutoPartition(state))
            }
            CheckpointState::DataCode(_) => Err(wrong_kind()),
        }
    }

    pub fn config_snapshot(&self) -> &ConfigSnapshot {
        &self.config_snapshot
    }

    pub async fn cleanup(&self, id: &str) {
        let _ = self.store.delete(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::store::MemoryCheckpointStore;
    use std::collections::HashMap;

    fn config_snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            max_attempts: 3,
            max_backoff_seconds: 30.0,
            total_retry_budget_seconds: 60.0,
            min_wait_interval_seconds: 1.0,
            enable_layer_auto_partition: true,
            checkpoint_enabled: true,
            checkpoint_ttl_seconds: 3600,
        }
    }

    #[test]
    fn resume_with_matching_query_succeeds() {
        let manager = CheckpointManager::new(MemoryCheckpointStore::new(), config_snapshot(), Duration::from_secs(3600));
        let query = DataCodeQuery::new("DB", vec!["A".into()]);
        let id = manager
            .save_data_code(DataCodeCheckpointState {
                query: query.clone(),
                config_snapshot: config_snapshot(),
                by_code: HashMap::new(),
                last_envelope: None,
                chunk_index: 1,
                start_position: 1,
            })
            .unwrap();
        assert!(manager.load_data_code(&id, &query).is_ok());
    }

    #[test]
    fn resume_with_changed_query_is_rejected() {
        let manager = CheckpointManager::new(MemoryCheckpointStore::new(), config_snapshot(), Duration::from_secs(3600));
        let saved_query = DataCodeQuery::new("DB", vec!["A".into()]);
        let id = manager
            .save_data_code(DataCodeCheckpointState {
                query: saved_query,
                config_snapshot: config_snapshot(),
                by_code: HashMap::new(),
                last_envelope: None,
                chunk_index: 1,
                start_position: 1,
            })
            .unwrap();
        let different_query = DataCodeQuery::new("DB", vec!["B".into()]);
        assert!(manager.load_data_code(&id, &different_query).unwrap_err().is_validation());
    }

    #[test]
    fn resume_with_changed_config_is_rejected() {
        let manager = CheckpointManager::new(MemoryCheckpointStore::new(), config_snapshot(), Duration::from_secs(3600));
        let query = DataCodeQuery::new("DB", vec!["A".into()]);
        let mut stale_config = config_snapshot();
        stale_config.max_attempts = 10;
        let id = manager
            .save_data_code(DataCodeCheckpointState {
                query: query.clone(),
                config_snapshot: stale_config,
                by_code: HashMap::new(),
                last_envelope: None,
                chunk_index: 1,
                start_position: 1,
            })
            .unwrap();
        assert!(manager.load_data_code(&id, &query).unwrap_err().is_validation());
    }

    #[test]
    fn loading_wrong_kind_is_rejected() {
        let manager = CheckpointManager::new(MemoryCheckpointStore::new(), config_snapshot(), Duration::from_secs(3600));
        let query = DataCodeQuery::new("DB", vec!["A".into()]);
        let id = manager
            .save_data_code(DataCodeCheckpointState {
                query: query.clone(),
                config_snapshot: config_snapshot(),
                by_code: HashMap::new(),
                last_envelope: None,
                chunk_index: 1,
                start_position: 1,
            })
            .unwrap();
        let layer_query = DataLayerQuery {
            db: "DB".into(),
            frequency: "M".into(),
            lang: "JP".into(),
            layer1: "A".into(),
            layer2: None,
            layer3: None,
            layer4: None,
            layer5: None,
            start_date: None,
            end_date: None,
            start_position: None,
        };
        assert!(manager.load_data_layer_direct(&id, &layer_query).is_err());
    }
}
