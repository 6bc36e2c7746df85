//! The tagged union a checkpoint store actually persists: one variant per
//! resumable operation, carrying that operation's resumption state.

use crate::model::{
    CheckpointKind, DataCodeCheckpointState, DataLayerAutoPartitionCheckpointState,
    DataLayerCheckpointPath, DataLayerDirectCheckpointState,
};

/// A deep, owned snapshot of one in-flight call's resumption state.
///
/// `kind` discriminates the tag; for `DataLayer*` variants `path` further
/// distinguishes the direct fetch from the auto-partition fallback. Both
/// are recoverable from the variant itself via [`CheckpointState::kind`]
/// and [`CheckpointState::path`] without needing separately-tracked fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointState {
    DataCode(DataCodeCheckpointState),
    DataLayerDirect(DataLayerDirectCheckpointState),
    DataLayerAutoPartition(DataLayerAutoPartitionCheckpointState),
}

impl CheckpointState {
    pub fn kind(&self) -> CheckpointKind {
        match self {
            CheckpointState::DataCode(_) => CheckpointKind::DataCode,
            CheckpointState::DataLayerDirect(_) | CheckpointState::DataLayerAutoPartition(_) => {
                CheckpointKind::DataLayer
            }
        }
    }

    pub fn path(&self) -> Option<DataLayerCheckpointPath> {
        match self {
            CheckpointState::DataCode(_) => None,
            CheckpointState::DataLayerDirect(_) => Some(DataLayerCheckpointPath::Direct),
            CheckpointState::DataLayerAutoPartition(_) => Some(DataLayerCheckpointPath::AutoPartition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigSnapshot, DataCodeQuery};
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
    fn data_code_variant_reports_its_kind_and_no_path() {
        let state = CheckpointState::DataCode(DataCodeCheckpointState {
            query: DataCodeQuery::new("DB", vec!["A".into()]),
            config_snapshot: config_snapshot(),
            by_code: HashMap::new(),
            last_envelope: None,
            chunk_index: 0,
            start_position: 1,
        });
        assert_eq!(state.kind(), CheckpointKind::DataCode);
        assert_eq!(state.path(), None);
    }

    #[test]
    fn round_trips_through_json() {
        let state = CheckpointState::DataCode(DataCodeCheckpointState {
            query: DataCodeQuery::new("DB", vec!["A".into()]),
            config_snapshot: config_snapshot(),
            by_code: HashMap::new(),
            last_envelope: None,
            chunk_index: 2,
            start_position: 5,
        });
        let json = serde_json::to_string(&state).unwrap();
        let decoded: CheckpointState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, decoded);
    }
}
