//! Checkpoint state variants: the typed payload a checkpoint record carries.
//!
//! These are tagged unions (by `kind`, and `path` for the data-layer split)
//! expressed as plain Rust enums with a derived `Serialize`/`Deserialize`,
//! not as an opaque cloned blob — see the "Deep-copy-on-save" design note.

use std::collections::HashMap;

use crate::model::{ApiEnvelope, ConfigSnapshot, DataCodeQuery, DataLayerQuery, TimeSeries};

/// Resumption state for a `get_data_code` call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataCodeCheckpointState {
    pub query: DataCodeQuery,
    pub config_snapshot: ConfigSnapshot,
    pub by_code: HashMap<String, TimeSeries>,
    pub last_envelope: Option<ApiEnvelope>,
    pub chunk_index: usize,
    pub start_position: u64,
}

/// Resumption state for the direct sub-path of `get_data_layer`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataLayerDirectCheckpointState {
    pub query: DataLayerQuery,
    pub config_snapshot: ConfigSnapshot,
    pub by_code: HashMap<String, TimeSeries>,
    pub last_envelope: Option<ApiEnvelope>,
    pub start_position: u64,
    pub next_position: Option<String>,
}

/// Resumption state for the auto-partition sub-path of `get_data_layer`:
/// the selected codes plus a pointer at the inner `get_data_code`
/// checkpoint, if one was taken.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataLayerAutoPartitionCheckpointState {
    pub query: DataLayerQuery,
    pub config_snapshot: ConfigSnapshot,
    pub selected_codes: Vec<String>,
    pub data_code_checkpoint_id: Option<String>,
}

/// Discriminates which `get_data_layer` sub-path a layer checkpoint resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLayerCheckpointPath {
    Direct,
    AutoPartition,
}

/// The `kind` discriminant of a persisted checkpoint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    DataCode,
    DataLayer,
}
