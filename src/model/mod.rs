//! Domain entities, queries, and checkpoint states.
//!
//! Every type here is immutable after construction: fields are plain, and
//! mutation happens by building a new value (`merge_series_map` in
//! [`crate::aggregate`] clones/extends rather than mutating shared state).

mod checkpoint;
mod query;

pub use checkpoint::{
    CheckpointKind, DataCodeCheckpointState, DataLayerAutoPartitionCheckpointState,
    DataLayerCheckpointPath, DataLayerDirectCheckpointState,
};
pub use query::{ConfigSnapshot, DataCodeQuery, DataLayerQuery, MetadataQuery};

/// Response header mirror: the server-reported body status and message.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiEnvelope {
    /// Server-reported body status (200/400/500/503), if present.
    pub status: Option<i64>,
    pub message_id: Option<String>,
    pub message: Option<String>,
    pub date: Option<String>,
}

/// A single observation in a time series.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSeriesPoint {
    pub survey_date: String,
    pub value: Option<f64>,
}

/// A named time series with its ordered, date-unique observations.
///
/// Invariant: `points` are unique by `survey_date` and sorted ascending.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSeries {
    pub series_code: String,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    pub category: Option<String>,
    pub last_update: Option<String>,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new(series_code: impl Into<String>) -> Self {
        TimeSeries {
            series_code: series_code.into(),
            name: None,
            unit: None,
            frequency: None,
            category: None,
            last_update: None,
            points: Vec::new(),
        }
    }
}

/// A catalog entry from the `getMetadata` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct MetadataEntry {
    pub series_code: String,
    pub name_ja: Option<String>,
    pub name_en: Option<String>,
    pub unit_ja: Option<String>,
    pub unit_en: Option<String>,
    pub frequency: Option<String>,
    pub category_ja: Option<String>,
    pub category_en: Option<String>,
    pub layer1: Option<String>,
    pub layer2: Option<String>,
    pub layer3: Option<String>,
    pub layer4: Option<String>,
    pub layer5: Option<String>,
    pub start_of_series: Option<String>,
    pub end_of_series: Option<String>,
    pub last_update: Option<String>,
    pub notes_ja: Option<String>,
    pub notes_en: Option<String>,
}

impl MetadataEntry {
    /// Borrow the `layerN` field by 1-based index (1..=5).
    pub fn layer(&self, n: u8) -> Option<&str> {
        match n {
            1 => self.layer1.as_deref(),
            2 => self.layer2.as_deref(),
            3 => self.layer3.as_deref(),
            4 => self.layer4.as_deref(),
            5 => self.layer5.as_deref(),
            _ => None,
        }
    }
}

/// Response to `getDataCode`: `series` in input-code order, each code at
/// most once.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataCodeResponse {
    pub envelope: ApiEnvelope,
    pub series: Vec<TimeSeries>,
}

/// Response to `getDataLayer`: `series` sorted ascending by `series_code`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataLayerResponse {
    pub envelope: ApiEnvelope,
    pub series: Vec<TimeSeries>,
    pub next_position: Option<String>,
}

/// Response to `getMetadata`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetadataResponse {
    pub envelope: ApiEnvelope,
    pub entries: Vec<MetadataEntry>,
}
