//! Query models and the configuration fingerprint attached to checkpoints.

use std::time::Duration;

/// `getDataCode` query. Normalization (dedup-keep-order, forbidden-character
/// rejection) happens in [`crate::validate`]; this type holds the
/// already-normalized form once validation has run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DataCodeQuery {
    pub db: String,
    pub code: Vec<String>,
    pub lang: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_position: Option<u64>,
}

impl DataCodeQuery {
    pub fn new(db: impl Into<String>, code: Vec<String>) -> Self {
        DataCodeQuery {
            db: db.into(),
            code,
            lang: "JP".to_string(),
            start_date: None,
            end_date: None,
            start_position: None,
        }
    }
}

/// `getDataLayer` query. Invariant (enforced by [`crate::validate`]): layers
/// are set contiguously from `layer1` — no gap between a set and an unset
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DataLayerQuery {
    pub db: String,
    pub frequency: String,
    pub lang: String,
    pub layer1: String,
    pub layer2: Option<String>,
    pub layer3: Option<String>,
    pub layer4: Option<String>,
    pub layer5: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_position: Option<u64>,
}

impl DataLayerQuery {
    /// Layer pattern fields in 1-based order, as `(index, pattern)` pairs
    /// for every layer that is set.
    pub fn layers(&self) -> Vec<(u8, &str)> {
        let mut out = vec![(1u8, self.layer1.as_str())];
        for (n, layer) in [
            (2u8, &self.layer2),
            (3u8, &self.layer3),
            (4u8, &self.layer4),
            (5u8, &self.layer5),
        ] {
            match layer {
                Some(pattern) => out.push((n, pattern.as_str())),
                None => break,
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetadataQuery {
    pub db: String,
    pub lang: String,
}

impl MetadataQuery {
    pub fn new(db: impl Into<String>) -> Self {
        MetadataQuery { db: db.into(), lang: "JP".to_string() }
    }
}

/// The subset of configuration whose change invalidates a saved checkpoint.
///
/// Field set is exhaustive and exact per the external interface contract:
/// changing anything else about the client (e.g. `base_url`) does not
/// invalidate an in-flight checkpoint, but changing any of these does.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigSnapshot {
    pub max_attempts: usize,
    pub max_backoff_seconds: f64,
    pub total_retry_budget_seconds: f64,
    pub min_wait_interval_seconds: f64,
    pub enable_layer_auto_partition: bool,
    pub checkpoint_enabled: bool,
    pub checkpoint_ttl_seconds: u64,
}

impl ConfigSnapshot {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.checkpoint_ttl_seconds)
    }
}
