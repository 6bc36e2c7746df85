//! The persisted record shape, and the fingerprint checks that decide
//! whether a saved checkpoint is still valid for a given call.
//!
//! A checkpoint is only safe to resume from if the caller's query and the
//! client's current configuration match exactly what was in effect when it
//! was saved — a changed `layer1` pattern or a doubled `max_attempts` would
//! otherwise silently resume into the wrong series set or retry budget.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::checkpoint::state::CheckpointState;
use crate::error::BojApiError;
use crate::model::ConfigSnapshot;

/// One persisted checkpoint: an opaque id, an absolute expiry, and the
/// typed resumption state. `id`/`expires_at_epoch_seconds` are metadata the
/// store owns; `state` is the caller-supplied payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckpointRecord {
    pub id: String,
    pub expires_at_epoch_seconds: u64,
    pub state: CheckpointState,
}

impl CheckpointRecord {
    pub fn is_expired_at(&self, now_epoch_seconds: u64) -> bool {
        self.expires_at_epoch_seconds <= now_epoch_seconds
    }
}

pub fn now_epoch_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

pub fn expiry_from_ttl(ttl: Duration) -> u64 {
    now_epoch_seconds().saturating_add(ttl.as_secs())
}

/// Confirm `stored` was saved for exactly this `query`/`config`; a mismatch
/// on either means the checkpoint cannot be trusted to resume this call.
pub fn check_fingerprint<Q: PartialEq>(
    stored_query: &Q,
    query: &Q,
    stored_config: &ConfigSnapshot,
    config: &ConfigSnapshot,
) -> Result<(), BojApiError> {
    if stored_query != query {
        return Err(BojApiError::validation("checkpoint query mismatch"));
    }
    if stored_config != config {
        return Err(BojApiError::validation("checkpoint config mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_from_ttl_advances_by_ttl_seconds() {
        let now = now_epoch_seconds();
        let expiry = expiry_from_ttl(Duration::from_secs(60));
        assert!(expiry >= now + 60);
    }

    #[test]
    fn fingerprint_mismatch_on_query_is_rejected() {
        let config = ConfigSnapshot {
            max_attempts: 3,
            max_backoff_seconds: 30.0,
            total_retry_budget_seconds: 60.0,
            min_wait_interval_seconds: 1.0,
            enable_layer_auto_partition: true,
            checkpoint_enabled: true,
            checkpoint_ttl_seconds: 3600,
        };
        let err = check_fingerprint(&"a", &"b", &config, &config).unwrap_err();
        assert!(err.is_validation());
    }
}
