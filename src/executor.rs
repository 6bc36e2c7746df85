//! Strict executor: per-request validation applied immediately before a
//! wire call, as opposed to the resilient query normalization in
//! [`crate::validate`] that runs once at the start of an orchestrated call.
//!
//! A chunk handed to the executor has already been deduplicated by
//! [`crate::validate::normalize_data_code_query`]; the checks here guard
//! against the planner itself ever producing an oversized or duplicate
//! chunk, which would indicate a bug in [`crate::planner`] rather than bad
//! caller input.

use std::collections::HashSet;

use crate::error::BojApiError;

/// Maximum codes per `getDataCode` request the server accepts.
pub const MAX_CHUNK_SIZE: usize = 250;

/// Validate a single chunk immediately before it is sent: at most
/// [`MAX_CHUNK_SIZE`] codes, no duplicates.
pub fn validate_chunk(codes: &[String]) -> Result<(), BojApiError> {
    if codes.len() > MAX_CHUNK_SIZE {
        return Err(BojApiError::validation(format!(
            "code chunk of {} exceeds the {MAX_CHUNK_SIZE}-code limit",
            codes.len()
        )));
    }
    let mut seen = HashSet::with_capacity(codes.len());
    for code in codes {
        if !seen.insert(code.as_str()) {
            return Err(BojApiError::validation(format!("duplicate code '{code}' in chunk")));
        }
    }
    Ok(())
}

/// Local guardrail mirrored from the orchestrator's direct `getDataLayer`
/// path: more than this many accumulated series means the server's
/// aggregate cap was effectively hit even if it didn't say so explicitly.
pub const MAX_LAYER_SERIES: usize = 1250;

pub fn validate_layer_accumulator_size(count: usize) -> Result<(), BojApiError> {
    if count > MAX_LAYER_SERIES {
        return Err(BojApiError::validation(format!(
            "accumulated {count} series exceeds 1,250 series limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("C{i}")).collect()
    }

    #[test]
    fn chunk_at_limit_is_accepted() {
        assert!(validate_chunk(&codes(250)).is_ok());
    }

    #[test]
    fn chunk_over_limit_is_rejected() {
        assert!(validate_chunk(&codes(251)).unwrap_err().is_validation());
    }

    #[test]
    fn duplicate_code_in_chunk_is_rejected() {
        let chunk = vec!["A".to_string(), "A".to_string()];
        assert!(validate_chunk(&chunk).unwrap_err().is_validation());
    }

    #[test]
    fn layer_accumulator_over_cap_mentions_marker() {
        let err = validate_layer_accumulator_size(1251).unwrap_err();
        assert!(err.should_use_auto_partition());
    }

    #[test]
    fn layer_accumulator_at_cap_is_accepted() {
        assert!(validate_layer_accumulator_size(1250).is_ok());
    }
}
