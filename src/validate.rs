//! Resilient normalization for queries (as opposed to the strict, per-
//! request validation applied just before a wire call — see
//! [`crate::executor`]).

use crate::error::BojApiError;
use crate::model::{DataCodeQuery, DataLayerQuery, MetadataQuery};

/// Characters forbidden anywhere in a series code.
const FORBIDDEN_CHARS: &[char] = &['<', '>', '"', '!', '|', '\\', ';', '\''];

/// Validate and normalize a `getDataCode` query: non-empty `db`, each code
/// stripped and checked for forbidden characters, deduplicated while
/// preserving first-seen order.
pub fn normalize_data_code_query(query: DataCodeQuery) -> Result<DataCodeQuery, BojApiError> {
    if query.db.trim().is_empty() {
        return Err(BojApiError::validation("db must not be empty"));
    }
    if query.code.is_empty() {
        return Err(BojApiError::validation("code must be a non-empty sequence"));
    }

    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::with_capacity(query.code.len());
    for raw in &query.code {
        let code = raw.trim().to_string();
        if code.is_empty() {
            return Err(BojApiError::validation("code must not be blank"));
        }
        if let Some(bad) = FORBIDDEN_CHARS.iter().find(|c| code.contains(**c)) {
            return Err(BojApiError::validation(format!(
                "code '{code}' contains forbidden character '{bad}'"
            )));
        }
        if seen.insert(code.clone()) {
            normalized.push(code);
        }
    }

    Ok(DataCodeQuery { code: normalized, ..query })
}

/// Validate a `getDataLayer` query: non-empty `db`/`frequency`/`layer1`,
/// and layers set contiguously from `layer1` (no gap between a set and an
/// unset layer).
pub fn normalize_data_layer_query(query: DataLayerQuery) -> Result<DataLayerQuery, BojApiError> {
    if query.db.trim().is_empty() {
        return Err(BojApiError::validation("db must not be empty"));
    }
    if query.frequency.trim().is_empty() {
        return Err(BojApiError::validation("frequency must not be empty"));
    }
    if query.layer1.trim().is_empty() {
        return Err(BojApiError::validation("layer1 must not be empty"));
    }

    let layers = [&query.layer2, &query.layer3, &query.layer4, &query.layer5];
    let mut saw_gap = false;
    for layer in layers {
        if layer.is_none() {
            saw_gap = true;
        } else if saw_gap {
            return Err(BojApiError::validation(
                "layers must be contiguous from layer1 (no gap between a set and an unset layer)",
            ));
        }
    }

    Ok(query)
}

pub fn normalize_metadata_query(query: MetadataQuery) -> Result<MetadataQuery, BojApiError> {
    if query.db.trim().is_empty() {
        return Err(BojApiError::validation("db must not be empty"));
    }
    Ok(query)
}

/// 32 lowercase hex characters, the only accepted checkpoint id format.
pub fn validate_checkpoint_id(id: &str) -> Result<(), BojApiError> {
    let is_valid = id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase());
    if is_valid {
        Ok(())
    } else {
        Err(BojApiError::validation(format!("checkpoint id '{id}' is not 32 lowercase hex characters")))
    }
}
