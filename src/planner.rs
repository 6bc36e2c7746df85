//! Chunking, resume plans, and the auto-partition decision.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::BojApiError;
use crate::pagination::parse_next_position;

/// Split `codes` into contiguous slices of at most `chunk_size`, in input
/// order. Rejects `chunk_size == 0`.
pub fn chunk_codes(codes: &[String], chunk_size: usize) -> Result<Vec<Vec<String>>, BojApiError> {
    if chunk_size == 0 {
        return Err(BojApiError::validation("chunk_size must be > 0"));
    }
    Ok(codes.chunks(chunk_size).map(|c| c.to_vec()).collect())
}

/// One chunk of a `get_data_code` plan: its 0-based index, the codes it
/// covers, and the cursor position to resume from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_index: usize,
    pub codes: Vec<String>,
    pub start_position: u64,
}

/// Produce chunk plans for indices at or after `resume_chunk_index`. The
/// first produced plan uses `resume_start_position`; every subsequent plan
/// starts at position 1.
pub fn plan_data_code_chunks(
    codes: &[String],
    chunk_size: usize,
    resume_chunk_index: usize,
    resume_start_position: u64,
) -> Result<Vec<ChunkPlan>, BojApiError> {
    let chunks = chunk_codes(codes, chunk_size)?;
    let plans = chunks
        .into_iter()
        .enumerate()
        .filter(|(index, _)| *index >= resume_chunk_index)
        .map(|(index, codes)| ChunkPlan {
            chunk_index: index,
            codes,
            start_position: if index == resume_chunk_index { resume_start_position } else { 1 },
        })
        .collect();
    Ok(plans)
}

/// Read `NEXTPOSITION` from a page payload, rejecting a previously-seen
/// position with a `ValidationError` naming `context` (e.g. the chunk or
/// operation this loop is walking pages for). This is the orchestrator's
/// own chunk/page loop cycle guard; it is deliberately a narrower sibling
/// of [`crate::pagination::PageCursor`] (which raises `ProtocolError` and
/// additionally enforces a page-count guardrail) because the orchestrator
/// treats an in-band cursor loop as a request-shape problem the caller can
/// act on, not a protocol-level server misbehavior.
pub fn next_position_or_raise(
    next_raw: Option<Value>,
    seen: &mut HashSet<u64>,
    context: &str,
) -> Result<Option<u64>, BojApiError> {
    let next = parse_next_position(next_raw)
        .map_err(|_| BojApiError::validation(format!("invalid NEXTPOSITION during {context}")))?;
    if let Some(position) = next {
        if !seen.insert(position) {
            return Err(BojApiError::validation(format!(
                "NEXTPOSITION loop detected during {context}"
            )));
        }
    }
    Ok(next)
}

/// Whether a failed direct-layer fetch should fall back to the metadata-
/// driven auto-partition path: only for a `ValidationError` whose message
/// contains the literal server-enforced aggregate cap marker.
pub fn should_use_auto_partition(error: &BojApiError) -> bool {
    error.should_use_auto_partition()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("C{i}")).collect()
    }

    #[test]
    fn chunk_codes_splits_at_boundary() {
        let chunks = chunk_codes(&codes(251), 250).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 250);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(chunk_codes(&codes(1), 0).is_err());
    }

    #[test]
    fn plan_resumes_at_chunk_index_with_start_position() {
        let plans = plan_data_code_chunks(&codes(251), 250, 1, 7).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].chunk_index, 1);
        assert_eq!(plans[0].start_position, 7);
        assert_eq!(plans[0].codes.len(), 1);
    }

    #[test]
    fn plan_resets_subsequent_chunks_to_position_one() {
        let plans = plan_data_code_chunks(&codes(500), 250, 0, 1).unwrap();
        assert_eq!(plans[1].start_position, 1);
    }

    #[test]
    fn next_position_or_raise_detects_loop() {
        let mut seen = HashSet::new();
        next_position_or_raise(Some(json!(5)), &mut seen, "chunk 0").unwrap();
        let err = next_position_or_raise(Some(json!(5)), &mut seen, "chunk 0").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("chunk 0"));
    }

    #[test]
    fn should_use_auto_partition_checks_marker() {
        let err = BojApiError::validation("exceeds 1,250 series limit");
        assert!(should_use_auto_partition(&err));
        let err = BojApiError::validation("some other failure");
        assert!(!should_use_auto_partition(&err));
    }
}
