//! The resumable, partial-tolerant orchestrator: `get_data_code`,
//! `iter_data_code`, `get_data_layer`, `iter_data_layer`, `get_metadata`.
//!
//! [`sync`] and [`asynchronous`] are independent, hand-written I/O shells
//! over the same pure helpers defined here — the control flow (chunk loop,
//! page loop, partial-result assembly, auto-partition fallback) is
//! duplicated rather than abstracted behind an async-in-disguise trait,
//! matching the teacher's own choice to keep `Sleeper`'s sync and async
//! halves as separate concrete types rather than one generic-over-executor
//! implementation.

pub mod asynchronous;
pub mod sync;

use std::collections::HashMap;

use crate::aggregate;
use crate::error::{BojApiError, FailureCause, PartialOutcome};
use crate::model::{ApiEnvelope, TimeSeries};
use crate::planner::{self, ChunkPlan};

pub use asynchronous::AsyncOrchestrator;
pub use sync::Orchestrator;

/// Guardrail mirrored from the direct `get_data_layer` path: accumulating
/// more than this many distinct series without a recognized server error
/// means the cap was hit silently.
pub const MAX_LAYER_SERIES: usize = crate::executor::MAX_LAYER_SERIES;

pub(crate) fn chunk_plans(
    codes: &[String],
    resume_chunk_index: usize,
    resume_start_position: u64,
) -> Result<Vec<ChunkPlan>, BojApiError> {
    planner::plan_data_code_chunks(codes, crate::executor::MAX_CHUNK_SIZE, resume_chunk_index, resume_start_position)
}

/// Turn a terminal in-loop error into either a propagated `ValidationError`
/// (never wrapped), the original error (nothing collected yet), or a
/// `PartialResult` carrying whatever was collected before the failure.
pub(crate) fn data_code_partial_or_propagate(
    ordered_codes: &[String],
    by_code: &HashMap<String, TimeSeries>,
    last_envelope: Option<ApiEnvelope>,
    err: BojApiError,
    checkpoint_id: Option<String>,
) -> BojApiError {
    if err.is_validation() || by_code.is_empty() {
        return err;
    }
    let envelope = last_envelope.unwrap_or_default();
    let response = aggregate::build_data_code_response(ordered_codes, by_code, envelope);
    wrap_partial(PartialOutcome::DataCode(response), &err, checkpoint_id)
}

/// Same as [`data_code_partial_or_propagate`] for the layer-shaped
/// accumulator.
pub(crate) fn data_layer_partial_or_propagate(
    by_code: &HashMap<String, TimeSeries>,
    last_envelope: Option<ApiEnvelope>,
    next_position: Option<String>,
    err: BojApiError,
    checkpoint_id: Option<String>,
) -> BojApiError {
    if err.is_validation() || by_code.is_empty() {
        return err;
    }
    let envelope = last_envelope.unwrap_or_default();
    let response = aggregate::build_data_layer_response_from_map(by_code, envelope, next_position);
    wrap_partial(PartialOutcome::DataLayer(response), &err, checkpoint_id)
}

fn wrap_partial(partial_result: PartialOutcome, err: &BojApiError, checkpoint_id: Option<String>) -> BojApiError {
    BojApiError::PartialResult {
        partial_result: Box::new(partial_result),
        cause: err.as_partial_cause(),
        status: err.status(),
        message_id: err.message_id().map(str::to_string),
        http_status: err.http_status(),
        checkpoint_id,
    }
}

/// Whether `err` (raised wrapping an inner `get_data_code` call from the
/// layer auto-partition path) is itself a `PartialResult` worth unwrapping
/// into an outer layer-shaped one, vs. a terminal non-partial failure that
/// should propagate as-is.
pub(crate) fn as_inner_partial(err: &BojApiError) -> Option<(&PartialOutcome, FailureCause, Option<String>)> {
    match err {
        BojApiError::PartialResult { partial_result, cause, checkpoint_id, .. } => {
            Some((partial_result.as_ref(), *cause, checkpoint_id.clone()))
        }
        _ => None,
    }
}
