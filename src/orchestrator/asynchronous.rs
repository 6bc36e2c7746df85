//! Async mirror of [`crate::orchestrator::sync::Orchestrator`]. Same control
//! flow, same helpers, driven over an [`AsyncTransport`] with `.await` at
//! every wire call instead of blocking.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, Stream, StreamExt};

use crate::aggregate;
use crate::checkpoint::{AsyncCheckpointManager, DataLayerResume};
use crate::error::BojApiError;
use crate::executor;
use crate::model::{
    ApiEnvelope, DataCodeCheckpointState, DataCodeQuery, DataCodeResponse, DataLayerAutoPartitionCheckpointState,
    DataLayerDirectCheckpointState, DataLayerQuery, DataLayerResponse, MetadataQuery, MetadataResponse, TimeSeries,
};
use crate::params;
use crate::parser;
use crate::pagination::PageCursor;
use crate::planner;
use crate::selector;
use crate::telemetry::{BojEvent, BojObserver};
use crate::transport::AsyncTransport;
use crate::validate;

use super::{data_code_partial_or_propagate, data_layer_partial_or_propagate};

const GET_DATA_CODE: &str = "getDataCode";
const GET_DATA_LAYER: &str = "getDataLayer";
const GET_METADATA: &str = "getMetadata";

fn stringify_next_position(raw: &Option<serde_json::Value>) -> Option<String> {
    match raw {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Resumable, partial-tolerant orchestrator over an async transport.
///
/// Every field is a reference or `bool`, so the type is `Copy` — callers
/// (the facade) construct one per call and hand it to `iter_*` by value
/// instead of fighting a self-borrowing lifetime.
#[derive(Clone, Copy)]
pub struct AsyncOrchestrator<'a> {
    transport: &'a AsyncTransport,
    checkpoint: Option<&'a AsyncCheckpointManager>,
    enable_layer_auto_partition: bool,
    observer: &'a dyn BojObserver,
}

impl<'a> AsyncOrchestrator<'a> {
    pub fn new(
        transport: &'a AsyncTransport,
        checkpoint: Option<&'a AsyncCheckpointManager>,
        enable_layer_auto_partition: bool,
        observer: &'a dyn BojObserver,
    ) -> Self {
        Self { transport, checkpoint, enable_layer_auto_partition, observer }
    }

    pub async fn get_data_code(
        &self,
        query: DataCodeQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataCodeResponse, BojApiError> {
        let query = validate::normalize_data_code_query(query)?;

        let mut by_code: HashMap<String, TimeSeries> = HashMap::new();
        let mut last_envelope: Option<ApiEnvelope> = None;
        let mut resume_chunk_index = 0usize;
        let mut resume_start_position = 1u64;
        let mut seeded: Option<String> = None;

        if let Some(id) = checkpoint_id {
            let manager = self.require_checkpoint_manager()?;
            let state = manager.load_data_code(id, &query).await?;
            self.observer.emit(BojEvent::CheckpointResumed { checkpoint_id: id.to_string(), operation: GET_DATA_CODE });
            by_code = state.by_code;
            last_envelope = state.last_envelope;
            resume_chunk_index = state.chunk_index;
            resume_start_position = state.start_position;
            seeded = Some(id.to_string());
        }

        let plans = super::chunk_plans(&query.code, resume_chunk_index, resume_start_position)?;

        for plan in &plans {
            if let Err(err) = executor::validate_chunk(&plan.codes) {
                return Err(err);
            }
            let mut position = plan.start_position;
            let mut seen = HashSet::new();
            loop {
                let params = params::data_code_params(&query, &plan.codes, position);
                let page = match self.transport.request(GET_DATA_CODE, &params).await {
                    Ok(page) => page,
                    Err(err) => {
                        return Err(self
                            .fail_data_code(&query, &by_code, last_envelope, plan.chunk_index, position, err)
                            .await);
                    }
                };
                let series = match parser::parse_series_resultset(&page.body, &page.envelope) {
                    Ok(series) => series,
                    Err(err) => {
                        return Err(self
                            .fail_data_code(&query, &by_code, last_envelope, plan.chunk_index, position, err)
                            .await);
                    }
                };
                aggregate::merge_series_map(&mut by_code, series);
                last_envelope = Some(page.envelope.clone());

                let next_raw = parser::raw_next_position(&page.body);
                match planner::next_position_or_raise(next_raw, &mut seen, &format!("chunk {}", plan.chunk_index)) {
                    Ok(Some(next)) => position = next,
                    Ok(None) => break,
                    Err(err) => {
                        return Err(self
                            .fail_data_code(&query, &by_code, last_envelope, plan.chunk_index, position, err)
                            .await);
                    }
                }
            }
        }

        if let (Some(manager), Some(id)) = (self.checkpoint, seeded.as_deref()) {
            manager.cleanup(id).await;
        }

        Ok(aggregate::build_data_code_response(&query.code, &by_code, last_envelope.unwrap_or_default()))
    }

    async fn fail_data_code(
        &self,
        query: &DataCodeQuery,
        by_code: &HashMap<String, TimeSeries>,
        last_envelope: Option<ApiEnvelope>,
        chunk_index: usize,
        start_position: u64,
        err: BojApiError,
    ) -> BojApiError {
        if err.is_validation() {
            return err;
        }
        let checkpoint_id = if by_code.is_empty() {
            None
        } else if let Some(manager) = self.checkpoint {
            match manager
                .save_data_code(DataCodeCheckpointState {
                    query: query.clone(),
                    config_snapshot: manager.config_snapshot().clone(),
                    by_code: by_code.clone(),
                    last_envelope: last_envelope.clone(),
                    chunk_index,
                    start_position,
                })
                .await
            {
                Ok(id) => {
                    self.observer.emit(BojEvent::CheckpointSaved { checkpoint_id: id.clone(), operation: GET_DATA_CODE });
                    Some(id)
                }
                Err(_) => None,
            }
        } else {
            None
        };
        self.observer.emit(BojEvent::PartialFailure { operation: GET_DATA_CODE, reason: err.to_string() });
        data_code_partial_or_propagate(&query.code, by_code, last_envelope, err, checkpoint_id)
    }

    /// Yields one `DataCodeResponse` per HTTP page, chunks in order, pages
    /// within a chunk in cursor order. No checkpointing.
    pub fn iter_data_code(
        self,
        query: DataCodeQuery,
    ) -> Result<impl Stream<Item = Result<DataCodeResponse, BojApiError>> + 'a, BojApiError> {
        let query = validate::normalize_data_code_query(query)?;
        let plans = planner::plan_data_code_chunks(&query.code, executor::MAX_CHUNK_SIZE, 0, 1)?;
        let query = std::rc::Rc::new(query);

        let pages = stream::iter(plans).flat_map(move |plan| {
            let query = query.clone();
            let cursor = PageCursor::new(crate::pagination::DEFAULT_MAX_PAGES);
            let start_position = plan_start(&plan);
            let state = (query, plan, cursor, Some(start_position), false);
            stream::unfold(state, move |(query, plan, mut cursor, next_position, done)| async move {
                if done {
                    return None;
                }
                let position = next_position?;
                if cursor.at_limit() {
                    let err = BojApiError::Protocol {
                        message: "pagination guardrail exceeded".to_string(),
                        status: None,
                        message_id: None,
                        http_status: None,
                    };
                    return Some((Err(err), (query, plan, cursor, None, true)));
                }
                let params = params::data_code_params(&query, &plan.codes, position);
                match self.transport.request(GET_DATA_CODE, &params).await {
                    Ok(page) => {
                        let next_raw = parser::raw_next_position(&page.body);
                        match cursor.record(next_raw) {
                            Ok(next) => {
                                let done_now = next.is_none();
                                let item = parser::parse_series_resultset(&page.body, &page.envelope)
                                    .map(|series| DataCodeResponse { envelope: page.envelope, series });
                                Some((item, (query, plan, cursor, next, done_now)))
                            }
                            Err(err) => Some((Err(err), (query, plan, cursor, None, true))),
                        }
                    }
                    Err(err) => Some((Err(err), (query, plan, cursor, None, true))),
                }
            })
        });
        Ok(pages)
    }

    pub async fn get_data_layer(
        &self,
        query: DataLayerQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataLayerResponse, BojApiError> {
        let query = validate::normalize_data_layer_query(query)?;

        if let Some(id) = checkpoint_id {
            let manager = self.require_checkpoint_manager()?;
            match manager.load_data_layer(id, &query).await? {
                DataLayerResume::Direct(state) => {
                    self.observer.emit(BojEvent::CheckpointResumed { checkpoint_id: id.to_string(), operation: GET_DATA_LAYER });
                    return self.resume_direct(query, state, id.to_string()).await;
                }
                DataLayerResume::AutoPartition(state) => {
                    self.observer.emit(BojEvent::CheckpointResumed { checkpoint_id: id.to_string(), operation: GET_DATA_LAYER });
                    return self.resume_auto_partition(query, state, id.to_string()).await;
                }
            }
        }

        match self.get_data_layer_direct(&query, HashMap::new(), None, 1, None).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if self.enable_layer_auto_partition && planner::should_use_auto_partition(&err) {
                    self.observer.emit(BojEvent::AutoPartitionTriggered { reason: err.to_string() });
                    self.get_data_layer_auto_partition(query, None).await
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn resume_direct(
        &self,
        query: DataLayerQuery,
        state: DataLayerDirectCheckpointState,
        seeded: String,
    ) -> Result<DataLayerResponse, BojApiError> {
        let start_position = state.next_position.as_deref().and_then(|s| s.parse().ok()).unwrap_or(state.start_position);
        match self
            .get_data_layer_direct(&query, state.by_code, state.last_envelope, start_position, Some(seeded.clone()))
            .await
        {
            Ok(response) => {
                if let Some(manager) = self.checkpoint {
                    manager.cleanup(&seeded).await;
                }
                Ok(response)
            }
            Err(err) => {
                if self.enable_layer_auto_partition && planner::should_use_auto_partition(&err) {
                    self.observer.emit(BojEvent::AutoPartitionTriggered { reason: err.to_string() });
                    if let Some(manager) = self.checkpoint {
                        manager.cleanup(&seeded).await;
                    }
                    self.get_data_layer_auto_partition(query, None).await
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn resume_auto_partition(
        &self,
        query: DataLayerQuery,
        state: DataLayerAutoPartitionCheckpointState,
        seeded: String,
    ) -> Result<DataLayerResponse, BojApiError> {
        let result = self
            .get_data_code_for_layer(&query, state.selected_codes.clone(), state.data_code_checkpoint_id.as_deref())
            .await;
        let outcome = self.finish_auto_partition(query, state.selected_codes, result).await;
        if outcome.is_ok() {
            if let Some(manager) = self.checkpoint {
                manager.cleanup(&seeded).await;
            }
        }
        outcome
    }

    async fn get_data_layer_direct(
        &self,
        query: &DataLayerQuery,
        mut by_code: HashMap<String, TimeSeries>,
        mut last_envelope: Option<ApiEnvelope>,
        start_position: u64,
        seeded: Option<String>,
    ) -> Result<DataLayerResponse, BojApiError> {
        let mut position = start_position;
        let mut seen = HashSet::new();
        let mut last_next_position: Option<String> = None;

        loop {
            let params = params::data_layer_params(query, position);
            let page = match self.transport.request(GET_DATA_LAYER, &params).await {
                Ok(page) => page,
                Err(err) => {
                    return Err(self
                        .fail_data_layer(query, &by_code, last_envelope, last_next_position, seeded, err)
                        .await);
                }
            };
            let series = match parser::parse_series_resultset(&page.body, &page.envelope) {
                Ok(series) => series,
                Err(err) => {
                    return Err(self
                        .fail_data_layer(query, &by_code, last_envelope, last_next_position, seeded, err)
                        .await);
                }
            };
            aggregate::merge_series_map(&mut by_code, series);
            last_envelope = Some(page.envelope.clone());

            if let Err(err) = executor::validate_layer_accumulator_size(by_code.len()) {
                return Err(self.fail_data_layer(query, &by_code, last_envelope, last_next_position, seeded, err).await);
            }

            let next_raw = parser::raw_next_position(&page.body);
            last_next_position = stringify_next_position(&next_raw);
            match planner::next_position_or_raise(next_raw, &mut seen, "get_data_layer") {
                Ok(Some(next)) => position = next,
                Ok(None) => break,
                Err(err) => {
                    return Err(self
                        .fail_data_layer(query, &by_code, last_envelope, last_next_position, seeded, err)
                        .await);
                }
            }
        }

        Ok(aggregate::build_data_layer_response_from_map(&by_code, last_envelope.unwrap_or_default(), None))
    }

    async fn fail_data_layer(
        &self,
        query: &DataLayerQuery,
        by_code: &HashMap<String, TimeSeries>,
        last_envelope: Option<ApiEnvelope>,
        next_position: Option<String>,
        seeded: Option<String>,
        err: BojApiError,
    ) -> BojApiError {
        if err.is_validation() {
            return err;
        }
        let checkpoint_id = if by_code.is_empty() {
            None
        } else if let Some(manager) = self.checkpoint {
            match manager
                .save_data_layer_direct(DataLayerDirectCheckpointState {
                    query: query.clone(),
                    config_snapshot: manager.config_snapshot().clone(),
                    by_code: by_code.clone(),
                    last_envelope: last_envelope.clone(),
                    start_position: 1,
                    next_position: next_position.clone(),
                })
                .await
            {
                Ok(id) => {
                    self.observer.emit(BojEvent::CheckpointSaved { checkpoint_id: id.clone(), operation: GET_DATA_LAYER });
                    Some(id)
                }
                Err(_) => None,
            }
        } else {
            None
        };
        if let Some(seeded_id) = seeded {
            if let Some(manager) = self.checkpoint {
                manager.cleanup(&seeded_id).await;
            }
        }
        self.observer.emit(BojEvent::PartialFailure { operation: GET_DATA_LAYER, reason: err.to_string() });
        data_layer_partial_or_propagate(by_code, last_envelope, next_position, err, checkpoint_id)
    }

    async fn get_data_code_for_layer(
        &self,
        query: &DataLayerQuery,
        selected_codes: Vec<String>,
        resume_checkpoint_id: Option<&str>,
    ) -> Result<DataCodeResponse, BojApiError> {
        let inner_query = DataCodeQuery {
            db: query.db.clone(),
            code: selected_codes,
            lang: query.lang.clone(),
            start_date: query.start_date.clone(),
            end_date: query.end_date.clone(),
            start_position: None,
        };
        self.get_data_code(inner_query, resume_checkpoint_id).await
    }

    async fn get_data_layer_auto_partition(
        &self,
        query: DataLayerQuery,
        resume_checkpoint_id: Option<&str>,
    ) -> Result<DataLayerResponse, BojApiError> {
        let metadata = self.get_metadata(MetadataQuery::new(query.db.clone())).await?;
        let selected_codes = selector::select_series_codes(&metadata.entries, &query);
        if selected_codes.is_empty() {
            return Ok(DataLayerResponse { envelope: metadata.envelope, series: Vec::new(), next_position: None });
        }
        let result = self.get_data_code_for_layer(&query, selected_codes.clone(), resume_checkpoint_id).await;
        self.finish_auto_partition(query, selected_codes, result).await
    }

    async fn finish_auto_partition(
        &self,
        query: DataLayerQuery,
        selected_codes: Vec<String>,
        result: Result<DataCodeResponse, BojApiError>,
    ) -> Result<DataLayerResponse, BojApiError> {
        match result {
            Ok(response) => {
                let mut series = response.series;
                series.sort_by(|a, b| a.series_code.cmp(&b.series_code));
                Ok(DataLayerResponse { envelope: response.envelope, series, next_position: None })
            }
            Err(err) => match super::as_inner_partial(&err) {
                Some((crate::error::PartialOutcome::DataCode(inner), cause, inner_checkpoint_id)) => {
                    let mut series = inner.series.clone();
                    series.sort_by(|a, b| a.series_code.cmp(&b.series_code));
                    let checkpoint_id = if let Some(manager) = self.checkpoint {
                        manager
                            .save_data_layer_auto_partition(DataLayerAutoPartitionCheckpointState {
                                query: query.clone(),
                                config_snapshot: manager.config_snapshot().clone(),
                                selected_codes: selected_codes.clone(),
                                data_code_checkpoint_id: inner_checkpoint_id.clone(),
                            })
                            .await
                            .ok()
                    } else {
                        None
                    };
                    Err(BojApiError::PartialResult {
                        partial_result: Box::new(crate::error::PartialOutcome::DataLayer(DataLayerResponse {
                            envelope: inner.envelope.clone(),
                            series,
                            next_position: None,
                        })),
                        cause,
                        status: err.status(),
                        message_id: err.message_id().map(str::to_string),
                        http_status: err.http_status(),
                        checkpoint_id,
                    })
                }
                _ => Err(err),
            },
        }
    }

    /// Yields one `DataLayerResponse` per HTTP page in cursor order; no
    /// checkpointing. Mirrors [`AsyncOrchestrator::iter_data_code`].
    pub fn iter_data_layer(
        self,
        query: DataLayerQuery,
    ) -> Result<impl Stream<Item = Result<DataLayerResponse, BojApiError>> + 'a, BojApiError> {
        let query = validate::normalize_data_layer_query(query)?;
        let start_position = query.start_position.unwrap_or(1);
        let query = std::rc::Rc::new(query);
        let cursor = PageCursor::new(crate::pagination::DEFAULT_MAX_PAGES);
        let state = (query, cursor, Some(start_position), false);

        Ok(stream::unfold(state, move |(query, mut cursor, next_position, done)| async move {
            if done {
                return None;
            }
            let position = next_position?;
            if cursor.at_limit() {
                let err = BojApiError::Protocol {
                    message: "pagination guardrail exceeded".to_string(),
                    status: None,
                    message_id: None,
                    http_status: None,
                };
                return Some((Err(err), (query, cursor, None, true)));
            }
            let params = params::data_layer_params(&query, position);
            match self.transport.request(GET_DATA_LAYER, &params).await {
                Ok(page) => {
                    let next_raw = parser::raw_next_position(&page.body);
                    match cursor.record(next_raw.clone()) {
                        Ok(next) => {
                            let done_now = next.is_none();
                            let item = parser::parse_series_resultset(&page.body, &page.envelope).map(|series| {
                                DataLayerResponse {
                                    envelope: page.envelope,
                                    series,
                                    next_position: stringify_next_position(&next_raw),
                                }
                            });
                            Some((item, (query, cursor, next, done_now)))
                        }
                        Err(err) => Some((Err(err), (query, cursor, None, true))),
                    }
                }
                Err(err) => Some((Err(err), (query, cursor, None, true))),
            }
        }))
    }

    pub async fn get_metadata(&self, query: MetadataQuery) -> Result<MetadataResponse, BojApiError> {
        let query = validate::normalize_metadata_query(query)?;
        let params = params::metadata_params(&query);
        let page = self.transport.request(GET_METADATA, &params).await?;
        let entries = parser::parse_metadata_resultset(&page.body, &page.envelope)?;
        Ok(MetadataResponse { envelope: page.envelope, entries })
    }

    fn require_checkpoint_manager(&self) -> Result<&AsyncCheckpointManager, BojApiError> {
        self.checkpoint.ok_or_else(|| BojApiError::validation("checkpoint support is not enabled"))
    }
}

fn plan_start(plan: &crate::planner::ChunkPlan) -> u64 {
    plan.start_position
}
