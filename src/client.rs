//! Blocking facade: owns the transport and (optionally) a checkpoint
//! manager, and guards every delegated call and iterator step behind an
//! idempotent close flag.
//!
//! The close-check happens both before a call/step is dispatched and after
//! it returns a value, so a consumer racing `close()` against an in-flight
//! iterator can never observe a page yielded after close — it either sees
//! the page that was already in flight, or `ClientClosedError`, never both
//! silently mixed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::checkpoint::{CheckpointManager, CheckpointStore, MemoryCheckpointStore};
use crate::config::Config;
use crate::error::BojApiError;
use crate::model::{DataCodeQuery, DataCodeResponse, DataLayerQuery, DataLayerResponse, MetadataQuery, MetadataResponse};
use crate::orchestrator::Orchestrator;
use crate::retry::RetryPolicy;
use crate::telemetry::{BojObserver, NoopObserver};
use crate::transport::SyncTransport;

fn build_retry(config: &Config) -> Result<RetryPolicy, BojApiError> {
    let builder = RetryPolicy::builder()
        .max_attempts(config.retry.max_attempts)
        .map_err(|err| BojApiError::validation(err.to_string()))?
        .max_backoff(config.retry.max_backoff)
        .total_retry_budget(config.retry.total_retry_budget);
    Ok(builder.build())
}

/// Resumable, partial-tolerant client over a blocking transport.
pub struct BojClient {
    transport: SyncTransport,
    checkpoint: Option<CheckpointManager>,
    enable_layer_auto_partition: bool,
    observer: Arc<dyn BojObserver>,
    closed: AtomicBool,
}

impl BojClient {
    /// Construct with the default no-op observer and, if checkpointing is
    /// enabled, an in-memory checkpoint store — mirroring the original's
    /// `resolve_checkpoint_store` default.
    pub fn new(config: Config) -> Result<Self, BojApiError> {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    pub fn with_observer(config: Config, observer: Arc<dyn BojObserver>) -> Result<Self, BojApiError> {
        Self::build(config, observer, None)
    }

    /// Construct with an explicit checkpoint store backend (e.g. a
    /// [`crate::checkpoint::FileCheckpointStore`] for cross-process
    /// resumption). Ignored if `config.checkpoint.enabled` is `false`.
    pub fn with_checkpoint_store(
        config: Config,
        observer: Arc<dyn BojObserver>,
        store: impl CheckpointStore + 'static,
    ) -> Result<Self, BojApiError> {
        Self::build(config, observer, Some(Box::new(store)))
    }

    fn build(
        config: Config,
        observer: Arc<dyn BojObserver>,
        store: Option<Box<dyn CheckpointStore>>,
    ) -> Result<Self, BojApiError> {
        let retry = build_retry(&config)?;
        let transport = SyncTransport::new(&config, retry, observer.clone())?;
        let checkpoint = if config.checkpoint.enabled {
            let snapshot = config.snapshot();
            let ttl = config.checkpoint.ttl;
            Some(match store {
                Some(store) => CheckpointManager::new_boxed(store, snapshot, ttl),
                None => CheckpointManager::new(MemoryCheckpointStore::new(), snapshot, ttl),
            })
        } else {
            None
        };
        Ok(Self {
            transport,
            checkpoint,
            enable_layer_auto_partition: config.timeseries.enable_layer_auto_partition,
            observer,
            closed: AtomicBool::new(false),
        })
    }

    /// Idempotent. After closing, every delegated call and in-flight
    /// iterator step fails with [`BojApiError::ClientClosed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), BojApiError> {
        if self.is_closed() {
            Err(BojApiError::ClientClosed)
        } else {
            Ok(())
        }
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(&self.transport, self.checkpoint.as_ref(), self.enable_layer_auto_partition, self.observer.as_ref())
    }

    pub fn get_data_code(
        &self,
        query: DataCodeQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataCodeResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_data_code(query, checkpoint_id)
    }

    pub fn iter_data_code(
        &self,
        query: DataCodeQuery,
    ) -> Result<impl Iterator<Item = Result<DataCodeResponse, BojApiError>> + '_, BojApiError> {
        self.check_open()?;
        let inner = self.orchestrator().iter_data_code(query)?;
        Ok(ClosedGuardIter { inner, client: self })
    }

    pub fn get_data_layer(
        &self,
        query: DataLayerQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataLayerResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_data_layer(query, checkpoint_id)
    }

    pub fn iter_data_layer(
        &self,
        query: DataLayerQuery,
    ) -> Result<impl Iterator<Item = Result<DataLayerResponse, BojApiError>> + '_, BojApiError> {
        self.check_open()?;
        let inner = self.orchestrator().iter_data_layer(query)?;
        Ok(ClosedGuardIter { inner, client: self })
    }

    pub fn get_metadata(&self, query: MetadataQuery) -> Result<MetadataResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_metadata(query)
    }
}

/// Wraps an orchestrator page iterator with the facade's close guard:
/// checked before every `next()` call and again after a page is produced,
/// so a `close()` racing mid-iteration is observed at the very next step
/// rather than letting one more page slip through.
struct ClosedGuardIter<'a, I> {
    inner: I,
    client: &'a BojClient,
}

impl<'a, I, T> Iterator for ClosedGuardIter<'a, I>
where
    I: Iterator<Item = Result<T, BojApiError>>,
{
    type Item = Result<T, BojApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.client.is_closed() {
            return Some(Err(BojApiError::ClientClosed));
        }
        let item = self.inner.next()?;
        if self.client.is_closed() {
            return Some(Err(BojApiError::ClientClosed));
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::builder("https://example.test").build().unwrap()
    }

    #[test]
    fn close_is_idempotent_and_rejects_further_calls() {
        let client = BojClient::new(config()).unwrap();
        client.close();
        client.close();
        let err = client.get_metadata(MetadataQuery::new("DB")).unwrap_err();
        assert!(err.is_client_closed());
    }

    #[test]
    fn iterator_observes_close_before_first_step() {
        let client = BojClient::new(config()).unwrap();
        let mut iter = client.iter_data_code(DataCodeQuery::new("DB", vec!["A".into()])).unwrap();
        client.close();
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_client_closed());
    }

    #[test]
    fn checkpoint_support_is_off_by_default() {
        let client = BojClient::new(config()).unwrap();
        let err = client
            .get_data_code(DataCodeQuery::new("DB", vec!["A".into()]), Some(&"a".repeat(32)))
            .unwrap_err();
        assert!(err.is_validation());
    }
}
