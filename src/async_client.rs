//! Cooperative-scheduler facade: the async mirror of [`crate::client::BojClient`]
//! with identical external semantics (§9's equivalence invariant) — same
//! close-guard placement, same default-to-memory-store checkpoint
//! resolution, same delegated operation set, driven over [`AsyncTransport`]
//! instead of [`crate::transport::SyncTransport`].

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::checkpoint::{AsyncCheckpointManager, AsyncCheckpointStore, BlockingStoreAdapter, MemoryCheckpointStore};
use crate::config::Config;
use crate::error::BojApiError;
use crate::model::{DataCodeQuery, DataCodeResponse, DataLayerQuery, DataLayerResponse, MetadataQuery, MetadataResponse};
use crate::orchestrator::AsyncOrchestrator;
use crate::retry::RetryPolicy;
use crate::telemetry::{BojObserver, NoopObserver};
use crate::transport::AsyncTransport;

fn build_retry(config: &Config) -> Result<RetryPolicy, BojApiError> {
    let builder = RetryPolicy::builder()
        .max_attempts(config.retry.max_attempts)
        .map_err(|err| BojApiError::validation(err.to_string()))?
        .max_backoff(config.retry.max_backoff)
        .total_retry_budget(config.retry.total_retry_budget);
    Ok(builder.build())
}

/// Resumable, partial-tolerant client over an async transport.
pub struct AsyncBojClient {
    transport: AsyncTransport,
    checkpoint: Option<AsyncCheckpointManager>,
    enable_layer_auto_partition: bool,
    observer: Arc<dyn BojObserver>,
    closed: AtomicBool,
}

impl AsyncBojClient {
    pub fn new(config: Config) -> Result<Self, BojApiError> {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    pub fn with_observer(config: Config, observer: Arc<dyn BojObserver>) -> Result<Self, BojApiError> {
        Self::build(config, observer, None)
    }

    /// Construct with an explicit async checkpoint store backend. A
    /// blocking store (e.g. [`crate::checkpoint::FileCheckpointStore`]) must
    /// be wrapped in [`BlockingStoreAdapter`] first so its I/O runs on a
    /// worker thread instead of the reactor.
    pub fn with_checkpoint_store(
        config: Config,
        observer: Arc<dyn BojObserver>,
        store: impl AsyncCheckpointStore + 'static,
    ) -> Result<Self, BojApiError> {
        Self::build(config, observer, Some(Box::new(store)))
    }

    fn build(
        config: Config,
        observer: Arc<dyn BojObserver>,
        store: Option<Box<dyn AsyncCheckpointStore>>,
    ) -> Result<Self, BojApiError> {
        let retry = build_retry(&config)?;
        let transport = AsyncTransport::new(&config, retry, observer.clone())?;
        let checkpoint = if config.checkpoint.enabled {
            let snapshot = config.snapshot();
            let ttl = config.checkpoint.ttl;
            Some(match store {
                Some(store) => AsyncCheckpointManager::new_boxed(store, snapshot, ttl),
                None => AsyncCheckpointManager::new(BlockingStoreAdapter::new(MemoryCheckpointStore::new()), snapshot, ttl),
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

    /// Idempotent. After closing, every delegated call and in-flight stream
    /// step fails with [`BojApiError::ClientClosed`].
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

    fn orchestrator(&self) -> AsyncOrchestrator<'_> {
        AsyncOrchestrator::new(&self.transport, self.checkpoint.as_ref(), self.enable_layer_auto_partition, self.observer.as_ref())
    }

    pub async fn get_data_code(
        &self,
        query: DataCodeQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataCodeResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_data_code(query, checkpoint_id).await
    }

    pub fn iter_data_code(
        &self,
        query: DataCodeQuery,
    ) -> Result<impl Stream<Item = Result<DataCodeResponse, BojApiError>> + '_, BojApiError> {
        self.check_open()?;
        let inner = self.orchestrator().iter_data_code(query)?;
        Ok(ClosedGuardStream { inner: Box::pin(inner), client: self })
    }

    pub async fn get_data_layer(
        &self,
        query: DataLayerQuery,
        checkpoint_id: Option<&str>,
    ) -> Result<DataLayerResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_data_layer(query, checkpoint_id).await
    }

    pub fn iter_data_layer(
        &self,
        query: DataLayerQuery,
    ) -> Result<impl Stream<Item = Result<DataLayerResponse, BojApiError>> + '_, BojApiError> {
        self.check_open()?;
        let inner = self.orchestrator().iter_data_layer(query)?;
        Ok(ClosedGuardStream { inner: Box::pin(inner), client: self })
    }

    pub async fn get_metadata(&self, query: MetadataQuery) -> Result<MetadataResponse, BojApiError> {
        self.check_open()?;
        self.orchestrator().get_metadata(query).await
    }
}

/// Wraps an orchestrator page stream with the facade's close guard, checked
/// before every poll and again after a page is produced. `Pin<Box<dyn
/// Stream>>` is itself `Unpin`, so this wrapper is too, and `poll_next` can
/// project straight through without a manual pin-projection.
struct ClosedGuardStream<'a, T> {
    inner: Pin<Box<dyn Stream<Item = Result<T, BojApiError>> + 'a>>,
    client: &'a AsyncBojClient,
}

impl<'a, T> Stream for ClosedGuardStream<'a, T> {
    type Item = Result<T, BojApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.client.is_closed() {
            return Poll::Ready(Some(Err(BojApiError::ClientClosed)));
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(item)) => {
                if this.client.is_closed() {
                    Poll::Ready(Some(Err(BojApiError::ClientClosed)))
                } else {
                    Poll::Ready(Some(item))
                }
            }
            other => other,
        }
    }
}
