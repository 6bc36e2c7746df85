#![forbid(unsafe_code)]

//! # boj-api-client
//!
//! A resilient client for the Bank of Japan "stat-search" time-series HTTP
//! API. Three read-only endpoints are exposed: a code-based bulk fetch
//! (`getDataCode`), a layer-filtered catalog fetch (`getDataLayer`), and a
//! database-wide metadata catalog (`getMetadata`).
//!
//! The engineering weight of this crate is not the HTTP call itself but the
//! orchestration around it: the server paginates, caps, and occasionally
//! fails mid-stream, and this client turns that into deterministic,
//! resumable, at-most-once-or-partial bulk retrieval.
//!
//! ## What's here
//!
//! - A transport with a throttle, bounded retry, and mixed HTTP/body status
//!   classification ([`transport`]).
//! - A pagination driver that walks the server's opaque `NEXTPOSITION`
//!   cursor with cycle detection and a hard guardrail ([`pagination`]).
//! - A planner that splits large code lists into request-sized chunks and
//!   falls back to a metadata-driven partition when the server's aggregate
//!   series cap is hit ([`planner`], [`selector`]).
//! - An orchestrator that merges paginated partial results into stable,
//!   ordered domain objects, checkpoints partial progress on failure, and
//!   resumes from the exact resumption point ([`orchestrator`],
//!   [`checkpoint`]).
//! - A blocking facade ([`client::BojClient`]) and an async facade
//!   ([`async_client::AsyncBojClient`]) exposing identical semantics.
//!
//! ## Quick start
//!
//! ```rust
//! use boj_api_client::{BojClient, Config, DataCodeQuery};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder("https://api.stat-search.example")
//!     .max_attempts(3)
//!     .build()?;
//! let client = BojClient::new(config)?;
//!
//! match client.get_data_code(DataCodeQuery::new("DB_NAME", vec!["IR01".into()]), None) {
//!     Ok(response) => {
//!         for series in &response.series {
//!             println!("{}: {} points", series.series_code, series.points.len());
//!         }
//!     }
//!     Err(err) if err.is_partial_result() => {
//!         // Best-effort partial response plus a resumable checkpoint id, if
//!         // checkpointing was enabled in `config`.
//!         eprintln!("partial fetch: {err}");
//!     }
//!     Err(err) => return Err(err.into()),
//! }
//! client.close();
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod async_client;
mod backoff;
mod checkpoint;
mod client;
mod clock;
mod config;
mod error;
mod executor;
mod jitter;
mod model;
mod orchestrator;
mod pagination;
mod params;
mod parser;
mod planner;
mod retry;
mod selector;
mod sleeper;
mod status;
mod telemetry;
mod throttle;
mod transport;
mod validate;

pub use async_client::AsyncBojClient;
pub use checkpoint::{
    AsyncCheckpointManager, AsyncCheckpointStore, BlockingStoreAdapter, CheckpointManager, CheckpointStore,
    DataLayerResume, FileCheckpointStore, MemoryCheckpointStore,
};
pub use client::BojClient;
pub use config::{Config, ConfigBuilder, ConfigError};
pub use error::{BojApiError, FailureCause, PartialOutcome};
pub use model::{
    ApiEnvelope, ConfigSnapshot, DataCodeCheckpointState, DataCodeQuery, DataCodeResponse,
    DataLayerAutoPartitionCheckpointState, DataLayerCheckpointPath, DataLayerDirectCheckpointState, DataLayerQuery,
    DataLayerResponse, MetadataEntry, MetadataQuery, MetadataResponse, TimeSeries, TimeSeriesPoint,
};
pub use orchestrator::{AsyncOrchestrator, Orchestrator};
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use telemetry::{BojEvent, BojObserver, NoopObserver, TracingObserver};
pub use transport::{AsyncTransport, SyncTransport};

pub mod prelude;
