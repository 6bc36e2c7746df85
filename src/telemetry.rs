//! Observability events emitted during request execution, retry, and
//! checkpoint lifecycle.
//!
//! Unlike a generic policy pipeline, there is exactly one place each event
//! originates and exactly one place it needs to go: a caller-supplied
//! [`BojObserver`]. `emit` is synchronous and must not block — observers
//! that need to do I/O should queue the event and return.

use std::fmt;
use std::time::Duration;

/// Sink for [`BojEvent`]s. The default no-op observer is used when the
/// caller doesn't configure one; [`TracingObserver`] bridges events into
/// the `tracing` ecosystem the rest of the crate logs through.
pub trait BojObserver: Send + Sync {
    fn emit(&self, event: BojEvent);
}

/// Lifecycle events a client, checkpoint store, or orchestrator can report.
#[derive(Debug, Clone, PartialEq)]
pub enum BojEvent {
    /// A request is about to be sent.
    RequestStart { operation: &'static str, attempt: usize },
    /// A request failed and will be retried after `delay`.
    RequestRetry { operation: &'static str, attempt: usize, delay: Duration, reason: String },
    /// A request succeeded.
    RequestSucceeded { operation: &'static str, attempts: usize, duration: Duration },
    /// A request exhausted its retry budget but returned a partial result.
    PartialFailure { operation: &'static str, reason: String },
    /// A checkpoint was written to the configured store.
    CheckpointSaved { checkpoint_id: String, operation: &'static str },
    /// A previously-saved checkpoint was loaded and will be resumed from.
    CheckpointResumed { checkpoint_id: String, operation: &'static str },
    /// A checkpoint record failed to decode and was evicted.
    CheckpointCorrupt { checkpoint_id: String, reason: String },
    /// A direct layer fetch hit the server aggregate cap and fell back to
    /// the metadata-driven auto-partition path.
    AutoPartitionTriggered { reason: String },
}

impl fmt::Display for BojEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BojEvent::RequestStart { operation, attempt } => {
                write!(f, "request_start(op={operation}, attempt={attempt})")
            }
            BojEvent::RequestRetry { operation, attempt, delay, reason } => write!(
                f,
                "request_retry(op={operation}, attempt={attempt}, delay={delay:?}, reason={reason})"
            ),
            BojEvent::RequestSucceeded { operation, attempts, duration } => write!(
                f,
                "request_succeeded(op={operation}, attempts={attempts}, duration={duration:?})"
            ),
            BojEvent::PartialFailure { operation, reason } => {
                write!(f, "partial_failure(op={operation}, reason={reason})")
            }
            BojEvent::CheckpointSaved { checkpoint_id, operation } => {
                write!(f, "checkpoint_saved(id={checkpoint_id}, op={operation})")
            }
            BojEvent::CheckpointResumed { checkpoint_id, operation } => {
                write!(f, "checkpoint_resumed(id={checkpoint_id}, op={operation})")
            }
            BojEvent::CheckpointCorrupt { checkpoint_id, reason } => {
                write!(f, "checkpoint_corrupt(id={checkpoint_id}, reason={reason})")
            }
            BojEvent::AutoPartitionTriggered { reason } => {
                write!(f, "auto_partition_triggered(reason={reason})")
            }
        }
    }
}

/// Observer that discards every event. Used as the default when no
/// observer is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BojObserver for NoopObserver {
    fn emit(&self, _event: BojEvent) {}
}

/// Observer that forwards every event to `tracing` at a level chosen per
/// variant (errors and corruption at `warn`, everything else at `debug`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BojObserver for TracingObserver {
    fn emit(&self, event: BojEvent) {
        match &event {
            BojEvent::PartialFailure { .. } | BojEvent::CheckpointCorrupt { .. } => {
                tracing::warn!(%event, "boj api event");
            }
            BojEvent::AutoPartitionTriggered { .. } => {
                tracing::info!(%event, "boj api event");
            }
            _ => tracing::debug!(%event, "boj api event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<BojEvent>>,
    }

    impl BojObserver for RecordingObserver {
        fn emit(&self, event: BojEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn noop_observer_drops_everything() {
        let observer = NoopObserver;
        observer.emit(BojEvent::RequestStart { operation: "get_data_code", attempt: 1 });
    }

    #[test]
    fn recording_observer_collects_events() {
        let observer = RecordingObserver::default();
        observer.emit(BojEvent::RequestStart { operation: "get_data_code", attempt: 1 });
        observer.emit(BojEvent::RequestSucceeded {
            operation: "get_data_code",
            attempts: 1,
            duration: Duration::from_millis(10),
        });
        assert_eq!(observer.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn display_includes_operation_name() {
        let event = BojEvent::CheckpointSaved {
            checkpoint_id: "abc123".into(),
            operation: "get_data_layer",
        };
        assert!(event.to_string().contains("abc123"));
        assert!(event.to_string().contains("get_data_layer"));
    }
}
