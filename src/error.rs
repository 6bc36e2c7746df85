//! Error taxonomy for the BOJ stat-search client.

use std::fmt;

use crate::model::{DataCodeResponse, DataLayerResponse};

/// Why a `PartialResult` or transient server error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The underlying HTTP/socket call failed.
    Network,
    /// The server reported (or is inferred to have) a transient failure.
    ServerTransient,
    /// A validation failure terminated the in-progress accumulation.
    Validation,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Network => write!(f, "network"),
            FailureCause::ServerTransient => write!(f, "server_transient"),
            FailureCause::Validation => write!(f, "validation"),
        }
    }
}

/// The best-effort response assembled before a `PartialResult` failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialOutcome {
    DataCode(DataCodeResponse),
    DataLayer(DataLayerResponse),
}

/// Unified error type for the BOJ client.
///
/// Every variant carries the optional body `status`, `message_id`, and
/// `http_status` that produced it, mirroring the response envelope fields
/// that justify the classification.
#[derive(Debug, Clone, PartialEq)]
pub enum BojApiError {
    /// Network/socket/timeout failure, or use of a transport after `close()`.
    Transport { message: String, cause: FailureCause },
    /// The facade (or an in-flight iterator) was used after `close()`.
    ClientClosed,
    /// Bad input, bad body `STATUS` 400, checkpoint fingerprint mismatch,
    /// forbidden characters, malformed checkpoint id, or a local cap breach.
    Validation {
        message: String,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
    },
    /// Body `STATUS` 500, or HTTP >= 500 with no body status.
    Server {
        message: String,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
    },
    /// Body `STATUS` 503, or HTTP 503 with no body status.
    Unavailable {
        message: String,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
    },
    /// JSON shape or HTTP/body status inconsistency.
    Protocol {
        message: String,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
    },
    /// The best-effort response assembled before an unrecoverable failure,
    /// together with the cause and an optional resumable checkpoint handle.
    PartialResult {
        partial_result: Box<PartialOutcome>,
        cause: FailureCause,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
        checkpoint_id: Option<String>,
    },
}

impl BojApiError {
    pub fn transport(message: impl Into<String>, cause: FailureCause) -> Self {
        BojApiError::Transport { message: message.into(), cause }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BojApiError::Validation {
            message: message.into(),
            status: None,
            message_id: None,
            http_status: None,
        }
    }

    pub fn validation_with(
        message: impl Into<String>,
        status: Option<i64>,
        message_id: Option<String>,
        http_status: Option<u16>,
    ) -> Self {
        BojApiError::Validation { message: message.into(), status, message_id, http_status }
    }

    /// Whether this error kind is the one `can_retry` gates the transport's
    /// own retry loop on: a body `STATUS` of 500 or 503.
    pub fn is_retryable_api_status(status: Option<i64>) -> bool {
        matches!(status, Some(500) | Some(503))
    }

    /// Whether a [`Validation`](Self::Validation) error's message names the
    /// server's aggregate series-count ceiling, the trigger for falling back
    /// to the metadata-driven auto-partition path.
    pub fn should_use_auto_partition(&self) -> bool {
        matches!(self, BojApiError::Validation { message, .. } if message.contains("1,250"))
    }

    pub fn status(&self) -> Option<i64> {
        match self {
            BojApiError::Validation { status, .. }
            | BojApiError::Server { status, .. }
            | BojApiError::Unavailable { status, .. }
            | BojApiError::Protocol { status, .. }
            | BojApiError::PartialResult { status, .. } => *status,
            BojApiError::Transport { .. } | BojApiError::ClientClosed => None,
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            BojApiError::Validation { message_id, .. }
            | BojApiError::Server { message_id, .. }
            | BojApiError::Unavailable { message_id, .. }
            | BojApiError::Protocol { message_id, .. }
            | BojApiError::PartialResult { message_id, .. } => message_id.as_deref(),
            BojApiError::Transport { .. } | BojApiError::ClientClosed => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            BojApiError::Validation { http_status, .. }
            | BojApiError::Server { http_status, .. }
            | BojApiError::Unavailable { http_status, .. }
            | BojApiError::Protocol { http_status, .. }
            | BojApiError::PartialResult { http_status, .. } => *http_status,
            BojApiError::Transport { .. } | BojApiError::ClientClosed => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BojApiError::Validation { .. })
    }

    pub fn is_client_closed(&self) -> bool {
        matches!(self, BojApiError::ClientClosed)
    }

    pub fn is_partial_result(&self) -> bool {
        matches!(self, BojApiError::PartialResult { .. })
    }

    /// The cause to attach to a `PartialResult` wrapping this error, derived
    /// from its kind. `Validation` errors are never wrapped as partial (see
    /// the orchestrator), so callers should not reach this for that variant.
    pub fn as_partial_cause(&self) -> FailureCause {
        match self {
            BojApiError::Transport { cause, .. } => *cause,
            BojApiError::Server { .. } | BojApiError::Unavailable { .. } => {
                FailureCause::ServerTransient
            }
            BojApiError::Validation { .. } => FailureCause::Validation,
            BojApiError::Protocol { .. } => FailureCause::ServerTransient,
            BojApiError::ClientClosed => FailureCause::Network,
            BojApiError::PartialResult { cause, .. } => *cause,
        }
    }
}

impl fmt::Display for BojApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BojApiError::Transport { message, cause } => {
                write!(f, "transport error ({}): {}", cause, message)
            }
            BojApiError::ClientClosed => write!(f, "client is closed"),
            BojApiError::Validation { message, .. } => write!(f, "validation error: {}", message),
            BojApiError::Server { message, .. } => write!(f, "server error: {}", message),
            BojApiError::Unavailable { message, .. } => write!(f, "unavailable: {}", message),
            BojApiError::Protocol { message, .. } => write!(f, "protocol error: {}", message),
            BojApiError::PartialResult { cause, checkpoint_id, .. } => write!(
                f,
                "partial result ({}), checkpoint_id={}",
                cause,
                checkpoint_id.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

impl std::error::Error for BojApiError {}
