//! HTTP transport: the single choke point every request passes through.
//!
//! Both the blocking and async transports apply the same policy in the
//! same order — throttle, send, classify, retry — and differ only in the
//! I/O primitive ([`reqwest::blocking::Client`] vs [`reqwest::Client`]).
//! Neither transport retries on its own initiative past what
//! [`crate::retry::RetryPolicy`] allows; callers (the orchestrator) decide
//! whether a terminal transport error becomes a `PartialResult`.

mod asynchronous;
mod sync;

pub use asynchronous::AsyncTransport;
pub use sync::SyncTransport;

use serde_json::Value;

use crate::error::{BojApiError, FailureCause};
use crate::params::WireParams;

/// One fully-classified page/response from the wire, plus its envelope.
#[derive(Debug, Clone)]
pub struct Page {
    pub body: Value,
    pub envelope: crate::model::ApiEnvelope,
    pub http_status: u16,
}

fn build_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}

fn network_error(message: impl Into<String>) -> BojApiError {
    BojApiError::transport(message, FailureCause::Network)
}

/// On a JSON parse failure there is no body `STATUS` to consult, so the
/// classification falls back to the HTTP status bands alone (the same
/// bands the classifier uses for a missing body status), defaulting to
/// `ProtocolError` outside any recognized band.
fn classify_unparseable_body(http_status: u16, detail: &str) -> BojApiError {
    let message = format!("response body is not valid JSON: {detail}");
    match http_status {
        503 => BojApiError::Unavailable { message, status: None, message_id: None, http_status: Some(http_status) },
        code if code >= 500 => {
            BojApiError::Server { message, status: None, message_id: None, http_status: Some(http_status) }
        }
        code if code >= 400 => BojApiError::validation_with(message, None, None, Some(http_status)),
        _ => BojApiError::Protocol { message, status: None, message_id: None, http_status: Some(http_status) },
    }
}

fn decode_body(body_text: &str, http_status: u16) -> Result<Page, BojApiError> {
    let body: Value = serde_json::from_str(body_text)
        .map_err(|err| classify_unparseable_body(http_status, &err.to_string()))?;
    let envelope = crate::parser::parse_envelope(&body);
    if let Some(err) = crate::status::classify_api_error(Some(&envelope), Some(http_status)) {
        return Err(err);
    }
    Ok(Page { body, envelope, http_status })
}

/// WireParams as a slice of borrowed `(&str, &str)` tuples, the shape
/// `reqwest`'s query-string encoder accepts directly.
fn as_query_pairs(params: &WireParams) -> Vec<(&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_without_double_slash() {
        assert_eq!(build_url("https://example.test/", "/getDataCode"), "https://example.test/getDataCode");
        assert_eq!(build_url("https://example.test", "getDataCode"), "https://example.test/getDataCode");
    }

    #[test]
    fn decode_body_rejects_non_json() {
        let err = decode_body("not json", 200).unwrap_err();
        assert!(matches!(err, BojApiError::Protocol { .. }));
    }

    #[test]
    fn decode_body_classifies_success() {
        let page = decode_body(r#"{"STATUS": 200, "RESULTSET": []}"#, 200).unwrap();
        assert_eq!(page.http_status, 200);
    }

    #[test]
    fn unparseable_body_falls_back_to_http_status_band() {
        assert!(matches!(decode_body("not json", 503).unwrap_err(), BojApiError::Unavailable { .. }));
        assert!(matches!(decode_body("not json", 502).unwrap_err(), BojApiError::Server { .. }));
        assert!(decode_body("not json", 404).unwrap_err().is_validation());
        assert!(matches!(decode_body("not json", 200).unwrap_err(), BojApiError::Protocol { .. }));
    }
}
