//! HTTP status × body `STATUS` classification.

use crate::error::BojApiError;
use crate::model::ApiEnvelope;

/// Map a response envelope and HTTP status to an error, or `None` on
/// success. Implements the precedence table: body `STATUS` takes
/// precedence when present, then HTTP status bands are consulted.
pub fn classify_api_error(
    envelope: Option<&ApiEnvelope>,
    http_status: Option<u16>,
) -> Option<BojApiError> {
    let status = envelope.and_then(|e| e.status);
    let message_id = envelope.and_then(|e| e.message_id.clone());
    let message =
        envelope.and_then(|e| e.message.clone()).unwrap_or_else(|| "BOJ API request failed".into());

    if status == Some(200) && http_status == Some(200) {
        return None;
    }

    match status {
        Some(400) => {
            return Some(BojApiError::validation_with(message, status, message_id, http_status))
        }
        Some(500) => {
            return Some(BojApiError::Server { message, status, message_id, http_status })
        }
        Some(503) => {
            return Some(BojApiError::Unavailable { message, status, message_id, http_status })
        }
        _ => {}
    }

    if status == Some(200) {
        if let Some(code) = http_status {
            if code >= 400 {
                return Some(BojApiError::Protocol {
                    message: "HTTP status and body STATUS are inconsistent".into(),
                    status,
                    message_id,
                    http_status,
                });
            }
        }
    }

    if status.is_none() {
        return Some(match http_status {
            None => BojApiError::Protocol {
                message: "Missing both HTTP and body status".into(),
                status,
                message_id,
                http_status,
            },
            Some(503) => BojApiError::Unavailable { message, status, message_id, http_status },
            Some(code) if code >= 500 => {
                BojApiError::Server { message, status, message_id, http_status }
            }
            Some(code) if code >= 400 => {
                BojApiError::validation_with(message, status, message_id, http_status)
            }
            Some(_) => BojApiError::Protocol {
                message: "body STATUS is missing in successful HTTP response".into(),
                status,
                message_id,
                http_status,
            },
        });
    }

    Some(BojApiError::Protocol {
        message: "Unknown STATUS in BOJ response".into(),
        status,
        message_id,
        http_status,
    })
}
