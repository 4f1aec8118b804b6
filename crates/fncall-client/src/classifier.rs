//! Maps a failed attempt onto the error taxonomy.
//!
//! | failure                          | kind                          | retryable |
//! |----------------------------------|-------------------------------|-----------|
//! | network                          | `NETWORK_ERROR`               | yes       |
//! | timeout                          | `TIMEOUT`                     | yes       |
//! | `429`                            | `RATE_LIMIT`                  | yes       |
//! | `5xx`                            | body code, else `UNKNOWN`     | yes       |
//! | other non-2xx                    | body code, else `UNKNOWN`     | no        |
//! | unparseable 2xx body             | `UNKNOWN`                     | no        |
//! | cancelled                        | `CANCELLED`                   | no        |

use fncall_common::protocol::{
    ErrorClassification, ErrorKind, FailureCause, ServerError, TransportFailure, GENERIC_MESSAGE,
};
use serde_json::Value;

/// Classifies a failed attempt.
///
/// Pure and deterministic: the same failure always yields the same
/// classification.
///
/// # Example
///
/// ```
/// use fncall_client::classify;
/// use fncall_common::{ErrorKind, TransportFailure};
///
/// let c = classify(&TransportFailure::Http { status: 429, body: None, retry_after: None });
/// assert_eq!(c.kind, ErrorKind::RateLimit);
/// assert!(c.retryable);
/// ```
pub fn classify(failure: &TransportFailure) -> ErrorClassification {
    match failure {
        TransportFailure::Network(_) => {
            from_table(ErrorKind::NetworkError, true, FailureCause::Network)
        }
        TransportFailure::Timeout => from_table(ErrorKind::Timeout, true, FailureCause::Timeout),
        TransportFailure::Cancelled => {
            from_table(ErrorKind::Cancelled, false, FailureCause::Cancelled)
        }
        TransportFailure::MalformedBody(_) => {
            from_table(ErrorKind::Unknown, false, FailureCause::MalformedBody)
        }
        TransportFailure::Http {
            status: 429,
            retry_after,
            ..
        } => from_table(
            ErrorKind::RateLimit,
            true,
            FailureCause::RateLimited {
                retry_after: *retry_after,
            },
        ),
        TransportFailure::Http { status, body, .. } if *status >= 500 => {
            let (kind, message) = kind_from_body(body.as_ref());
            ErrorClassification {
                kind,
                retryable: true,
                message,
                cause: FailureCause::Server { status: *status },
            }
        }
        TransportFailure::Http { status, body, .. } => {
            let (kind, message) = kind_from_body(body.as_ref());
            ErrorClassification {
                kind,
                retryable: false,
                message,
                cause: FailureCause::Client { status: *status },
            }
        }
    }
}

fn from_table(kind: ErrorKind, retryable: bool, cause: FailureCause) -> ErrorClassification {
    ErrorClassification {
        kind,
        retryable,
        message: kind.user_message().to_string(),
        cause,
    }
}

/// Recognised codes take the table message. Anything else is `UNKNOWN`,
/// keeping the server's text when it sent one.
fn kind_from_body(body: Option<&Value>) -> (ErrorKind, String) {
    let Some(server) = body.and_then(ServerError::from_body) else {
        return (ErrorKind::Unknown, GENERIC_MESSAGE.to_string());
    };

    if server.legacy {
        tracing::debug!("function returned a legacy error body");
    }

    match server.code.as_deref().and_then(ErrorKind::from_code) {
        Some(kind) if kind != ErrorKind::Unknown => (kind, kind.user_message().to_string()),
        _ => (
            ErrorKind::Unknown,
            server
                .message
                .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
        ),
    }
}
