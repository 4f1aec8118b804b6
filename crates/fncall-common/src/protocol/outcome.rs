use serde_json::Value;
use std::time::Duration;

use super::error::{ApiError, ErrorKind};
use crate::transport::HttpReply;

/// Result of a single attempt, before any retry decision is made.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// 2xx response with a parseable JSON body
    Success(Value),
    /// Anything else
    Failure(TransportFailure),
}

/// Why an attempt did not produce a usable body.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// DNS, connect, TLS or mid-body I/O failure
    Network(String),
    /// Deadline elapsed; the in-flight request was dropped
    Timeout,
    /// Non-2xx status. `body` is `None` when it was empty or not JSON.
    Http {
        status: u16,
        body: Option<Value>,
        retry_after: Option<Duration>,
    },
    /// 2xx status whose body could not be parsed
    MalformedBody(String),
    /// The caller's cancellation token fired
    Cancelled,
}

impl AttemptOutcome {
    /// Interprets a raw HTTP reply.
    ///
    /// An empty 2xx body (e.g. `204 No Content`) is reported as JSON `null`.
    pub fn from_reply(reply: HttpReply) -> Self {
        if (200..300).contains(&reply.status) {
            if reply.body.iter().all(u8::is_ascii_whitespace) {
                return AttemptOutcome::Success(Value::Null);
            }
            return match serde_json::from_slice(&reply.body) {
                Ok(value) => AttemptOutcome::Success(value),
                Err(e) => AttemptOutcome::Failure(TransportFailure::MalformedBody(e.to_string())),
            };
        }

        AttemptOutcome::Failure(TransportFailure::Http {
            status: reply.status,
            body: serde_json::from_slice(&reply.body).ok(),
            retry_after: reply.retry_after,
        })
    }
}

/// The concrete cause behind a classification.
///
/// The backoff policy sizes its delay from this rather than from the
/// [`ErrorKind`] alone: a `500` carrying `GENERATION_FAILED` still waits
/// like a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Network,
    Timeout,
    RateLimited { retry_after: Option<Duration> },
    Server { status: u16 },
    Client { status: u16 },
    MalformedBody,
    Auth,
    Cancelled,
}

/// Classified failure of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub message: String,
    pub cause: FailureCause,
}

impl ErrorClassification {
    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.kind, self.message.clone(), self.retryable)
    }
}

impl From<ErrorClassification> for ApiError {
    fn from(classification: ErrorClassification) -> Self {
        ApiError::new(
            classification.kind,
            classification.message,
            classification.retryable,
        )
    }
}
