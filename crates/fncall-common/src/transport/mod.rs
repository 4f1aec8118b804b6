//! fncall Transport Layer
//!
//! One JSON POST per call, no connection state visible to the caller.
//!
//! # Components
//!
//! - **[`Transport`]**: the seam the invoker sends attempts through
//! - **[`HttpTransport`]**: hyper-based implementation over HTTP/1.1 and HTTP/2,
//!   TLS via rustls
//! - **[`HttpReply`]**: status, `Retry-After` hint and raw body of one response
//!
//! # Cancellation
//!
//! Implementations must be cancel-safe: the invoker enforces its deadline by
//! dropping the `post_json` future, and dropping it must abort the request.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

pub use self::http::{parse_retry_after, HttpTransport};

/// Raw response of a single POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// Parsed `Retry-After` header, integer seconds only
    pub retry_after: Option<Duration>,
    pub body: Bytes,
}

/// Failure to obtain any HTTP response at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to build request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Failed to read response: {0}")]
    Body(String),
}

/// Sends one JSON POST request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` to `url` with `Authorization: Bearer {bearer}`.
    ///
    /// Any HTTP status counts as a reply; only failures to get a response
    /// are errors.
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: Bytes,
    ) -> Result<HttpReply, TransportError>;
}
