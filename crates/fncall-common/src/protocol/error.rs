// Copyright 2026 fncall Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable failure category surfaced to callers.
///
/// The set is closed: anything the classifier cannot place lands in
/// [`ErrorKind::Unknown`]. The wire form is the SCREAMING_SNAKE_CASE code the
/// backend uses in `{"error": {"code": ...}}` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The server throttled the request (HTTP 429)
    RateLimit,
    /// The request never reached the server
    NetworkError,
    /// The deadline elapsed before a response arrived
    Timeout,
    /// No valid session for an authenticated call
    AuthError,
    /// The server rejected the semantic request
    ProcessingFailed,
    /// The server failed to generate content
    GenerationFailed,
    /// The caller cancelled the invocation
    Cancelled,
    /// Anything not otherwise classified
    Unknown,
}

/// Message used when a kind has no dedicated entry or the server gave nothing better.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::RateLimit,
        ErrorKind::NetworkError,
        ErrorKind::Timeout,
        ErrorKind::AuthError,
        ErrorKind::ProcessingFailed,
        ErrorKind::GenerationFailed,
        ErrorKind::Cancelled,
        ErrorKind::Unknown,
    ];

    /// Returns the wire code for this kind.
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::AuthError => "AUTH_ERROR",
            ErrorKind::ProcessingFailed => "PROCESSING_FAILED",
            ErrorKind::GenerationFailed => "GENERATION_FAILED",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Maps a server-reported code onto a kind.
    ///
    /// Returns `None` for codes outside the closed set so the caller can
    /// decide whether to keep the server's own message.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_code() == code)
    }

    /// Returns the user-facing message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "Too many requests. Please wait a moment and try again.",
            ErrorKind::NetworkError => {
                "Network error. Please check your connection and try again."
            }
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::AuthError => "Your session has expired. Please sign in again.",
            ErrorKind::ProcessingFailed => "We couldn't process your request. Please try again.",
            ErrorKind::GenerationFailed => "Content generation failed. Please try again.",
            ErrorKind::Cancelled => "The request was cancelled.",
            ErrorKind::Unknown => GENERIC_MESSAGE,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// The only error an invocation ever returns.
///
/// `message` is meant to be rendered as-is, `code` is for programmatic
/// branching (e.g. redirect to login on [`ErrorKind::AuthError`]) and
/// `retryable` tells a UI whether a manual "Retry" makes sense.
///
/// # Example
///
/// ```
/// use fncall_common::{ApiError, ErrorKind};
///
/// let err = ApiError::from_kind(ErrorKind::AuthError, false);
/// assert_eq!(err.code, ErrorKind::AuthError);
/// assert_eq!(err.to_string(), "Your session has expired. Please sign in again.");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub code: ErrorKind,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            message: message.into(),
            code,
            retryable,
        }
    }

    /// Builds an error carrying the kind's table message.
    pub fn from_kind(code: ErrorKind, retryable: bool) -> Self {
        Self::new(code, code.user_message(), retryable)
    }

    pub fn auth() -> Self {
        Self::from_kind(ErrorKind::AuthError, false)
    }

    pub fn cancelled() -> Self {
        Self::from_kind(ErrorKind::Cancelled, false)
    }

    /// A caller-side mistake, such as an empty function name or a body that
    /// cannot be serialized. Never retryable.
    pub fn invalid_request(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Unknown,
            format!("Invalid request: {}", detail),
            false,
        )
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
