//! Error body conventions returned by backend functions.
//!
//! Two shapes coexist:
//!
//! - `{"error": {"code": "...", "message": "..."}}` (structured, preferred)
//! - `{"error": "..."}` or `{"message": "..."}` (legacy, still supported)

use serde::Deserialize;
use serde_json::Value;

/// Error details extracted from a non-success response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerError {
    /// Machine code, only present in the structured shape
    pub code: Option<String>,
    /// Human-readable message, if the server sent one
    pub message: Option<String>,
    /// True when the body used one of the legacy shapes
    pub legacy: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured { error: StructuredError },
    LegacyError { error: String },
    LegacyMessage { message: String },
}

#[derive(Deserialize)]
struct StructuredError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ServerError {
    /// Extracts error details from a parsed response body.
    ///
    /// Returns `None` when the body matches neither convention.
    ///
    /// # Example
    ///
    /// ```
    /// use fncall_common::protocol::ServerError;
    /// use serde_json::json;
    ///
    /// let err = ServerError::from_body(&json!({"error": {"code": "GENERATION_FAILED"}})).unwrap();
    /// assert_eq!(err.code.as_deref(), Some("GENERATION_FAILED"));
    ///
    /// let legacy = ServerError::from_body(&json!({"error": "quota exceeded"})).unwrap();
    /// assert!(legacy.legacy);
    /// ```
    pub fn from_body(body: &Value) -> Option<Self> {
        match ErrorBody::deserialize(body).ok()? {
            ErrorBody::Structured { error } => Some(Self {
                code: error.code.filter(|c| !c.is_empty()),
                message: error.message.filter(|m| !m.is_empty()),
                legacy: false,
            }),
            ErrorBody::LegacyError { error: message }
            | ErrorBody::LegacyMessage { message } => Some(Self {
                code: None,
                message: Some(message).filter(|m| !m.is_empty()),
                legacy: true,
            }),
        }
    }
}
