use bytes::Bytes;
use fncall_common::protocol::{ApiError, Result};
use fncall_common::{AuthMode, InvokeOptions};
use serde::Serialize;

/// One logical call to a backend function.
///
/// The body is serialized once, on construction, so every attempt of the
/// invocation sends the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    function_name: String,
    body: Bytes,
    auth_mode: AuthMode,
    options: Option<InvokeOptions>,
}

impl InvocationRequest {
    /// Creates an anonymous request with the client's default options.
    ///
    /// Fails when `function_name` is empty or `body` cannot be serialized.
    ///
    /// # Example
    ///
    /// ```
    /// use fncall_client::InvocationRequest;
    /// use fncall_common::AuthMode;
    /// use serde_json::json;
    ///
    /// let request = InvocationRequest::new("rag-search", &json!({"query": "x"}))
    ///     .unwrap()
    ///     .with_auth_mode(AuthMode::Session);
    /// assert_eq!(request.function_name(), "rag-search");
    /// assert_eq!(&request.body()[..], br#"{"query":"x"}"#);
    /// ```
    pub fn new<B>(function_name: impl Into<String>, body: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let function_name = function_name.into();
        if function_name.trim().is_empty() {
            return Err(ApiError::invalid_request("function name must not be empty"));
        }

        let body = serde_json::to_vec(body).map_err(ApiError::invalid_request)?;

        Ok(Self {
            function_name,
            body: Bytes::from(body),
            auth_mode: AuthMode::Anonymous,
            options: None,
        })
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Overrides the client's default retry and timeout options.
    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn options(&self) -> Option<InvokeOptions> {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fncall_common::ErrorKind;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_request_defaults() {
        let request = InvocationRequest::new("process-source", &json!({"id": 7})).unwrap();
        assert_eq!(request.auth_mode(), AuthMode::Anonymous);
        assert!(request.options().is_none());
        assert_eq!(&request.body()[..], br#"{"id":7}"#);
    }

    #[test]
    fn test_request_with_options() {
        let options = InvokeOptions::new(2, Duration::from_millis(50));
        let request = InvocationRequest::new("process-source", &json!({}))
            .unwrap()
            .with_options(options)
            .with_auth_mode(AuthMode::Session);
        assert_eq!(request.options(), Some(options));
        assert_eq!(request.auth_mode(), AuthMode::Session);
    }

    #[test]
    fn test_empty_function_name_rejected() {
        for name in ["", "   "] {
            let err = InvocationRequest::new(name, &json!({})).unwrap_err();
            assert_eq!(err.code, ErrorKind::Unknown);
            assert!(!err.retryable);
        }
    }

    #[test]
    fn test_unserializable_body_rejected() {
        // JSON object keys must be strings
        let mut body = HashMap::new();
        body.insert(vec![1u8], "value");
        let err = InvocationRequest::new("export-user-data", &body).unwrap_err();
        assert!(err.message.starts_with("Invalid request"));
    }
}
