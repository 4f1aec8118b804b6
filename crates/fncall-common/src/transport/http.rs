//! HTTP transport for function calls.
//!
//! Wraps a single pooled `hyper-util` client. TLS is handled by `hyper-rustls`
//! with the webpki root store; plain `http://` URLs are accepted as well so a
//! local backend (or a test server) can be targeted directly.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::{HttpReply, Transport, TransportError};

/// hyper-based [`Transport`].
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpTransport {
    /// Creates a transport accepting both `https://` and `http://` URLs.
    pub fn new() -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(https);
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: Bytes,
    ) -> Result<HttpReply, TransportError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .body(Full::new(body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(parse_retry_after);

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        tracing::trace!(url, status, bytes = body.len(), "received response");

        Ok(HttpReply {
            status,
            retry_after,
            body,
        })
    }
}

/// Parses a `Retry-After` header given in whole seconds.
///
/// The HTTP-date form is not used by the backend and yields `None`.
///
/// # Example
///
/// ```
/// use fncall_common::transport::parse_retry_after;
/// use http::HeaderValue;
/// use std::time::Duration;
///
/// assert_eq!(parse_retry_after(&HeaderValue::from_static("7")), Some(Duration::from_secs(7)));
/// assert_eq!(parse_retry_after(&HeaderValue::from_static("soon")), None);
/// ```
pub fn parse_retry_after(value: &HeaderValue) -> Option<Duration> {
    value
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
