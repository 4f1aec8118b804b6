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

use bytes::Bytes;
use fncall_common::auth::{AuthCredential, AuthResolver, SessionProvider};
use fncall_common::protocol::{ApiError, AttemptOutcome, Result, TransportFailure};
use fncall_common::transport::{HttpTransport, Transport, TransportError};
use fncall_common::{AuthMode, ClientConfig, InvokeOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::classifier::classify;
use crate::request::InvocationRequest;

/// Calls backend functions with retry, timeout and cancellation.
///
/// One invoker serves both anonymous and session calls; the request's
/// [`AuthMode`] decides which credential each attempt carries.
///
/// # Attempt Loop
///
/// For attempt `n` in `1..=max_retries`:
///
/// 1. Resolve the credential. A missing session fails with `AUTH_ERROR`
///    before anything is sent.
/// 2. POST the body, racing the transport against the `timeout` deadline.
///    On expiry the in-flight request is dropped, which aborts it.
/// 3. Return the body of any 2xx response.
/// 4. Otherwise classify the failure. Non-retryable failures and the last
///    attempt's failure are returned as [`ApiError`].
/// 5. Wait the delay chosen by [`BackoffPolicy`] and go again. The
///    credential is resolved anew since a session may rotate mid-sequence.
///
/// Attempts never overlap, and the body bytes are identical on every attempt.
///
/// # Cancellation
///
/// [`Invoker::invoke_with_cancel`] observes a [`CancellationToken`] while
/// resolving the session, while a request is in flight and during backoff
/// waits. Cancelling yields `CANCELLED`.
///
/// # Example
/// ```no_run
/// # use fncall_client::Invoker;
/// # use fncall_common::auth::NoSession;
/// # use fncall_common::{ClientConfig, InvokeOptions};
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use serde_json::{json, Value};
///
/// let config = ClientConfig::new("https://example.supabase.co/functions/v1", "anon-key")?;
/// let invoker = Invoker::new(config, Arc::new(NoSession));
///
/// let options = InvokeOptions::new(3, Duration::from_secs(10));
/// let results: Value = invoker
///     .invoke_anonymous("rag-search", &json!({"query": "x"}), Some(options))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Invoker {
    config: Arc<ClientConfig>,
    auth: AuthResolver,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
}

impl Invoker {
    /// Creates an invoker sending over [`HttpTransport`].
    ///
    /// # Arguments
    /// * `config` - Base URL, anonymous key and default options
    /// * `sessions` - Source of the user session for authenticated calls
    pub fn new(config: ClientConfig, sessions: Arc<dyn SessionProvider>) -> Self {
        Self::with_transport(config, sessions, Arc::new(HttpTransport::new()))
    }

    /// Creates an invoker over a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        sessions: Arc<dyn SessionProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let auth = AuthResolver::new(config.anon_key(), sessions);
        Self {
            config: Arc::new(config),
            auth,
            transport,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Calls `function_name` with the anonymous key.
    ///
    /// `options` falls back to the configured defaults.
    pub async fn invoke_anonymous<T, B>(
        &self,
        function_name: &str,
        body: &B,
        options: Option<InvokeOptions>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = InvocationRequest::new(function_name, body)?;
        if let Some(options) = options {
            request = request.with_options(options);
        }
        decode(self.invoke(&request).await?)
    }

    /// Calls `function_name` with the current session's access token.
    pub async fn invoke_authenticated<T, B>(&self, function_name: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request =
            InvocationRequest::new(function_name, body)?.with_auth_mode(AuthMode::Session);
        decode(self.invoke(&request).await?)
    }

    /// Runs the attempt loop for `request` and returns the raw JSON body.
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<Value> {
        self.invoke_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Invoker::invoke`], giving up with `CANCELLED` once `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let function = request.function_name();
        let options = request
            .options()
            .unwrap_or_else(|| self.config.default_options())
            .normalized();
        let url = self.config.function_url(function);

        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::cancelled());
            }

            let credential = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::cancelled()),
                resolved = self.auth.resolve(request.auth_mode()) => resolved,
            };
            let credential = credential.map_err(|e| {
                warn!("Function {} not called (attempt {}): {}", function, attempt, e);
                ApiError::from(e)
            })?;

            debug!(
                "Calling function {} (attempt {}/{})",
                function, attempt, options.max_retries
            );
            let outcome = self
                .send_attempt(&url, &credential, request.body(), options.timeout, cancel)
                .await?;

            let failure = match outcome {
                AttemptOutcome::Success(value) => {
                    debug!("Function {} succeeded on attempt {}", function, attempt);
                    return Ok(value);
                }
                AttemptOutcome::Failure(failure) => failure,
            };

            let classification = classify(&failure);
            let delay = if attempt < options.max_retries {
                self.backoff.delay_for(&classification, attempt)
            } else {
                None
            };

            let Some(delay) = delay else {
                if classification.retryable {
                    warn!(
                        "Function {} failed after {} attempts: {:?} ({})",
                        function, attempt, failure, classification.kind
                    );
                } else {
                    info!(
                        "Function {} failed on attempt {}: {:?} ({})",
                        function, attempt, failure, classification.kind
                    );
                }
                return Err(classification.into());
            };

            warn!(
                "Function {} failed (attempt {}): {:?} ({}), retrying in {}ms",
                function,
                attempt,
                failure,
                classification.kind,
                delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Sends one attempt, bounded by `timeout` and `cancel`.
    ///
    /// Only a request the transport refuses to even build is an error here;
    /// every other result is an [`AttemptOutcome`].
    async fn send_attempt(
        &self,
        url: &str,
        credential: &AuthCredential,
        body: &Bytes,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<AttemptOutcome> {
        let send = self.transport.post_json(url, credential.token(), body.clone());

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(AttemptOutcome::Failure(TransportFailure::Cancelled));
            }
            result = tokio::time::timeout(timeout, send) => result,
        };

        Ok(match result {
            Err(_elapsed) => AttemptOutcome::Failure(TransportFailure::Timeout),
            Ok(Ok(reply)) => AttemptOutcome::from_reply(reply),
            Ok(Err(TransportError::InvalidRequest(detail))) => {
                return Err(ApiError::invalid_request(detail));
            }
            Ok(Err(e)) => AttemptOutcome::Failure(TransportFailure::Network(e.to_string())),
        })
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// A 2xx body that does not fit `T` is as unusable as one that is not JSON.
fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| classify(&TransportFailure::MalformedBody(e.to_string())).into())
}
