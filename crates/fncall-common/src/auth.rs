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

//! Credential resolution for function calls
//!
//! Every call is made with a bearer credential chosen by its [`AuthMode`]:
//!
//! - **Anonymous**: the static service key from [`ClientConfig`](crate::ClientConfig).
//!   Always available.
//! - **Session**: the signed-in user's access token, read from a
//!   [`SessionProvider`] on every attempt. Missing, expired or unreadable
//!   sessions fail with [`AuthFailure`], which callers see as `AUTH_ERROR`.
//!
//! The resolver only reads session state. Refreshing or re-authenticating is
//! the session provider's business.
//!
//! # Example
//!
//! ```
//! use fncall_common::auth::{AuthMode, AuthResolver, NoSession};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolver = AuthResolver::new("anon-key", Arc::new(NoSession));
//!
//! let anon = resolver.resolve(AuthMode::Anonymous).await.unwrap();
//! assert_eq!(anon.token(), "anon-key");
//!
//! assert!(resolver.resolve(AuthMode::Session).await.is_err());
//! # }
//! ```

use async_trait::async_trait;
use http::HeaderValue;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

use crate::protocol::ApiError;

/// Which credential a call is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthMode {
    /// Static anonymous service key
    #[default]
    Anonymous,
    /// Current user session token
    Session,
}

/// Bearer credential attached to one attempt.
///
/// `Debug` and `Display` never print the token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    token: String,
    expires_at: Option<SystemTime>,
}

impl AuthCredential {
    pub fn new(token: impl Into<String>, expires_at: Option<SystemTime>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// A credential without expiry never expires.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Display for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bearer(*****)")
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("token", &"*****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// An authenticated user session as reported by the session provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: Option<SystemTime>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"*****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Session provider failed: {0}")]
pub struct SessionError(pub String);

/// Source of the current user session.
///
/// Implemented by whatever owns sign-in state in the embedding application.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the current session, or `None` when nobody is signed in.
    async fn current_session(&self) -> Result<Option<Session>, SessionError>;
}

/// Provider for contexts without any signed-in user.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl SessionProvider for NoSession {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(None)
    }
}

/// Provider returning a fixed session, e.g. a token passed on the command line.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session: Session,
}

impl StaticSessionProvider {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(Some(self.session.clone()))
    }
}

/// Why a session credential could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("No active session")]
    NoSession,

    #[error("Session expired")]
    Expired,

    #[error(transparent)]
    Provider(#[from] SessionError),
}

impl From<AuthFailure> for ApiError {
    fn from(_: AuthFailure) -> Self {
        ApiError::auth()
    }
}

/// Picks the bearer credential for each attempt.
#[derive(Clone)]
pub struct AuthResolver {
    anonymous: AuthCredential,
    sessions: Arc<dyn SessionProvider>,
}

impl AuthResolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `anon_key` - Static service key used for anonymous calls
    /// * `sessions` - Provider consulted for session calls
    pub fn new(anon_key: impl Into<String>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            anonymous: AuthCredential::new(anon_key, None),
            sessions,
        }
    }

    /// Resolves the credential for `mode`.
    ///
    /// Anonymous resolution cannot fail. Session resolution asks the provider
    /// afresh on every call; nothing is cached here.
    pub async fn resolve(&self, mode: AuthMode) -> Result<AuthCredential, AuthFailure> {
        match mode {
            AuthMode::Anonymous => Ok(self.anonymous.clone()),
            AuthMode::Session => {
                let session = self
                    .sessions
                    .current_session()
                    .await?
                    .ok_or(AuthFailure::NoSession)?;

                let credential = AuthCredential::new(session.access_token, session.expires_at);
                // A token that cannot travel in a header is as good as none
                if credential.token().is_empty() || !is_header_safe(credential.token()) {
                    return Err(AuthFailure::NoSession);
                }
                if credential.is_expired_at(SystemTime::now()) {
                    return Err(AuthFailure::Expired);
                }
                Ok(credential)
            }
        }
    }
}

fn is_header_safe(token: &str) -> bool {
    HeaderValue::from_str(&format!("Bearer {}", token)).is_ok()
}

impl fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResolver")
            .field("anonymous", &self.anonymous)
            .finish_non_exhaustive()
    }
}
