//! fncall Common Types and Transport
//!
//! Shared building blocks for calling backend serverless functions:
//!
//! - [`protocol`] - Error taxonomy ([`ErrorKind`], [`ApiError`]), attempt
//!   outcomes and the error body conventions
//! - [`auth`] - Anonymous vs. session credentials and their resolution
//! - [`config`] - Base URL, anonymous key and per-call options
//! - [`transport`] - The [`Transport`] seam and its hyper implementation
//!
//! # Wire Format
//!
//! - **Request**: `POST {base_url}/{function_name}` with
//!   `Content-Type: application/json` and `Authorization: Bearer {credential}`,
//!   body is the caller's JSON verbatim
//! - **Success**: any 2xx, body returned unmodified
//! - **Failure**: `{"error": {"code", "message"}}`, or the legacy
//!   `{"error": "..."}` / `{"message": "..."}`
//! - **Throttling**: `429` with an optional `Retry-After` in seconds

pub mod auth;
pub mod config;
pub mod protocol;
pub mod transport;

pub use auth::{AuthCredential, AuthMode, AuthResolver, Session, SessionProvider};
pub use config::{ClientConfig, ConfigError, InvokeOptions};
pub use protocol::*;
pub use transport::{HttpReply, HttpTransport, Transport, TransportError};
