//! fncall Client
//!
//! Retrying invocation of backend functions over HTTP. See [`Invoker`] for the
//! attempt loop, [`classify`] for how failures map onto [`ApiError`] and
//! [`BackoffPolicy`] for the waits between attempts.

pub mod backoff;
pub mod classifier;
pub mod invoker;
pub mod request;

pub use backoff::BackoffPolicy;
pub use classifier::classify;
pub use invoker::Invoker;
pub use request::InvocationRequest;

pub use fncall_common::{ApiError, AuthMode, ClientConfig, ErrorKind, InvokeOptions};
pub use tokio_util::sync::CancellationToken;
