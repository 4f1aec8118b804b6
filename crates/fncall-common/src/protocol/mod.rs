pub mod body;
pub mod error;
pub mod outcome;


pub use body::ServerError;
pub use error::{ApiError, ErrorKind, Result, GENERIC_MESSAGE};
pub use outcome::{AttemptOutcome, ErrorClassification, FailureCause, TransportFailure};
