//! Client error types.

use facility_protocol::WireError;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An outgoing request could not be encoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// No matching reply arrived within one attempt.
    #[error("request {correlation_id} timed out on attempt {attempt}")]
    Timeout { correlation_id: i32, attempt: u32 },

    /// Every attempt of a call timed out.
    #[error("request {correlation_id} failed after {attempts} attempts")]
    RetriesExhausted { correlation_id: i32, attempts: u32 },

    /// Socket-level failure other than a timeout.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
