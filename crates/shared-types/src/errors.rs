//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Failure to encode or decode a wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Payload is not valid JSON or does not match any message shape.
    #[error("Malformed wire message: {0}")]
    Malformed(String),

    /// Well-formed JSON carrying a `type` this node does not know.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}
