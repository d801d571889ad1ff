//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the BGAPI protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is too short for the message it claims to be.
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Payload does not fit in the 11-bit length field.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid data in payload.
    #[error("invalid payload data: {0}")]
    InvalidData(String),
}
