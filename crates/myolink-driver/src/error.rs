//! Error types for the driver.

use myolink_bgapi::ProtocolError;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// Errors that abort a driver operation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The serial link could not be opened.
    #[error("couldn't open serial port {path}: {source}")]
    Open {
        /// Port path.
        path: String,
        /// Underlying error.
        #[source]
        source: serialport::Error,
    },

    /// The serial link failed mid-session.
    #[error("serial link failed: {0}")]
    Transport(#[from] std::io::Error),

    /// The dongle reported a non-zero result for a command.
    #[error("{command} rejected by the radio (result 0x{result:04X})")]
    Rejected {
        /// Command name.
        command: &'static str,
        /// Result code.
        result: u16,
    },

    /// A command could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A sample payload could not be decoded or attributed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Every device slot is already taken.
    #[error("device registry is full ({capacity} devices)")]
    RegistryFull {
        /// Registry capacity.
        capacity: usize,
    },

    /// The operator asked to stop.
    #[error("interrupted")]
    Interrupted,
}

impl DriverError {
    /// Whether this error means the serial link is gone.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(self, DriverError::Open { .. } | DriverError::Transport(_))
    }
}

/// Errors decoding one sensor payload. These never stop the receive loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload size does not match the attribute's layout.
    #[error("{kind} payload must be {expected} bytes, got {actual}")]
    WrongLength {
        /// Payload kind.
        kind: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// No registered device holds this connection.
    #[error("no device registered for connection {connection} (handle 0x{handle:04X})")]
    UnknownConnection {
        /// Connection handle the value arrived on.
        connection: u8,
        /// Attribute handle.
        handle: u16,
    },

    /// Malformed frame payload.
    #[error("malformed frame: {0}")]
    Malformed(#[from] ProtocolError),
}
