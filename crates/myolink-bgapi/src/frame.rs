//! Frame encoding/decoding utilities.
//!
//! Every BGAPI message is a 4-byte header followed by the payload. The
//! header carries an 11-bit payload length, so the stream has no delimiters
//! and frames must be reassembled from the length alone.
//!
//! ```text
//! +----------------------+----------+-------+---------+-------------------+
//! | E | tech(4) | len_hi | len_lo   | class | command | payload[0..len]   |
//! +----------------------+----------+-------+---------+-------------------+
//! ```

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::error::ProtocolError;

/// Whether a frame is a command/response or an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Command (host → dongle) or its response (dongle → host).
    Response,
    /// Unsolicited event (dongle → host).
    Event,
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command/response or event.
    pub message_type: MessageType,
    /// Technology type from the header.
    pub technology: u8,
    /// Class id.
    pub class: u8,
    /// Command or event id within the class.
    pub command: u8,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a command frame (also the shape of a response).
    pub fn command(class: u8, command: u8, payload: Vec<u8>) -> Self {
        Frame {
            message_type: MessageType::Response,
            technology: TECHNOLOGY_BLE,
            class,
            command,
            payload,
        }
    }

    /// Create an event frame.
    pub fn event(class: u8, command: u8, payload: Vec<u8>) -> Self {
        Frame {
            message_type: MessageType::Event,
            technology: TECHNOLOGY_BLE,
            class,
            command,
            payload,
        }
    }

    /// Whether this frame is an event.
    pub fn is_event(&self) -> bool {
        self.message_type == MessageType::Event
    }

    /// Serialize header and payload.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: len,
            });
        }

        let mut first = ((self.technology << 3) & HEADER_TECHNOLOGY_MASK)
            | ((len >> 8) as u8 & HEADER_LENGTH_HIGH_MASK);
        if self.is_event() {
            first |= HEADER_EVENT_FLAG;
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + len);
        buf.push(first);
        buf.push((len & 0xFF) as u8);
        buf.push(self.class);
        buf.push(self.command);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }
}

/// Header fields parsed from the first four bytes of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    message_type: MessageType,
    technology: u8,
    payload_len: usize,
    class: u8,
    command: u8,
}

impl Header {
    fn parse(bytes: &[u8]) -> Self {
        let message_type = if bytes[0] & HEADER_EVENT_FLAG != 0 {
            MessageType::Event
        } else {
            MessageType::Response
        };
        Header {
            message_type,
            technology: (bytes[0] & HEADER_TECHNOLOGY_MASK) >> 3,
            payload_len: (((bytes[0] & HEADER_LENGTH_HIGH_MASK) as usize) << 8) | bytes[1] as usize,
            class: bytes[2],
            command: bytes[3],
        }
    }
}

/// A codec that reassembles frames from an unframed byte stream.
///
/// Bytes are accumulated until a full header and the payload it declares are
/// present. Partial frames stay buffered across calls.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(HEADER_SIZE + MAX_PAYLOAD_SIZE),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the front of the buffer.
    ///
    /// Returns `Some(frame)` if a complete frame is available,
    /// or `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Frame> {
        // A frame can only start with a Bluetooth Smart header byte
        while !self.buffer.is_empty() && self.buffer[0] & HEADER_TECHNOLOGY_MASK != TECHNOLOGY_BLE {
            log::warn!("discarding unexpected header byte 0x{:02X}", self.buffer[0]);
            self.buffer.advance(1);
        }

        if self.buffer.len() < HEADER_SIZE {
            return None;
        }

        let header = Header::parse(&self.buffer[..HEADER_SIZE]);
        if self.buffer.len() < HEADER_SIZE + header.payload_len {
            return None;
        }

        self.buffer.advance(HEADER_SIZE);
        let payload = self.buffer.split_to(header.payload_len).to_vec();

        Some(Frame {
            message_type: header.message_type,
            technology: header.technology,
            class: header.class,
            command: header.command,
            payload,
        })
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
