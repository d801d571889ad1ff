//! Responses and events from the radio dongle.

use crate::constants::*;
use crate::error::*;
use crate::frame::{Frame, MessageType};
use crate::types::*;

/// Responses to commands, matched by (class, command) id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Result of `gap_set_mode`.
    GapSetMode {
        /// Result code.
        result: u16,
    },

    /// Result of `gap_discover`.
    GapDiscover {
        /// Result code.
        result: u16,
    },

    /// Result of `gap_connect_direct`.
    GapConnectDirect {
        /// Result code.
        result: u16,
        /// Connection handle reserved for the attempt.
        connection: u8,
    },

    /// Result of `gap_end_procedure`.
    GapEndProcedure {
        /// Result code.
        result: u16,
    },

    /// Result of `connection_disconnect`.
    Disconnect {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: u16,
    },

    /// Result of `attclient_read_by_handle`.
    ReadByHandle {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: u16,
    },

    /// Result of `attclient_attribute_write`.
    AttributeWrite {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: u16,
    },
}

impl Response {
    /// Result code carried by the response.
    pub fn result(&self) -> u16 {
        match self {
            Response::GapSetMode { result }
            | Response::GapDiscover { result }
            | Response::GapConnectDirect { result, .. }
            | Response::GapEndProcedure { result }
            | Response::Disconnect { result, .. }
            | Response::ReadByHandle { result, .. }
            | Response::AttributeWrite { result, .. } => *result,
        }
    }
}

/// An advertisement or scan response seen while discovering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResponse {
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Advertisement packet type.
    pub packet_type: u8,
    /// Advertiser address.
    pub sender: Address,
    /// Advertiser address type.
    pub address_type: u8,
    /// Bond handle, 0xFF if not bonded.
    pub bond: u8,
    /// Raw advertisement data.
    pub data: Vec<u8>,
}

/// Connection status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Connection handle.
    pub connection: u8,
    /// Status flags (see `CONNECTION_FLAG_*`).
    pub flags: u8,
    /// Remote address.
    pub address: Address,
    /// Remote address type.
    pub address_type: u8,
    /// Connection interval.
    pub conn_interval: u16,
    /// Supervision timeout.
    pub timeout: u16,
    /// Slave latency.
    pub latency: u16,
    /// Bond handle.
    pub bonding: u8,
}

/// An attribute value, either a read result or a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    /// Connection handle the value came from.
    pub connection: u8,
    /// Attribute handle.
    pub handle: u16,
    /// Value type (read, notify, indicate, ...).
    pub value_type: u8,
    /// Value bytes.
    pub value: Vec<u8>,
}

/// Unsolicited events from the dongle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Advertiser discovered.
    ScanResponse(ScanResponse),

    /// Connection status changed.
    ConnectionStatus(ConnectionStatus),

    /// Connection closed.
    Disconnected {
        /// Connection handle.
        connection: u8,
        /// Disconnect reason code.
        reason: u16,
    },

    /// Attribute procedure finished.
    ProcedureCompleted {
        /// Connection handle.
        connection: u8,
        /// Result code.
        result: u16,
        /// Characteristic handle.
        handle: u16,
    },

    /// Attribute value received.
    AttributeValue(AttributeValue),
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A response to a command.
    Response(Response),
    /// An unsolicited event.
    Event(Event),
    /// A well-formed frame outside the supported protocol table.
    Unrecognized(Frame),
}

impl Message {
    /// Decode a message from a frame.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.message_type {
            MessageType::Event => Event::decode(frame),
            MessageType::Response => Response::decode(frame),
        }
    }
}

impl Response {
    /// Decode a response frame. Unknown ids yield [`Message::Unrecognized`].
    pub fn decode(frame: &Frame) -> Result<Message, ProtocolError> {
        let p = &frame.payload;

        let response = match (frame.class, frame.command) {
            (CLASS_GAP, CMD_GAP_SET_MODE) => Response::GapSetMode { result: read_u16(p, 0)? },

            (CLASS_GAP, CMD_GAP_DISCOVER) => Response::GapDiscover { result: read_u16(p, 0)? },

            (CLASS_GAP, CMD_GAP_CONNECT_DIRECT) => {
                ensure_len(p, 3)?;
                Response::GapConnectDirect {
                    result: read_u16(p, 0)?,
                    connection: p[2],
                }
            }

            (CLASS_GAP, CMD_GAP_END_PROCEDURE) => Response::GapEndProcedure { result: read_u16(p, 0)? },

            (CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT) => {
                ensure_len(p, 3)?;
                Response::Disconnect {
                    connection: p[0],
                    result: read_u16(p, 1)?,
                }
            }

            (CLASS_ATTCLIENT, CMD_ATTCLIENT_READ_BY_HANDLE) => {
                ensure_len(p, 3)?;
                Response::ReadByHandle {
                    connection: p[0],
                    result: read_u16(p, 1)?,
                }
            }

            (CLASS_ATTCLIENT, CMD_ATTCLIENT_ATTRIBUTE_WRITE) => {
                ensure_len(p, 3)?;
                Response::AttributeWrite {
                    connection: p[0],
                    result: read_u16(p, 1)?,
                }
            }

            _ => return Ok(Message::Unrecognized(frame.clone())),
        };

        Ok(Message::Response(response))
    }
}

impl Event {
    /// Decode an event frame. Unknown ids yield [`Message::Unrecognized`].
    pub fn decode(frame: &Frame) -> Result<Message, ProtocolError> {
        let p = &frame.payload;

        let event = match (frame.class, frame.command) {
            (CLASS_GAP, EVT_GAP_SCAN_RESPONSE) => {
                ensure_len(p, 11)?;
                Event::ScanResponse(ScanResponse {
                    rssi: p[0] as i8,
                    packet_type: p[1],
                    sender: read_address(p, 2)?,
                    address_type: p[8],
                    bond: p[9],
                    data: read_byte_array(p, 10)?,
                })
            }

            (CLASS_CONNECTION, EVT_CONNECTION_STATUS) => {
                ensure_len(p, 16)?;
                Event::ConnectionStatus(ConnectionStatus {
                    connection: p[0],
                    flags: p[1],
                    address: read_address(p, 2)?,
                    address_type: p[8],
                    conn_interval: read_u16(p, 9)?,
                    timeout: read_u16(p, 11)?,
                    latency: read_u16(p, 13)?,
                    bonding: p[15],
                })
            }

            (CLASS_CONNECTION, EVT_CONNECTION_DISCONNECTED) => {
                ensure_len(p, 3)?;
                Event::Disconnected {
                    connection: p[0],
                    reason: read_u16(p, 1)?,
                }
            }

            (CLASS_ATTCLIENT, EVT_ATTCLIENT_PROCEDURE_COMPLETED) => {
                ensure_len(p, 5)?;
                Event::ProcedureCompleted {
                    connection: p[0],
                    result: read_u16(p, 1)?,
                    handle: read_u16(p, 3)?,
                }
            }

            (CLASS_ATTCLIENT, EVT_ATTCLIENT_ATTRIBUTE_VALUE) => {
                ensure_len(p, 5)?;
                Event::AttributeValue(AttributeValue {
                    connection: p[0],
                    handle: read_u16(p, 1)?,
                    value_type: p[3],
                    value: read_byte_array(p, 4)?,
                })
            }

            _ => return Ok(Message::Unrecognized(frame.clone())),
        };

        Ok(Message::Event(event))
    }
}

// ============================================================================
// Field readers
// ============================================================================

fn ensure_len(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    ensure_len(data, offset + 2)?;
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

fn read_address(data: &[u8], offset: usize) -> Result<Address, ProtocolError> {
    ensure_len(data, offset + ADDRESS_SIZE)?;
    Address::from_slice(&data[offset..offset + ADDRESS_SIZE])
        .ok_or_else(|| ProtocolError::InvalidData("bad address field".to_string()))
}

/// Read a one-byte length prefix followed by that many bytes.
fn read_byte_array(data: &[u8], offset: usize) -> Result<Vec<u8>, ProtocolError> {
    ensure_len(data, offset + 1)?;
    let len = data[offset] as usize;
    let start = offset + 1;
    ensure_len(data, start + len)?;
    Ok(data[start..start + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scan_response() {
        let mut payload = vec![0xC4, 0x00, 1, 2, 3, 4, 5, 6, 0x00, 0xFF, 3, 0xAA, 0xBB, 0xCC];
        let frame = Frame::event(CLASS_GAP, EVT_GAP_SCAN_RESPONSE, payload.clone());

        let Message::Event(Event::ScanResponse(adv)) = Message::decode(&frame).unwrap() else {
            panic!("expected scan response");
        };
        assert_eq!(adv.rssi, -60);
        assert_eq!(adv.sender, Address::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(adv.bond, 0xFF);
        assert_eq!(adv.data, vec![0xAA, 0xBB, 0xCC]);

        // Declared data length beyond the payload
        payload[10] = 9;
        let frame = Frame::event(CLASS_GAP, EVT_GAP_SCAN_RESPONSE, payload);
        assert!(matches!(
            Message::decode(&frame),
            Err(ProtocolError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn test_decode_connection_status() {
        let payload = vec![2, 5, 1, 2, 3, 4, 5, 6, 0, 6, 0, 64, 0, 0, 0, 0xFF];
        let frame = Frame::event(CLASS_CONNECTION, EVT_CONNECTION_STATUS, payload);

        let Message::Event(Event::ConnectionStatus(status)) = Message::decode(&frame).unwrap() else {
            panic!("expected connection status");
        };
        assert_eq!(status.connection, 2);
        assert_eq!(status.flags, CONNECTION_FULLY_CONNECTED);
        assert_eq!(status.address, Address::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(status.timeout, 64);
    }

    #[test]
    fn test_same_ids_differ_by_message_type() {
        // (3, 0) is the disconnect response and the connection status event
        let response = Frame::command(CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT, vec![1, 0x86, 0x01]);
        assert_eq!(
            Message::decode(&response).unwrap(),
            Message::Response(Response::Disconnect {
                connection: 1,
                result: 0x0186
            })
        );

        let event = Frame::event(CLASS_CONNECTION, EVT_CONNECTION_STATUS, vec![0; 3]);
        assert!(Message::decode(&event).is_err());
    }

    #[test]
    fn test_decode_connect_direct_response() {
        let frame = Frame::command(CLASS_GAP, CMD_GAP_CONNECT_DIRECT, vec![0x00, 0x00, 0x01]);
        let message = Message::decode(&frame).unwrap();
        assert_eq!(
            message,
            Message::Response(Response::GapConnectDirect {
                result: 0,
                connection: 1
            })
        );
    }

    #[test]
    fn test_decode_attribute_value() {
        let frame = Frame::event(
            CLASS_ATTCLIENT,
            EVT_ATTCLIENT_ATTRIBUTE_VALUE,
            vec![0, 0x11, 0x00, 0x00, 1, 87],
        );
        let Message::Event(Event::AttributeValue(value)) = Message::decode(&frame).unwrap() else {
            panic!("expected attribute value");
        };
        assert_eq!(value.handle, 0x0011);
        assert_eq!(value.value, vec![87]);
    }

    #[test]
    fn test_decode_unrecognized() {
        let frame = Frame::event(CLASS_SYSTEM, EVT_SYSTEM_BOOT, vec![1, 0, 0, 0]);
        assert_eq!(Message::decode(&frame).unwrap(), Message::Unrecognized(frame));
    }
}
