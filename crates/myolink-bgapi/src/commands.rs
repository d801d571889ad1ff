//! Commands that can be sent to the radio dongle.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::types::*;

/// Commands that can be sent to the radio dongle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the dongle's own discoverable/connectable mode.
    GapSetMode {
        /// Discoverable mode.
        discover: u8,
        /// Connectable mode.
        connect: u8,
    },

    /// Start scanning for advertisers.
    GapDiscover {
        /// Which advertisers to report.
        mode: DiscoverMode,
    },

    /// Stop scanning (or abort a pending connect).
    GapEndProcedure,

    /// Open a connection to an advertiser.
    GapConnectDirect {
        /// Target hardware address.
        address: Address,
        /// Address type (public/random).
        address_type: u8,
        /// Minimum connection interval.
        interval_min: u16,
        /// Maximum connection interval.
        interval_max: u16,
        /// Supervision timeout.
        timeout: u16,
        /// Slave latency.
        latency: u16,
    },

    /// Close a connection.
    Disconnect {
        /// Connection handle.
        connection: u8,
    },

    /// Read an attribute value by handle.
    ReadByHandle {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
    },

    /// Write an attribute value by handle.
    AttributeWrite {
        /// Connection handle.
        connection: u8,
        /// Attribute handle.
        handle: u16,
        /// Value to write (at most 255 bytes).
        data: Vec<u8>,
    },
}

impl Command {
    /// Connect to `address` with the default armband connection parameters.
    pub fn connect_direct(address: Address) -> Self {
        Command::GapConnectDirect {
            address,
            address_type: ADDRESS_TYPE_PUBLIC,
            interval_min: CONN_INTERVAL_MIN,
            interval_max: CONN_INTERVAL_MAX,
            timeout: CONN_TIMEOUT,
            latency: CONN_LATENCY,
        }
    }

    /// Get the (class, command) ids for this command.
    pub fn ids(&self) -> (u8, u8) {
        match self {
            Command::GapSetMode { .. } => (CLASS_GAP, CMD_GAP_SET_MODE),
            Command::GapDiscover { .. } => (CLASS_GAP, CMD_GAP_DISCOVER),
            Command::GapEndProcedure => (CLASS_GAP, CMD_GAP_END_PROCEDURE),
            Command::GapConnectDirect { .. } => (CLASS_GAP, CMD_GAP_CONNECT_DIRECT),
            Command::Disconnect { .. } => (CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT),
            Command::ReadByHandle { .. } => (CLASS_ATTCLIENT, CMD_ATTCLIENT_READ_BY_HANDLE),
            Command::AttributeWrite { .. } => (CLASS_ATTCLIENT, CMD_ATTCLIENT_ATTRIBUTE_WRITE),
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GapSetMode { .. } => "gap_set_mode",
            Command::GapDiscover { .. } => "gap_discover",
            Command::GapEndProcedure => "gap_end_procedure",
            Command::GapConnectDirect { .. } => "gap_connect_direct",
            Command::Disconnect { .. } => "connection_disconnect",
            Command::ReadByHandle { .. } => "attclient_read_by_handle",
            Command::AttributeWrite { .. } => "attclient_attribute_write",
        }
    }

    /// Build the frame carrying this command.
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let mut payload = Vec::new();

        match self {
            Command::GapSetMode { discover, connect } => {
                payload.push(*discover);
                payload.push(*connect);
            }

            Command::GapDiscover { mode } => {
                payload.push((*mode).into());
            }

            Command::GapEndProcedure => {}

            Command::GapConnectDirect {
                address,
                address_type,
                interval_min,
                interval_max,
                timeout,
                latency,
            } => {
                payload.extend_from_slice(address.as_bytes());
                payload.push(*address_type);
                payload.extend_from_slice(&interval_min.to_le_bytes());
                payload.extend_from_slice(&interval_max.to_le_bytes());
                payload.extend_from_slice(&timeout.to_le_bytes());
                payload.extend_from_slice(&latency.to_le_bytes());
            }

            Command::Disconnect { connection } => {
                payload.push(*connection);
            }

            Command::ReadByHandle { connection, handle } => {
                payload.push(*connection);
                payload.extend_from_slice(&handle.to_le_bytes());
            }

            Command::AttributeWrite {
                connection,
                handle,
                data,
            } => {
                let len = u8::try_from(data.len()).map_err(|_| {
                    ProtocolError::InvalidData(format!("attribute value too long: {} bytes", data.len()))
                })?;
                payload.push(*connection);
                payload.extend_from_slice(&handle.to_le_bytes());
                payload.push(len);
                payload.extend_from_slice(data);
            }
        }

        let (class, command) = self.ids();
        Ok(Frame::command(class, command, payload))
    }

    /// Encode the command to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        self.to_frame()?.encode()
    }
}
