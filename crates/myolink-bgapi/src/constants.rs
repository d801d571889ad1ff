//! Protocol constants
//!
//! Class ids, command/event ids, and header layout values for the BGAPI
//! subset used by the driver.

// ============================================================================
// Header Layout
// ============================================================================

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 4;
/// Largest payload the 11-bit length field can declare.
pub const MAX_PAYLOAD_SIZE: usize = 0x07FF;
/// Header bit marking a frame as an event.
pub const HEADER_EVENT_FLAG: u8 = 0x80;
/// Header bits carrying the technology type.
pub const HEADER_TECHNOLOGY_MASK: u8 = 0x78;
/// Header bits carrying the high bits of the payload length.
pub const HEADER_LENGTH_HIGH_MASK: u8 = 0x07;
/// Technology type for Bluetooth Smart.
pub const TECHNOLOGY_BLE: u8 = 0x00;

// ============================================================================
// Class Ids
// ============================================================================

/// System class.
pub const CLASS_SYSTEM: u8 = 0;
/// Connection management class.
pub const CLASS_CONNECTION: u8 = 3;
/// Attribute client class.
pub const CLASS_ATTCLIENT: u8 = 4;
/// Generic access profile class.
pub const CLASS_GAP: u8 = 6;

// ============================================================================
// Command / Response Ids
// ============================================================================

/// Close a connection.
pub const CMD_CONNECTION_DISCONNECT: u8 = 0;
/// Read an attribute by handle.
pub const CMD_ATTCLIENT_READ_BY_HANDLE: u8 = 4;
/// Write an attribute by handle.
pub const CMD_ATTCLIENT_ATTRIBUTE_WRITE: u8 = 5;
/// Set discoverable/connectable mode.
pub const CMD_GAP_SET_MODE: u8 = 1;
/// Start scanning for advertisers.
pub const CMD_GAP_DISCOVER: u8 = 2;
/// Open a connection to a known address.
pub const CMD_GAP_CONNECT_DIRECT: u8 = 3;
/// End the current GAP procedure (scan or connect attempt).
pub const CMD_GAP_END_PROCEDURE: u8 = 4;

// ============================================================================
// Event Ids
// ============================================================================

/// Dongle booted.
pub const EVT_SYSTEM_BOOT: u8 = 0;
/// Connection status changed.
pub const EVT_CONNECTION_STATUS: u8 = 0;
/// Connection closed.
pub const EVT_CONNECTION_DISCONNECTED: u8 = 4;
/// Attribute procedure finished.
pub const EVT_ATTCLIENT_PROCEDURE_COMPLETED: u8 = 1;
/// Attribute value received (read result or notification).
pub const EVT_ATTCLIENT_ATTRIBUTE_VALUE: u8 = 5;
/// Advertisement or scan response received.
pub const EVT_GAP_SCAN_RESPONSE: u8 = 0;

// ============================================================================
// Connection Parameters
// ============================================================================

/// Connection status flag: link is up.
pub const CONNECTION_FLAG_CONNECTED: u8 = 0x01;
/// Connection status flag: link is encrypted.
pub const CONNECTION_FLAG_ENCRYPTED: u8 = 0x02;
/// Connection status flag: connection setup completed.
pub const CONNECTION_FLAG_COMPLETED: u8 = 0x04;
/// Flags value reported once a direct connection is fully established.
pub const CONNECTION_FULLY_CONNECTED: u8 = CONNECTION_FLAG_CONNECTED | CONNECTION_FLAG_COMPLETED;

/// Number of simultaneous connections the dongle supports.
pub const MAX_CONNECTIONS: u8 = 8;

/// Public device address type.
pub const ADDRESS_TYPE_PUBLIC: u8 = 0;
/// Minimum connection interval (units of 1.25 ms).
pub const CONN_INTERVAL_MIN: u16 = 6;
/// Maximum connection interval (units of 1.25 ms).
pub const CONN_INTERVAL_MAX: u16 = 6;
/// Supervision timeout (units of 10 ms).
pub const CONN_TIMEOUT: u16 = 64;
/// Slave latency.
pub const CONN_LATENCY: u16 = 0;

/// Result code reported for success.
pub const RESULT_OK: u16 = 0;
