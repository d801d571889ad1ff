//! Common types used in the protocol.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Size of a hardware address in bytes.
pub const ADDRESS_SIZE: usize = 6;

/// A 6-byte Bluetooth hardware address, stored in wire (little-endian) order.
///
/// Displayed most-significant byte first, the way radios print addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// Create a new address from wire-order bytes.
    pub fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Address(bytes)
    }

    /// Create from a slice. Returns None if slice is wrong length.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; ADDRESS_SIZE] = slice.try_into().ok()?;
        Some(Address(bytes))
    }

    /// Get the underlying wire-order bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = ProtocolError;

    /// Parse `aa:bb:cc:dd:ee:ff` (most-significant byte first).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != ADDRESS_SIZE {
            return Err(ProtocolError::InvalidData(format!(
                "address must have {} octets: {}",
                ADDRESS_SIZE, s
            )));
        }

        let mut bytes = [0u8; ADDRESS_SIZE];
        for (slot, part) in bytes.iter_mut().rev().zip(parts) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| ProtocolError::InvalidData(format!("invalid address octet: {}", part)))?;
        }
        Ok(Address(bytes))
    }
}

/// GAP discovery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverMode {
    /// Only limited-discoverable devices.
    Limited,
    /// Limited and general discoverable devices.
    Generic,
    /// Every advertiser.
    Observation,
}

impl From<DiscoverMode> for u8 {
    fn from(mode: DiscoverMode) -> Self {
        match mode {
            DiscoverMode::Limited => 0,
            DiscoverMode::Generic => 1,
            DiscoverMode::Observation => 2,
        }
    }
}

/// Firmware version reported by an armband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Patch level.
    pub patch: u16,
    /// Hardware revision.
    pub hardware_rev: u16,
}

impl FirmwareVersion {
    /// Payload size of the firmware version attribute.
    pub const SIZE: usize = 8;

    /// Decode from the firmware version attribute value.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        Ok(FirmwareVersion {
            major: u16::from_le_bytes([data[0], data[1]]),
            minor: u16::from_le_bytes([data[2], data[3]]),
            patch: u16::from_le_bytes([data[4], data[5]]),
            hardware_rev: u16::from_le_bytes([data[6], data[7]]),
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{} (rev {})", self.major, self.minor, self.patch, self.hardware_rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_is_reversed() {
        let addr = Address::new([0x01, 0x02, 0x03, 0x04, 0x05, 0xab]);
        assert_eq!(addr.to_string(), "ab:05:04:03:02:01");
    }

    #[test]
    fn test_address_parse() {
        let addr: Address = "ab:05:04:03:02:01".parse().unwrap();
        assert_eq!(addr.as_bytes(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0xab]);

        assert!("ab:05:04".parse::<Address>().is_err());
        assert!("zz:05:04:03:02:01".parse::<Address>().is_err());
    }

    #[test]
    fn test_firmware_version_decode() {
        let fw = FirmwareVersion::decode(&[1, 0, 5, 0, 0x2c, 0x07, 2, 0]).unwrap();
        assert_eq!(fw.major, 1);
        assert_eq!(fw.minor, 5);
        assert_eq!(fw.patch, 1836);
        assert_eq!(fw.hardware_rev, 2);

        assert!(FirmwareVersion::decode(&[1, 0, 5]).is_err());
    }
}
