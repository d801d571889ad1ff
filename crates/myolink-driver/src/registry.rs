//! Device registry: the single owner of every admitted armband.
//!
//! Devices live in a fixed arena of slots sized to the target device count.
//! A slot index is stable for the life of the device and is what samples and
//! published paths refer to.

use std::fmt;

use myolink_bgapi::{Address, FirmwareVersion};

use crate::error::{DriverError, Result};

/// Index of a device slot in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceSlot(pub usize);

impl fmt::Display for DeviceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One physical armband.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Hardware address.
    pub address: Address,
    /// Connection handle, assigned once the radio reports the link up.
    pub connection: Option<u8>,
    /// Advertised device name.
    pub name: Option<String>,
    /// Firmware version.
    pub firmware: Option<FirmwareVersion>,
    /// Battery level in percent.
    pub battery: Option<u8>,
    /// Samples emitted so far, used to stamp arrival order.
    samples: u64,
}

impl Device {
    pub fn new(address: Address) -> Self {
        Device {
            address,
            connection: None,
            name: None,
            firmware: None,
            battery: None,
            samples: 0,
        }
    }

    /// True once name, firmware and battery have all been read.
    pub fn ready(&self) -> bool {
        self.name.is_some() && self.firmware.is_some() && self.battery.is_some()
    }

    /// Take the next arrival sequence number.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        let seq = self.samples;
        self.samples += 1;
        seq
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if let Some(connection) = self.connection {
            write!(f, " [conn {}]", connection)?;
        }
        if let Some(name) = &self.name {
            write!(f, " \"{}\"", name)?;
        }
        if let Some(firmware) = &self.firmware {
            write!(f, " fw {}", firmware)?;
        }
        if let Some(battery) = self.battery {
            write!(f, " battery {}%", battery)?;
        }
        Ok(())
    }
}

/// Fixed-capacity arena of devices.
#[derive(Debug, Clone)]
pub struct Registry {
    slots: Vec<Option<Device>>,
}

impl Registry {
    /// Create a registry with room for `capacity` devices.
    pub fn new(capacity: usize) -> Self {
        Registry {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of devices held.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Whether a device with this address has already been admitted.
    pub fn contains_address(&self, address: &Address) -> bool {
        self.iter().any(|(_, d)| d.address == *address)
    }

    /// Place a device in the first free slot.
    pub fn admit(&mut self, device: Device) -> Result<DeviceSlot> {
        let capacity = self.capacity();
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DriverError::RegistryFull { capacity })?;
        self.slots[index] = Some(device);
        Ok(DeviceSlot(index))
    }

    pub fn get(&self, slot: DeviceSlot) -> Option<&Device> {
        self.slots.get(slot.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: DeviceSlot) -> Option<&mut Device> {
        self.slots.get_mut(slot.0).and_then(Option::as_mut)
    }

    /// Find the slot holding a connection handle.
    pub fn slot_by_connection(&self, connection: u8) -> Option<DeviceSlot> {
        self.iter()
            .find(|(_, d)| d.connection == Some(connection))
            .map(|(slot, _)| slot)
    }

    /// Remove the device holding a connection handle.
    pub fn remove_by_connection(&mut self, connection: u8) -> Option<(DeviceSlot, Device)> {
        let slot = self.slot_by_connection(connection)?;
        self.slots[slot.0].take().map(|device| (slot, device))
    }

    /// Iterate over occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceSlot, &Device)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|d| (DeviceSlot(i), d)))
    }

    /// True when every held device is ready. Vacuously true when empty.
    pub fn all_ready(&self) -> bool {
        self.iter().all(|(_, d)| d.ready())
    }

    /// Drop every device.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}
