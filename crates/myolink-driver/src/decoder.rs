//! Sensor decoder: attribute values in, samples and device metadata out.
//!
//! The originating device is found through the value's connection handle.
//! Which payload layout applies is decided by the attribute handle.

use myolink_bgapi::myohw::{
    ACCELEROMETER_SCALE, EMG_CHANNELS, EMG_PAYLOAD_SIZE, GYROSCOPE_SCALE, HANDLES_EMG_DATA, HANDLE_BATTERY,
    HANDLE_DEVICE_NAME, HANDLE_FIRMWARE_VERSION, HANDLE_IMU_DATA, IMU_ACCEL_COMPONENTS, IMU_GYRO_COMPONENTS,
    IMU_ORIENTATION_COMPONENTS, IMU_PAYLOAD_SIZE, ORIENTATION_SCALE,
};
use myolink_bgapi::{AttributeValue, FirmwareVersion};

use crate::error::DecodeError;
use crate::registry::{DeviceSlot, Registry};

/// What an attribute handle carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Emg,
    Motion,
    Name,
    Firmware,
    Battery,
    Other,
}

impl AttributeKind {
    pub fn from_handle(handle: u16) -> Self {
        match handle {
            h if HANDLES_EMG_DATA.contains(&h) => AttributeKind::Emg,
            HANDLE_IMU_DATA => AttributeKind::Motion,
            HANDLE_DEVICE_NAME => AttributeKind::Name,
            HANDLE_FIRMWARE_VERSION => AttributeKind::Firmware,
            HANDLE_BATTERY => AttributeKind::Battery,
            _ => AttributeKind::Other,
        }
    }
}

/// One 8-channel muscle-activity reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmgSample {
    pub device: DeviceSlot,
    /// Arrival order on the originating device.
    pub sequence: u64,
    pub channels: [i8; EMG_CHANNELS],
}

/// One orientation/accelerometer/gyroscope reading in raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSample {
    pub device: DeviceSlot,
    /// Arrival order on the originating device.
    pub sequence: u64,
    pub orientation: [i16; IMU_ORIENTATION_COMPONENTS],
    pub accelerometer: [i16; IMU_ACCEL_COMPONENTS],
    pub gyroscope: [i16; IMU_GYRO_COMPONENTS],
}

impl MotionSample {
    /// Unit quaternion, w x y z.
    pub fn orientation_scaled(&self) -> [f32; IMU_ORIENTATION_COMPONENTS] {
        self.orientation.map(|v| f32::from(v) / ORIENTATION_SCALE)
    }

    /// Acceleration in g.
    pub fn accelerometer_scaled(&self) -> [f32; IMU_ACCEL_COMPONENTS] {
        self.accelerometer.map(|v| f32::from(v) / ACCELEROMETER_SCALE)
    }

    /// Angular velocity in degrees per second.
    pub fn gyroscope_scaled(&self) -> [f32; IMU_GYRO_COMPONENTS] {
        self.gyroscope.map(|v| f32::from(v) / GYROSCOPE_SCALE)
    }
}

/// Result of applying one attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Two muscle-activity samples, in emission order.
    Emg([EmgSample; 2]),
    Motion(MotionSample),
    /// A metadata field on the device was set.
    Metadata(AttributeKind),
    /// An attribute nothing consumes.
    Ignored,
}

/// Split a muscle-activity payload into its two 8-channel halves.
pub fn decode_emg(payload: &[u8]) -> Result<[[i8; EMG_CHANNELS]; 2], DecodeError> {
    check_len("emg", EMG_PAYLOAD_SIZE, payload)?;

    let mut halves = [[0i8; EMG_CHANNELS]; 2];
    for (half, chunk) in halves.iter_mut().zip(payload.chunks_exact(EMG_CHANNELS)) {
        for (channel, byte) in half.iter_mut().zip(chunk) {
            *channel = *byte as i8;
        }
    }
    Ok(halves)
}

/// Raw motion components: orientation, accelerometer, gyroscope.
pub type MotionComponents = (
    [i16; IMU_ORIENTATION_COMPONENTS],
    [i16; IMU_ACCEL_COMPONENTS],
    [i16; IMU_GYRO_COMPONENTS],
);

/// Decode a motion payload of little-endian signed 16-bit values.
pub fn decode_motion(payload: &[u8]) -> Result<MotionComponents, DecodeError> {
    check_len("imu", IMU_PAYLOAD_SIZE, payload)?;

    let mut values = payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]));
    let mut take = || values.next().unwrap_or_default();

    let orientation = std::array::from_fn(|_| take());
    let accelerometer = std::array::from_fn(|_| take());
    let gyroscope = std::array::from_fn(|_| take());
    Ok((orientation, accelerometer, gyroscope))
}

/// Apply an attribute value to the registry: decode samples for the owning
/// device, or set the matching metadata field.
pub fn apply(registry: &mut Registry, value: &AttributeValue) -> Result<Decoded, DecodeError> {
    let slot = registry
        .slot_by_connection(value.connection)
        .ok_or(DecodeError::UnknownConnection {
            connection: value.connection,
            handle: value.handle,
        })?;
    let Some(device) = registry.get_mut(slot) else {
        return Err(DecodeError::UnknownConnection {
            connection: value.connection,
            handle: value.handle,
        });
    };

    let kind = AttributeKind::from_handle(value.handle);
    match kind {
        AttributeKind::Emg => {
            let [first, second] = decode_emg(&value.value)?;
            Ok(Decoded::Emg([
                EmgSample {
                    device: slot,
                    sequence: device.next_sequence(),
                    channels: first,
                },
                EmgSample {
                    device: slot,
                    sequence: device.next_sequence(),
                    channels: second,
                },
            ]))
        }
        AttributeKind::Motion => {
            let (orientation, accelerometer, gyroscope) = decode_motion(&value.value)?;
            Ok(Decoded::Motion(MotionSample {
                device: slot,
                sequence: device.next_sequence(),
                orientation,
                accelerometer,
                gyroscope,
            }))
        }
        AttributeKind::Name => {
            let name = String::from_utf8_lossy(&value.value);
            device.name = Some(name.trim_end_matches('\0').to_string());
            Ok(Decoded::Metadata(kind))
        }
        AttributeKind::Firmware => {
            device.firmware = Some(FirmwareVersion::decode(&value.value)?);
            Ok(Decoded::Metadata(kind))
        }
        AttributeKind::Battery => {
            check_len("battery", 1, &value.value)?;
            device.battery = Some(value.value[0]);
            Ok(Decoded::Metadata(kind))
        }
        AttributeKind::Other => Ok(Decoded::Ignored),
    }
}

fn check_len(kind: &'static str, expected: usize, payload: &[u8]) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::WrongLength {
            kind,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}
