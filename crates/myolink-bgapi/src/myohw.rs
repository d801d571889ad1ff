//! Myo armband attribute table and command payloads.
//!
//! The armband exposes a fixed GATT layout, so attributes are addressed by
//! their well-known handles instead of being discovered.

use crate::commands::Command;

// ============================================================================
// Attribute Handles
// ============================================================================

/// Device name characteristic.
pub const HANDLE_DEVICE_NAME: u16 = 0x03;
/// Battery level characteristic.
pub const HANDLE_BATTERY: u16 = 0x11;
/// Firmware version characteristic.
pub const HANDLE_FIRMWARE_VERSION: u16 = 0x17;
/// Command characteristic (write-only).
pub const HANDLE_COMMAND: u16 = 0x19;
/// Motion data characteristic.
pub const HANDLE_IMU_DATA: u16 = 0x1C;
/// Motion data notification descriptor.
pub const HANDLE_IMU_DESCRIPTOR: u16 = 0x1D;
/// Muscle-activity data characteristics, one per stream.
pub const HANDLES_EMG_DATA: [u16; 4] = [0x2B, 0x2E, 0x31, 0x34];
/// Muscle-activity notification descriptors, one per stream.
pub const HANDLES_EMG_DESCRIPTOR: [u16; 4] = [0x2C, 0x2F, 0x32, 0x35];

/// Service id advertised by armbands, in advertisement byte order.
pub const MYO_SERVICE_ID: [u8; 16] = [
    0x42, 0x48, 0x12, 0x4A, 0x7F, 0x2C, 0x48, 0x47, 0xB9, 0xDE, 0x04, 0xA9, 0x01, 0x00, 0x06, 0xD5,
];

/// Client configuration value enabling notifications.
pub const ENABLE_NOTIFICATIONS: [u8; 2] = [0x01, 0x00];

// ============================================================================
// Sample Layout
// ============================================================================

/// Channels per muscle-activity sample.
pub const EMG_CHANNELS: usize = 8;
/// Samples packed in one muscle-activity notification.
pub const EMG_SAMPLES_PER_NOTIFICATION: usize = 2;
/// Muscle-activity notification payload size.
pub const EMG_PAYLOAD_SIZE: usize = EMG_CHANNELS * EMG_SAMPLES_PER_NOTIFICATION;
/// Orientation quaternion components.
pub const IMU_ORIENTATION_COMPONENTS: usize = 4;
/// Accelerometer axes.
pub const IMU_ACCEL_COMPONENTS: usize = 3;
/// Gyroscope axes.
pub const IMU_GYRO_COMPONENTS: usize = 3;
/// Motion notification payload size.
pub const IMU_PAYLOAD_SIZE: usize =
    2 * (IMU_ORIENTATION_COMPONENTS + IMU_ACCEL_COMPONENTS + IMU_GYRO_COMPONENTS);

/// Raw orientation units per unit quaternion.
pub const ORIENTATION_SCALE: f32 = 16384.0;
/// Raw accelerometer units per g.
pub const ACCELEROMETER_SCALE: f32 = 2048.0;
/// Raw gyroscope units per degree/second.
pub const GYROSCOPE_SCALE: f32 = 16.0;

// ============================================================================
// Armband Commands
// ============================================================================

const COMMAND_SET_MODE: u8 = 0x01;
const COMMAND_VIBRATE: u8 = 0x03;
const COMMAND_DEEP_SLEEP: u8 = 0x04;
const COMMAND_SET_SLEEP_MODE: u8 = 0x09;

/// Muscle-activity streaming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmgMode {
    /// Do not stream.
    None,
    /// Filtered samples.
    #[default]
    Filtered,
    /// Raw, unfiltered samples.
    Raw,
}

impl From<EmgMode> for u8 {
    fn from(mode: EmgMode) -> Self {
        match mode {
            EmgMode::None => 0x00,
            EmgMode::Filtered => 0x02,
            EmgMode::Raw => 0x03,
        }
    }
}

/// Motion streaming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImuMode {
    /// Do not stream.
    None,
    /// Orientation, accelerometer and gyroscope data.
    #[default]
    Data,
}

impl From<ImuMode> for u8 {
    fn from(mode: ImuMode) -> Self {
        match mode {
            ImuMode::None => 0x00,
            ImuMode::Data => 0x01,
        }
    }
}

/// Vibration length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vibration {
    /// Short buzz.
    Short,
    /// Medium buzz.
    Medium,
    /// Long buzz.
    Long,
}

impl From<Vibration> for u8 {
    fn from(kind: Vibration) -> Self {
        match kind {
            Vibration::Short => 0x01,
            Vibration::Medium => 0x02,
            Vibration::Long => 0x03,
        }
    }
}

/// Automatic sleep behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    /// Sleep after inactivity.
    Normal,
    /// Stay awake while connected.
    NeverSleep,
}

impl From<SleepMode> for u8 {
    fn from(mode: SleepMode) -> Self {
        match mode {
            SleepMode::Normal => 0x00,
            SleepMode::NeverSleep => 0x01,
        }
    }
}

fn write_command(connection: u8, data: Vec<u8>) -> Command {
    Command::AttributeWrite {
        connection,
        handle: HANDLE_COMMAND,
        data,
    }
}

/// Select which streams the armband produces.
pub fn set_mode(connection: u8, emg: EmgMode, imu: ImuMode) -> Command {
    // Trailing byte is the on-board classifier, always disabled
    write_command(connection, vec![COMMAND_SET_MODE, 3, emg.into(), imu.into(), 0x00])
}

/// Buzz the armband.
pub fn vibrate(connection: u8, kind: Vibration) -> Command {
    write_command(connection, vec![COMMAND_VIBRATE, 1, kind.into()])
}

/// Put the armband into deep sleep. It drops the connection and stops advertising.
pub fn deep_sleep(connection: u8) -> Command {
    write_command(connection, vec![COMMAND_DEEP_SLEEP, 0])
}

/// Change the automatic sleep behaviour.
pub fn set_sleep_mode(connection: u8, mode: SleepMode) -> Command {
    write_command(connection, vec![COMMAND_SET_SLEEP_MODE, 1, mode.into()])
}

/// Subscribe to notifications on a descriptor.
pub fn enable_notifications(connection: u8, descriptor: u16) -> Command {
    Command::AttributeWrite {
        connection,
        handle: descriptor,
        data: ENABLE_NOTIFICATIONS.to_vec(),
    }
}

/// Read an attribute.
pub fn read(connection: u8, handle: u16) -> Command {
    Command::ReadByHandle { connection, handle }
}
