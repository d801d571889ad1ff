//! Scripted stand-in for a BGAPI dongle with armbands in range.
//!
//! Commands written to the fake are parsed and answered with the responses
//! and events a real dongle would produce. Replies are served a few bytes per
//! read so frame reassembly is exercised on every test.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use myolink_bgapi::myohw::{HANDLE_BATTERY, HANDLE_DEVICE_NAME, HANDLE_FIRMWARE_VERSION, MYO_SERVICE_ID};
use myolink_bgapi::*;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use myolink_driver::{CancelToken, DriverConfig, MemorySink, MyoDriver, Transport};
use myolink_metrics::metrics;
use parking_lot::Mutex;

const CHUNK: usize = 7;

/// Result code for "not connected".
pub const ERR_NOT_CONNECTED: u16 = 0x0186;

pub fn address(last: u8) -> Address {
    Address::new([0x10, 0x20, 0x30, 0x40, 0x50, last])
}

/// Advertisement data of an armband.
pub fn myo_adv_data() -> Vec<u8> {
    let mut data = vec![0x02, 0x01, 0x06, 0x11, 0x07];
    data.extend_from_slice(&MYO_SERVICE_ID);
    data
}

/// Advertisement data of some other peripheral.
pub fn foreign_adv_data() -> Vec<u8> {
    vec![0x02, 0x01, 0x06, 0x03, 0x03, 0x0D, 0x18]
}

#[derive(Default)]
struct DongleState {
    advertisers: Vec<(Address, Vec<u8>)>,
    connections: HashMap<u8, Address>,
    next_connection: u8,
    connect_result: u16,
    failing_connection: Option<u8>,
    withheld: Vec<(u8, u16)>,
    incoming: FrameCodec,
    outbox: VecDeque<u8>,
    queued: usize,
    sent: Vec<Frame>,
}

impl DongleState {
    fn queue(&mut self, frame: Frame) {
        let bytes = frame.encode().expect("test frame encodes");
        self.outbox.extend(bytes);
        self.queued += 1;
    }

    fn respond(&mut self, class: u8, command: u8, payload: Vec<u8>) {
        self.queue(Frame::command(class, command, payload));
    }

    fn event(&mut self, class: u8, event: u8, payload: Vec<u8>) {
        self.queue(Frame::event(class, event, payload));
    }

    fn should_fail(&self, frame: &Frame) -> bool {
        let targets_connection = matches!(frame.class, CLASS_CONNECTION | CLASS_ATTCLIENT);
        targets_connection && self.failing_connection.is_some() && frame.payload.first() == self.failing_connection.as_ref()
    }

    fn handle(&mut self, frame: Frame) {
        let p = frame.payload.clone();
        match (frame.class, frame.command) {
            (CLASS_GAP, CMD_GAP_DISCOVER) => {
                self.respond(CLASS_GAP, CMD_GAP_DISCOVER, vec![0, 0]);
                for (sender, data) in self.advertisers.clone() {
                    let mut payload = vec![(-55i8) as u8, 0];
                    payload.extend_from_slice(sender.as_bytes());
                    payload.extend_from_slice(&[ADDRESS_TYPE_PUBLIC, 0xFF, data.len() as u8]);
                    payload.extend_from_slice(&data);
                    self.event(CLASS_GAP, EVT_GAP_SCAN_RESPONSE, payload);
                }
            }
            (CLASS_GAP, CMD_GAP_END_PROCEDURE) => {
                self.respond(CLASS_GAP, CMD_GAP_END_PROCEDURE, vec![0, 0]);
            }
            (CLASS_GAP, CMD_GAP_CONNECT_DIRECT) => {
                let target = Address::from_slice(&p[..ADDRESS_SIZE]).expect("address");
                let connection = self.next_connection;
                let [lo, hi] = self.connect_result.to_le_bytes();
                self.respond(CLASS_GAP, CMD_GAP_CONNECT_DIRECT, vec![lo, hi, connection]);
                if self.connect_result != RESULT_OK {
                    return;
                }
                self.next_connection += 1;
                self.connections.insert(connection, target);

                let mut status = vec![connection, CONNECTION_FULLY_CONNECTED];
                status.extend_from_slice(target.as_bytes());
                status.push(ADDRESS_TYPE_PUBLIC);
                status.extend_from_slice(&6u16.to_le_bytes());
                status.extend_from_slice(&64u16.to_le_bytes());
                status.extend_from_slice(&0u16.to_le_bytes());
                status.push(0xFF);
                self.event(CLASS_CONNECTION, EVT_CONNECTION_STATUS, status);
            }
            (CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT) => {
                let connection = p[0];
                if self.connections.remove(&connection).is_some() {
                    self.respond(CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT, vec![connection, 0, 0]);
                    self.event(CLASS_CONNECTION, EVT_CONNECTION_DISCONNECTED, vec![connection, 0x16, 0x00]);
                } else {
                    let [lo, hi] = ERR_NOT_CONNECTED.to_le_bytes();
                    self.respond(CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT, vec![connection, lo, hi]);
                }
            }
            (CLASS_ATTCLIENT, CMD_ATTCLIENT_READ_BY_HANDLE) => {
                let connection = p[0];
                let handle = u16::from_le_bytes([p[1], p[2]]);
                self.respond(CLASS_ATTCLIENT, CMD_ATTCLIENT_READ_BY_HANDLE, vec![connection, 0, 0]);

                let value = match handle {
                    HANDLE_DEVICE_NAME => format!("Myo {}", connection).into_bytes(),
                    HANDLE_FIRMWARE_VERSION => vec![1, 0, 5, 0, 0xB2, 0x07, 2, 0],
                    HANDLE_BATTERY => vec![80 + connection],
                    _ => vec![0],
                };
                if !self.withheld.contains(&(connection, handle)) {
                    self.queue_attribute(connection, handle, 0, &value);
                }
            }
            (CLASS_ATTCLIENT, CMD_ATTCLIENT_ATTRIBUTE_WRITE) => {
                let connection = p[0];
                self.respond(CLASS_ATTCLIENT, CMD_ATTCLIENT_ATTRIBUTE_WRITE, vec![connection, 0, 0]);
                self.event(
                    CLASS_ATTCLIENT,
                    EVT_ATTCLIENT_PROCEDURE_COMPLETED,
                    vec![connection, 0, 0, p[1], p[2]],
                );
            }
            _ => {}
        }
    }

    fn queue_attribute(&mut self, connection: u8, handle: u16, value_type: u8, value: &[u8]) {
        let [lo, hi] = handle.to_le_bytes();
        let mut payload = vec![connection, lo, hi, value_type, value.len() as u8];
        payload.extend_from_slice(value);
        self.event(CLASS_ATTCLIENT, EVT_ATTCLIENT_ATTRIBUTE_VALUE, payload);
    }
}

/// Cloneable handle to the fake; every clone drives the same state.
#[derive(Clone, Default)]
pub struct FakeDongle {
    state: Arc<Mutex<DongleState>>,
}

impl FakeDongle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device that answers discovery.
    pub fn advertise(&self, sender: Address, data: Vec<u8>) {
        self.state.lock().advertisers.push((sender, data));
    }

    /// Result code for subsequent connect requests.
    pub fn set_connect_result(&self, result: u16) {
        self.state.lock().connect_result = result;
    }

    /// Make every later write addressed to `connection` fail.
    pub fn fail_writes_to(&self, connection: u8) {
        self.state.lock().failing_connection = Some(connection);
    }

    /// Acknowledge reads of `handle` on `connection` but never deliver the value.
    pub fn withhold(&self, connection: u8, handle: u16) {
        self.state.lock().withheld.push((connection, handle));
    }

    /// Queue a notification as if the armband streamed it.
    pub fn notify(&self, connection: u8, handle: u16, value: &[u8]) {
        self.state.lock().queue_attribute(connection, handle, 1, value);
    }

    /// Queue an arbitrary event frame.
    pub fn inject_event(&self, class: u8, event: u8, payload: Vec<u8>) {
        self.state.lock().event(class, event, payload);
    }

    /// Frames queued for the driver so far.
    pub fn queued_frames(&self) -> usize {
        self.state.lock().queued
    }

    /// Bytes not yet read by the driver.
    pub fn pending(&self) -> usize {
        self.state.lock().outbox.len()
    }

    /// Drop a link from the radio side.
    pub fn drop_connection(&self, connection: u8) {
        let mut state = self.state.lock();
        state.connections.remove(&connection);
        state.event(CLASS_CONNECTION, EVT_CONNECTION_DISCONNECTED, vec![connection, 0x08, 0x00]);
    }

    /// Every command frame written so far.
    pub fn sent(&self) -> Vec<Frame> {
        self.state.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().connections.len()
    }
}

impl Read for FakeDongle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.outbox.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = CHUNK.min(buf.len()).min(state.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(state.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for FakeDongle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.incoming.push(buf);
        while let Some(frame) = state.incoming.decode() {
            if state.should_fail(&frame) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unreachable"));
            }
            state.sent.push(frame.clone());
            state.handle(frame);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A driver over the fake with no inter-command delay.
pub fn driver(dongle: &FakeDongle, config: DriverConfig) -> MyoDriver<MemorySink> {
    let transport = Transport::new(dongle.clone(), Duration::ZERO);
    MyoDriver::new(transport, config, MemorySink::new(), CancelToken::new())
}

pub fn config(target_devices: usize) -> DriverConfig {
    DriverConfig {
        target_devices,
        ..DriverConfig::default()
    }
}

/// Class and id of each frame, in order.
pub fn ids(frames: &[Frame]) -> Vec<(u8, u8)> {
    frames.iter().map(|f| (f.class, f.command)).collect()
}

/// Metric values recorded on the current thread, summed over labels.
#[derive(Debug, Default)]
pub struct RecordedMetrics {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
}

impl RecordedMetrics {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).copied()
    }
}

/// Run `f` with a thread-local recorder and return what it recorded.
pub fn record_metrics<T>(f: impl FnOnce() -> T) -> (T, RecordedMetrics) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let out = metrics::with_local_recorder(&recorder, f);

    let mut recorded = RecordedMetrics::default();
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        let name = key.key().name().to_string();
        match value {
            DebugValue::Counter(v) => *recorded.counters.entry(name).or_default() += v,
            DebugValue::Gauge(v) => {
                recorded.gauges.insert(name, v.into_inner());
            }
            DebugValue::Histogram(_) => {}
        }
    }
    (out, recorded)
}
