//! OSC-over-UDP publishing.
//!
//! Each device slot gets its own address space under the link label:
//! `/<label><slot>/emg` carries eight int channels and `/<label><slot>/imu`
//! carries ten floats (orientation w x y z, acceleration in g, angular
//! velocity in deg/s).

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use myolink_driver::{Device, DeviceSlot, EmgSample, MotionSample, SampleSink, SinkError};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use tracing::debug;

use crate::error::RunnerError;

/// Path for muscle-activity messages.
pub fn emg_path(label: &str, slot: DeviceSlot) -> String {
    format!("/{}{}/emg", label, slot.0)
}

/// Path for motion messages.
pub fn imu_path(label: &str, slot: DeviceSlot) -> String {
    format!("/{}{}/imu", label, slot.0)
}

/// Sends every sample as one OSC message datagram.
pub struct OscSink {
    socket: UdpSocket,
    target: SocketAddr,
    label: String,
}

impl OscSink {
    /// Resolve `target` (`host:port`) and bind a local socket for it.
    pub fn new(target: &str, label: impl Into<String>) -> Result<Self, RunnerError> {
        let target = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RunnerError::Osc(format!("{} does not resolve to an address", target)))?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        debug!(%target, local = ?socket.local_addr().ok(), "osc socket ready");

        Ok(OscSink {
            socket,
            target,
            label: label.into(),
        })
    }

    /// Where datagrams are sent.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn send(&self, addr: String, args: Vec<OscType>) -> Result<(), SinkError> {
        let packet = OscPacket::Message(OscMessage { addr, args });
        let bytes = encoder::encode(&packet).map_err(|e| format!("couldn't encode OSC packet: {:?}", e))?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }
}

impl SampleSink for OscSink {
    fn publish_emg(&mut self, _device: &Device, sample: &EmgSample) -> Result<(), SinkError> {
        let args = sample.channels.iter().map(|c| OscType::Int(i32::from(*c))).collect();
        self.send(emg_path(&self.label, sample.device), args)
    }

    fn publish_motion(&mut self, _device: &Device, sample: &MotionSample) -> Result<(), SinkError> {
        let args = sample
            .orientation_scaled()
            .into_iter()
            .chain(sample.accelerometer_scaled())
            .chain(sample.gyroscope_scaled())
            .map(OscType::Float)
            .collect();
        self.send(imu_path(&self.label, sample.device), args)
    }
}
