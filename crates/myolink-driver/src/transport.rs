//! Serial transport: raw bytes in, complete frames out.
//!
//! The dongle enumerates as a USB serial device. Reads use a short timeout so
//! the caller's wait loops stay responsive to cancellation; a timeout simply
//! yields zero frames.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use myolink_bgapi::{Command, Frame, FrameCodec};
use tracing::trace;

use crate::error::{DriverError, Result};

/// Baud rate the dongle's serial interface is opened with.
pub const BAUD_RATE: u32 = 9600;

/// How long one read may block waiting for bytes.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 512;

/// Anything that can stand in for the serial port.
pub trait Link: Read + Write + Send {}
impl<T: Read + Write + Send> Link for T {}

/// Owns the serial link and the reassembly buffer.
pub struct Transport {
    link: Box<dyn Link>,
    codec: FrameCodec,
    read_buf: Vec<u8>,
    command_delay: Duration,
}

impl Transport {
    /// Open a serial port.
    pub fn open(path: &str, command_delay: Duration) -> Result<Self> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| DriverError::Open {
                path: path.to_string(),
                source,
            })?;

        Ok(Self::new(port, command_delay))
    }

    /// Wrap an already-open link.
    pub fn new(link: impl Link + 'static, command_delay: Duration) -> Self {
        Transport {
            link: Box::new(link),
            codec: FrameCodec::new(),
            read_buf: vec![0u8; READ_CHUNK],
            command_delay,
        }
    }

    /// Read whatever is available and hand every complete frame to `on_frame`,
    /// in stream order. Returns the number of frames handed over.
    ///
    /// If `on_frame` fails, frames behind the failing one stay buffered.
    pub fn receive<F>(&mut self, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(Frame) -> Result<()>,
    {
        let n = match self.link.read(&mut self.read_buf) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => 0,
            Err(e) => return Err(DriverError::Transport(e)),
        };
        self.codec.push(&self.read_buf[..n]);

        let mut frames = 0;
        while let Some(frame) = self.codec.decode() {
            frames += 1;
            on_frame(frame)?;
        }
        Ok(frames)
    }

    /// Encode and write a command, then honour the inter-command delay.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        trace!(command = command.name(), "sending");
        let bytes = command.encode()?;
        self.send_bytes(&bytes)
    }

    /// Write pre-encoded command bytes, then honour the inter-command delay.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.link.write_all(bytes)?;
        self.link.flush()?;
        if !self.command_delay.is_zero() {
            std::thread::sleep(self.command_delay);
        }
        Ok(())
    }

    /// Bytes waiting for the rest of their frame.
    pub fn buffered_len(&self) -> usize {
        self.codec.buffered_len()
    }
}
