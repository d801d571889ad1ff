//! Where decoded samples go.

use crate::decoder::{EmgSample, MotionSample};
use crate::registry::Device;

/// Error returned by a sink. Publishing failures are never fatal to the driver.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Accepts decoded samples for publishing.
pub trait SampleSink {
    fn publish_emg(&mut self, device: &Device, sample: &EmgSample) -> Result<(), SinkError>;

    fn publish_motion(&mut self, device: &Device, sample: &MotionSample) -> Result<(), SinkError>;
}

/// Keeps every sample in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub emg: Vec<EmgSample>,
    pub motion: Vec<MotionSample>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleSink for MemorySink {
    fn publish_emg(&mut self, _device: &Device, sample: &EmgSample) -> Result<(), SinkError> {
        self.emg.push(*sample);
        Ok(())
    }

    fn publish_motion(&mut self, _device: &Device, sample: &MotionSample) -> Result<(), SinkError> {
        self.motion.push(*sample);
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn publish_emg(&mut self, device: &Device, sample: &EmgSample) -> Result<(), SinkError> {
        (**self).publish_emg(device, sample)
    }

    fn publish_motion(&mut self, device: &Device, sample: &MotionSample) -> Result<(), SinkError> {
        (**self).publish_motion(device, sample)
    }
}
