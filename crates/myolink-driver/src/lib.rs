//! Myo armband driver
//!
//! Drives one BGAPI radio dongle: reassembles frames from the serial link,
//! routes them to handlers, walks each armband from discovery to streaming,
//! and decodes muscle-activity and motion notifications into samples for a
//! [`SampleSink`].
//!
//! Everything runs on the caller's thread. Waiting is a loop that drains the
//! serial link until a condition on the driver state holds, checking the
//! [`CancelToken`] on every pass.
//!
//! ```rust,ignore
//! let transport = Transport::open("/dev/ttyACM0", Duration::from_millis(10))?;
//! let mut driver = MyoDriver::new(transport, DriverConfig::default(), sink, cancel);
//! driver.run()?;
//! driver.get_info()?;
//! driver.enable_data_all()?;
//! driver.stream()?;
//! driver.teardown(TeardownMode::Disconnect);
//! ```

pub mod cancel;
pub mod decoder;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod registry;
pub mod session;
pub mod sink;
pub mod transport;

pub use cancel::CancelToken;
pub use decoder::{AttributeKind, EmgSample, MotionSample};
pub use dispatcher::{Dispatcher, EventKind, Handler};
pub use driver::{DriverConfig, MyoDriver, TeardownMode, TeardownOutcome, TeardownReport};
pub use error::{DecodeError, DriverError, Result};
pub use registry::{Device, DeviceSlot, Registry};
pub use session::{DiscoveryFilter, Session};
pub use sink::{MemorySink, SampleSink, SinkError};
pub use transport::{Link, Transport};
