//! Myo armband to OSC bridge
//!
//! Wires the driver to the outside world: command-line and YAML
//! configuration, one thread per radio dongle, and an OSC publishing sink.

pub mod cli;
pub mod config;
pub mod error;
pub mod link;
pub mod osc;

pub use cli::Cli;
pub use config::{BridgeConfig, EmgStream, ImuStream, LinkPlan, LinkSpec};
pub use error::RunnerError;
pub use link::{drive, spawn_link, supervise, LinkMode, LinkOptions, LinkReport};
pub use osc::OscSink;
