//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BridgeConfig, EmgStream, ImuStream, LinkSpec};
use crate::error::RunnerError;

/// Bridge Myo armbands to OSC through BGAPI radio dongles.
#[derive(Debug, Parser)]
#[command(name = "myolink", version, about)]
pub struct Cli {
    /// Acquire the armbands, read their info, put them into deep sleep and exit
    #[arg(short, long)]
    pub shutdown: bool,

    /// Armbands to expect on each dongle
    #[arg(short = 'n', long = "nmyo", value_name = "COUNT")]
    pub devices: Option<usize>,

    /// OSC destination host
    #[arg(short = 'a', long = "address", value_name = "HOST")]
    pub osc_host: Option<String>,

    /// OSC destination port
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub osc_port: Option<u16>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Dongle serial port, optionally with a label and the armband address to
    /// pair with. Repeat for several dongles.
    #[arg(long = "serial", value_name = "PATH[=LABEL[@ADDRESS]]")]
    pub links: Vec<LinkSpec>,

    /// Pause after each command written to a dongle, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Deep-sleep the armbands on exit instead of disconnecting them
    #[arg(long)]
    pub deep_sleep: bool,

    /// Muscle-activity stream
    #[arg(long, value_enum)]
    pub emg: Option<EmgStream>,

    /// Motion stream
    #[arg(long, value_enum)]
    pub imu: Option<ImuStream>,

    /// Serve Prometheus metrics on this port
    #[arg(long, value_name = "PORT")]
    pub metrics_port: Option<u16>,

    /// YAML configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load the configuration file, if any, and apply flag overrides.
    pub fn resolve(&self) -> Result<BridgeConfig, RunnerError> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Flags given on the command line replace configured values. Links given
    /// on the command line replace the configured link list.
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(devices) = self.devices {
            config.devices_per_link = devices;
        }
        if let Some(host) = &self.osc_host {
            config.osc_host = host.clone();
        }
        if let Some(port) = self.osc_port {
            config.osc_port = port;
        }
        if let Some(delay) = self.delay_ms {
            config.command_delay_ms = delay;
        }
        if let Some(emg) = self.emg {
            config.emg = emg;
        }
        if let Some(imu) = self.imu {
            config.imu = imu;
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = Some(port);
        }
        if !self.links.is_empty() {
            config.links = self.links.clone();
        }
        config.verbose |= self.verbose;
        config.deep_sleep_on_exit |= self.deep_sleep;
    }
}
