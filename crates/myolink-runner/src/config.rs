//! Bridge configuration.
//!
//! Settings come from an optional YAML file, every field defaulted, and are
//! then overridden by command-line flags. Each serial link becomes one
//! [`LinkPlan`] carrying the driver settings for that dongle.
//!
//! ```yaml
//! devices_per_link: 2
//! osc_host: 127.0.0.1
//! osc_port: 3000
//! emg: raw
//! links:
//!   - path: /dev/ttyACM0
//!     label: left
//!     address: c5:17:05:e2:92:24
//!   - path: /dev/ttyACM1
//!     label: right
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use myolink_bgapi::myohw::{EmgMode, ImuMode};
use myolink_bgapi::Address;
use myolink_driver::{DiscoveryFilter, DriverConfig};
use serde::Deserialize;

use crate::error::RunnerError;

/// Label used when a link doesn't name one.
pub const DEFAULT_LABEL: &str = "myo";

// ============================================================================
// Stream modes
// ============================================================================

/// Muscle-activity stream setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmgStream {
    None,
    #[default]
    Filtered,
    Raw,
}

impl From<EmgStream> for EmgMode {
    fn from(stream: EmgStream) -> Self {
        match stream {
            EmgStream::None => EmgMode::None,
            EmgStream::Filtered => EmgMode::Filtered,
            EmgStream::Raw => EmgMode::Raw,
        }
    }
}

/// Motion stream setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImuStream {
    None,
    #[default]
    Data,
}

impl From<ImuStream> for ImuMode {
    fn from(stream: ImuStream) -> Self {
        match stream {
            ImuStream::None => ImuMode::None,
            ImuStream::Data => ImuMode::Data,
        }
    }
}

// ============================================================================
// Links
// ============================================================================

/// One radio dongle: `PATH[=LABEL[@ADDRESS]]` on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkSpec {
    /// Serial port path.
    pub path: String,
    /// Label for logs, metrics and OSC paths.
    #[serde(default)]
    pub label: Option<String>,
    /// Hardware address the link must pair with.
    #[serde(default)]
    pub address: Option<String>,
}

impl FromStr for LinkSpec {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RunnerError::InvalidLink {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let (path, rest) = match s.split_once('=') {
            Some((path, rest)) => (path, Some(rest)),
            None => (s, None),
        };
        if path.is_empty() {
            return Err(invalid("missing serial port path"));
        }

        let (label, address) = match rest.map(|r| r.split_once('@')) {
            None => (None, None),
            Some(None) => (rest, None),
            Some(Some((label, address))) => (Some(label), Some(address)),
        };
        if address == Some("") {
            return Err(invalid("empty address"));
        }

        Ok(LinkSpec {
            path: path.to_string(),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            address: address.map(str::to_string),
        })
    }
}

/// Everything needed to start one link thread.
#[derive(Debug, Clone)]
pub struct LinkPlan {
    pub path: String,
    pub driver: DriverConfig,
}

// ============================================================================
// Bridge configuration
// ============================================================================

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Armbands to acquire on each link.
    pub devices_per_link: usize,
    pub osc_host: String,
    pub osc_port: u16,
    pub verbose: bool,
    /// Pause after every command written to a dongle.
    pub command_delay_ms: u64,
    /// Deep-sleep armbands on exit instead of disconnecting.
    pub deep_sleep_on_exit: bool,
    pub emg: EmgStream,
    pub imu: ImuStream,
    pub links: Vec<LinkSpec>,
    /// Serve Prometheus metrics on this port (needs the `prometheus` feature).
    pub metrics_port: Option<u16>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            devices_per_link: 1,
            osc_host: "127.0.0.1".to_string(),
            osc_port: 3000,
            verbose: false,
            command_delay_ms: 10,
            deep_sleep_on_exit: false,
            emg: EmgStream::default(),
            imu: ImuStream::default(),
            links: Vec::new(),
            metrics_port: None,
        }
    }
}

impl BridgeConfig {
    /// Load a YAML file.
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, RunnerError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    /// `host:port` samples are published to.
    pub fn osc_target(&self) -> String {
        format!("{}:{}", self.osc_host, self.osc_port)
    }

    /// Validate links and build the per-link driver settings.
    pub fn link_plans(&self) -> Result<Vec<LinkPlan>, RunnerError> {
        if self.links.is_empty() {
            return Err(RunnerError::NoLinks);
        }

        let mut labels = HashSet::new();
        let mut plans = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let invalid = |reason: String| RunnerError::InvalidLink {
                spec: link.path.clone(),
                reason,
            };

            if self.devices_per_link == 0 {
                return Err(invalid("at least one device per link is required".to_string()));
            }

            let label = link.label.clone().unwrap_or_else(|| DEFAULT_LABEL.to_string());
            if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                return Err(invalid(format!("label '{}' may only hold letters, digits, '_' and '-'", label)));
            }
            if !labels.insert(label.clone()) {
                return Err(invalid(format!("label '{}' is used by another link", label)));
            }

            let mut filter = DiscoveryFilter::default();
            if let Some(address) = &link.address {
                let address: Address = address.parse().map_err(|e| invalid(format!("{}", e)))?;
                filter = filter.with_address(address);
            }

            plans.push(LinkPlan {
                path: link.path.clone(),
                driver: DriverConfig {
                    target_devices: self.devices_per_link,
                    label,
                    emg_mode: self.emg.into(),
                    imu_mode: self.imu.into(),
                    filter,
                },
            });
        }
        Ok(plans)
    }
}
