//! Error types for the bridge binary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting the bridge up.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("couldn't read {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid link '{spec}': {reason}")]
    InvalidLink { spec: String, reason: String },

    #[error("no serial link configured (use --serial PATH)")]
    NoLinks,

    #[error("OSC error: {0}")]
    Osc(String),

    #[error("couldn't start the metrics exporter: {0}")]
    Metrics(String),

    #[error("couldn't install the interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
