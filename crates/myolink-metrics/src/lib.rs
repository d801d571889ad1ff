//! Metrics infrastructure for the myolink bridge.
//!
//! This crate describes every metric the driver records. It re-exports the
//! `metrics` crate and declares each metric as a structured [`Metric`]
//! constant so names are never typed twice.
//!
//! With the `prometheus` feature, `install_prometheus` serves them over HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use myolink_metrics::{LinkLabels, metric_defs, describe_metrics};
//!
//! describe_metrics();
//!
//! let labels = LinkLabels::new("left_arm");
//! metrics::counter!(metric_defs::FRAMES_RECEIVED.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, Unit};

/// Whether a link metric only grows or tracks a current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Frames, commands, samples and errors.
    Counter,
    /// Devices currently held.
    Gauge,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, kind and help text of one bridge metric, built in `const` context
/// so the table in [`metric_defs`] is the only place a name is spelled.
///
/// ```rust
/// use myolink_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("myolink.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["link"]);
///
/// assert_eq!(FRAMES.name, "myolink.frames");
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    /// Help text handed to the exporter.
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Label keys every recording site attaches; `["link"]` for all of ours.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Hand the help text and unit to whichever recorder is installed.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
        }
    }
}

/// All metric definitions for the bridge.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every link-scoped metric.
    pub const LINK_LABELS: &[&str] = &["link"];

    // ========================================================================
    // Transport
    // ========================================================================

    /// Complete frames extracted from the serial stream.
    pub const FRAMES_RECEIVED: Metric = Metric::counter("myolink.link.frames_received")
        .with_description("Complete frames extracted from the serial stream")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Frames outside the supported protocol table.
    pub const FRAMES_UNRECOGNIZED: Metric = Metric::counter("myolink.link.frames_unrecognized")
        .with_description("Frames outside the supported protocol table")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Commands written to the dongle.
    pub const COMMANDS_SENT: Metric = Metric::counter("myolink.link.commands_sent")
        .with_description("Commands written to the dongle")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    // ========================================================================
    // Devices
    // ========================================================================

    /// Devices currently held in the registry.
    pub const DEVICES_CONNECTED: Metric = Metric::gauge("myolink.devices.connected")
        .with_description("Devices currently held in the registry")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    // ========================================================================
    // Samples
    // ========================================================================

    /// Muscle-activity samples decoded.
    pub const EMG_SAMPLES: Metric = Metric::counter("myolink.samples.emg")
        .with_description("Muscle-activity samples decoded")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Motion samples decoded.
    pub const MOTION_SAMPLES: Metric = Metric::counter("myolink.samples.motion")
        .with_description("Motion samples decoded")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Payloads that failed to decode or could not be attributed.
    pub const DECODE_ERRORS: Metric = Metric::counter("myolink.samples.decode_errors")
        .with_description("Payloads that failed to decode or could not be attributed")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Samples the sink refused.
    pub const PUBLISH_ERRORS: Metric = Metric::counter("myolink.samples.publish_errors")
        .with_description("Samples the sink refused")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// All metrics, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &FRAMES_RECEIVED,
        &FRAMES_UNRECOGNIZED,
        &COMMANDS_SENT,
        &DEVICES_CONNECTED,
        &EMG_SAMPLES,
        &MOTION_SAMPLES,
        &DECODE_ERRORS,
        &PUBLISH_ERRORS,
    ];
}

/// Labels identifying the radio link a metric belongs to.
#[derive(Debug, Clone)]
pub struct LinkLabels {
    pub link: String,
}

impl LinkLabels {
    pub fn new(link: impl Into<String>) -> Self {
        Self { link: link.into() }
    }

    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("link", self.link.clone())]
    }
}

/// Describes all metrics. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a global recorder serving every metric over HTTP on `addr`, in
/// Prometheus text format.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(addr: std::net::SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_labels() {
        let labels = LinkLabels::new("left_arm");
        assert_eq!(labels.to_labels(), vec![("link", "left_arm".to_string())]);
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::FRAMES_RECEIVED.name, "myolink.link.frames_received");
        assert_eq!(metric_defs::FRAMES_RECEIVED.kind, MetricKind::Counter);
        assert_eq!(metric_defs::DEVICES_CONNECTED.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::DECODE_ERRORS.unit, Some(Unit::Count));
    }

    #[test]
    fn test_all_metrics_link_scoped_and_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());

        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("myolink."));
            assert_eq!(metric.labels, metric_defs::LINK_LABELS);
        }
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
