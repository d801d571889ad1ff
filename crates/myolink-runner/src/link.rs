//! One thread per radio dongle.
//!
//! Every link runs the full driver sequence on its own thread: acquire the
//! armbands, read their info, then either stream until cancelled or put them
//! to sleep. Whatever happens, the link tears its devices down before the
//! thread reports back. A transport failure on any link cancels them all.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use myolink_driver::{
    CancelToken, DriverError, MyoDriver, SampleSink, TeardownMode, TeardownReport, Transport,
};
use tracing::{error, info, info_span, warn};

use crate::config::LinkPlan;
use crate::error::RunnerError;

/// What the link does once its armbands are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Enable the data streams and publish until cancelled.
    Stream,
    /// Deep-sleep the armbands right after reading their info.
    Shutdown,
}

/// Settings shared by every link.
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions {
    pub mode: LinkMode,
    pub command_delay: Duration,
    /// Deep-sleep instead of disconnect when the link ends.
    pub deep_sleep_on_exit: bool,
}

impl LinkOptions {
    /// How devices are released at the end of the link.
    pub fn teardown_mode(&self) -> TeardownMode {
        if self.mode == LinkMode::Shutdown || self.deep_sleep_on_exit {
            TeardownMode::DeepSleep
        } else {
            TeardownMode::Disconnect
        }
    }
}

/// Final report of one link thread.
#[derive(Debug)]
pub struct LinkReport {
    pub label: String,
    /// `Err` if the link stopped for any reason other than a clean finish.
    pub result: Result<(), DriverError>,
    /// Absent if the serial port never opened.
    pub teardown: Option<TeardownReport>,
}

impl LinkReport {
    /// Ended cleanly or by operator request.
    pub fn is_success(&self) -> bool {
        let stopped_cleanly = matches!(self.result, Ok(()) | Err(DriverError::Interrupted));
        let released_all = self.teardown.as_ref().map_or(true, TeardownReport::is_complete);
        stopped_cleanly && released_all
    }
}

/// Run the driver sequence, then tear down with the configured mode.
pub fn drive<S: SampleSink>(driver: &mut MyoDriver<S>, options: &LinkOptions) -> (Result<(), DriverError>, TeardownReport) {
    let result = run_sequence(driver, options.mode);
    match &result {
        Ok(()) => {}
        Err(DriverError::Interrupted) => info!("interrupted"),
        Err(e) => error!("{}", e),
    }

    let report = driver.teardown(options.teardown_mode());
    for outcome in report.failures() {
        if let Err(reason) = &outcome.result {
            error!(address = %outcome.address, "couldn't release armband: {}", reason);
        }
    }
    (result, report)
}

fn run_sequence<S: SampleSink>(driver: &mut MyoDriver<S>, mode: LinkMode) -> Result<(), DriverError> {
    driver.run()?;
    driver.get_info()?;
    match mode {
        LinkMode::Shutdown => Ok(()),
        LinkMode::Stream => {
            driver.enable_data_all()?;
            info!("ready for data");
            driver.stream()
        }
    }
}

/// Open the dongle and run the link on a named thread. The report is sent on
/// `reports` when the thread finishes.
pub fn spawn_link<S>(
    plan: LinkPlan,
    sink: S,
    options: LinkOptions,
    cancel: CancelToken,
    reports: Sender<LinkReport>,
) -> std::io::Result<JoinHandle<()>>
where
    S: SampleSink + Send + 'static,
{
    thread::Builder::new()
        .name(format!("link-{}", plan.driver.label))
        .spawn(move || {
            let label = plan.driver.label.clone();
            let span = info_span!("link", %label);
            let _enter = span.enter();

            let report = match Transport::open(&plan.path, options.command_delay) {
                Ok(transport) => {
                    info!(path = %plan.path, "serial port open");
                    let mut driver = MyoDriver::new(transport, plan.driver, sink, cancel.clone());
                    let (result, teardown) = drive(&mut driver, &options);
                    LinkReport {
                        label,
                        result,
                        teardown: Some(teardown),
                    }
                }
                Err(e) => {
                    error!("{}", e);
                    LinkReport {
                        label,
                        result: Err(e),
                        teardown: None,
                    }
                }
            };

            if let Err(e) = &report.result {
                if e.is_transport_fatal() {
                    cancel.cancel();
                }
            }
            // Receiver gone means the process is already exiting
            let _ = reports.send(report);
        })
}

/// Start every link with `spawn`, hand each report to `on_report` as it
/// arrives, and join every started thread.
///
/// If a link fails to start, the links already running are cancelled and
/// still drained and joined before the start error is returned. Otherwise
/// returns whether every link succeeded.
pub fn supervise<L, F, R>(links: Vec<L>, cancel: &CancelToken, mut spawn: F, mut on_report: R) -> Result<bool, RunnerError>
where
    F: FnMut(L, Sender<LinkReport>) -> io::Result<JoinHandle<()>>,
    R: FnMut(&LinkReport),
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut handles = Vec::with_capacity(links.len());
    let mut start_error = None;
    for link in links {
        match spawn(link, tx.clone()) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                error!("couldn't start link thread: {}", e);
                cancel.cancel();
                start_error = Some(e);
                break;
            }
        }
    }
    drop(tx);

    let mut all_ok = true;
    for report in rx.iter() {
        on_report(&report);
        all_ok &= report.is_success();
    }

    for handle in handles {
        if handle.join().is_err() {
            warn!("a link thread panicked");
            all_ok = false;
        }
    }

    match start_error {
        Some(e) => Err(e.into()),
        None => Ok(all_ok),
    }
}
