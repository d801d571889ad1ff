//! Connection orchestrator for one radio dongle.
//!
//! [`MyoDriver`] owns the transport, the dispatcher and all per-link state.
//! Acquisition runs one device at a time: scan, pick a candidate, connect,
//! configure, admit. Every wait is a loop over [`MyoDriver::receive`] that
//! checks the cancel token and a condition on the driver state on each pass.

use std::fmt;

use myolink_bgapi::myohw::{
    self, EmgMode, ImuMode, SleepMode, Vibration, HANDLES_EMG_DESCRIPTOR, HANDLE_BATTERY, HANDLE_DEVICE_NAME,
    HANDLE_FIRMWARE_VERSION, HANDLE_IMU_DESCRIPTOR,
};
use myolink_bgapi::{
    Address, Command, DiscoverMode, Event, Message, Response, CLASS_ATTCLIENT, EVT_ATTCLIENT_ATTRIBUTE_VALUE,
    MAX_CONNECTIONS, RESULT_OK,
};
use myolink_metrics::{metric_defs, metrics, LinkLabels};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::decoder::{self, Decoded};
use crate::dispatcher::{Dispatcher, EventKind};
use crate::error::{DriverError, Result};
use crate::registry::{Device, DeviceSlot, Registry};
use crate::session::{DiscoveryFilter, Session};
use crate::sink::SampleSink;
use crate::transport::Transport;

// ============================================================================
// Configuration
// ============================================================================

/// Per-link driver settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Devices to acquire on this link.
    pub target_devices: usize,
    /// Link label for logs, metrics and published paths.
    pub label: String,
    pub emg_mode: EmgMode,
    pub imu_mode: ImuMode,
    /// Which advertisers may be paired.
    pub filter: DiscoveryFilter,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            target_devices: 1,
            label: "myo".to_string(),
            emg_mode: EmgMode::default(),
            imu_mode: ImuMode::default(),
            filter: DiscoveryFilter::default(),
        }
    }
}

// ============================================================================
// Teardown
// ============================================================================

/// How devices are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    /// Drop the radio connection; the armband keeps advertising.
    Disconnect,
    /// Put the armband into deep sleep.
    DeepSleep,
}

impl fmt::Display for TeardownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownMode::Disconnect => f.write_str("disconnect"),
            TeardownMode::DeepSleep => f.write_str("deep sleep"),
        }
    }
}

/// What happened to one device during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub address: Address,
    pub connection: u8,
    /// `Err` holds the reason the command could not be sent.
    pub result: std::result::Result<(), String>,
}

/// Per-device teardown results, in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub mode: TeardownMode,
    pub outcomes: Vec<TeardownOutcome>,
}

impl TeardownReport {
    pub fn failures(&self) -> impl Iterator<Item = &TeardownOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

// ============================================================================
// Handler context
// ============================================================================

/// State shared by all frame handlers of one link.
pub struct DriverState<S> {
    registry: Registry,
    session: Session,
    filter: DiscoveryFilter,
    sink: S,
    labels: Vec<(&'static str, String)>,
}

impl<S> DriverState<S> {
    fn update_device_gauge(&self) {
        metrics::gauge!(metric_defs::DEVICES_CONNECTED.name, &self.labels).set(self.registry.len() as f64);
    }
}

fn on_scan_response<S>(state: &mut DriverState<S>, message: &Message) -> Result<()> {
    if let Message::Event(Event::ScanResponse(adv)) = message {
        let session = std::mem::take(&mut state.session);
        state.session = session.on_advertisement(adv, &state.filter, &state.registry);
        if state.session.has_candidate() {
            info!(address = %adv.sender, rssi = adv.rssi, "found armband");
        }
    }
    Ok(())
}

fn on_connect_response<S>(_state: &mut DriverState<S>, message: &Message) -> Result<()> {
    if let Message::Response(Response::GapConnectDirect { result, connection }) = message {
        if *result != RESULT_OK {
            return Err(DriverError::Rejected {
                command: "gap_connect_direct",
                result: *result,
            });
        }
        debug!(connection, "connect request accepted");
    }
    Ok(())
}

fn on_connection_status<S>(state: &mut DriverState<S>, message: &Message) -> Result<()> {
    if let Message::Event(Event::ConnectionStatus(status)) = message {
        debug!(
            connection = status.connection,
            flags = status.flags,
            address = %status.address,
            "connection status"
        );
        let session = std::mem::take(&mut state.session);
        state.session = session.on_connection_status(status);
    }
    Ok(())
}

fn on_disconnected<S>(state: &mut DriverState<S>, message: &Message) -> Result<()> {
    if let Message::Event(Event::Disconnected { connection, reason }) = message {
        match state.registry.remove_by_connection(*connection) {
            Some((slot, device)) => {
                warn!(slot = slot.0, reason, "device {} disconnected", device);
                state.update_device_gauge();
            }
            None => debug!(connection, reason, "connection closed"),
        }
    }
    Ok(())
}

fn on_attribute_value<S: SampleSink>(state: &mut DriverState<S>, message: &Message) -> Result<()> {
    let Message::Event(Event::AttributeValue(value)) = message else {
        return Ok(());
    };

    let decoded = match decoder::apply(&mut state.registry, value) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("dropping attribute value: {}", e);
            metrics::counter!(metric_defs::DECODE_ERRORS.name, &state.labels).increment(1);
            return Ok(());
        }
    };

    let DriverState {
        registry, sink, labels, ..
    } = state;
    match decoded {
        Decoded::Emg(samples) => {
            for sample in &samples {
                let Some(device) = registry.get(sample.device) else {
                    continue;
                };
                if let Err(e) = sink.publish_emg(device, sample) {
                    warn!(slot = sample.device.0, "couldn't publish emg sample: {}", e);
                    metrics::counter!(metric_defs::PUBLISH_ERRORS.name, &*labels).increment(1);
                }
            }
            metrics::counter!(metric_defs::EMG_SAMPLES.name, &*labels).increment(samples.len() as u64);
        }
        Decoded::Motion(sample) => {
            if let Some(device) = registry.get(sample.device) {
                if let Err(e) = sink.publish_motion(device, &sample) {
                    warn!(slot = sample.device.0, "couldn't publish motion sample: {}", e);
                    metrics::counter!(metric_defs::PUBLISH_ERRORS.name, &*labels).increment(1);
                }
            }
            metrics::counter!(metric_defs::MOTION_SAMPLES.name, &*labels).increment(1);
        }
        Decoded::Metadata(kind) => {
            debug!(connection = value.connection, ?kind, "device info updated");
        }
        Decoded::Ignored => {
            debug!(connection = value.connection, handle = value.handle, "ignoring attribute");
        }
    }
    Ok(())
}

fn on_response<S>(_state: &mut DriverState<S>, message: &Message) -> Result<()> {
    let Message::Response(response) = message else {
        return Ok(());
    };
    if response.result() == RESULT_OK {
        return Ok(());
    }

    match response {
        // Expected during the stale connection sweep
        Response::Disconnect { connection, result } => {
            debug!(connection, result, "disconnect not applied");
        }
        Response::GapEndProcedure { result } => {
            debug!(result, "no procedure to end");
        }
        other => warn!("command failed: {:?}", other),
    }
    Ok(())
}

fn on_procedure_completed<S>(_state: &mut DriverState<S>, message: &Message) -> Result<()> {
    if let Message::Event(Event::ProcedureCompleted {
        connection,
        result,
        handle,
    }) = message
    {
        if *result != RESULT_OK {
            warn!(connection, handle, result, "attribute procedure failed");
        }
    }
    Ok(())
}

fn on_unrecognized<S>(state: &mut DriverState<S>, message: &Message) -> Result<()> {
    let Message::Unrecognized(frame) = message else {
        return Ok(());
    };

    // Attribute values only land here when their payload didn't decode
    if frame.is_event() && (frame.class, frame.command) == (CLASS_ATTCLIENT, EVT_ATTCLIENT_ATTRIBUTE_VALUE) {
        warn!(len = frame.payload.len(), "dropping malformed attribute value");
        metrics::counter!(metric_defs::DECODE_ERRORS.name, &state.labels).increment(1);
        return Ok(());
    }

    debug!(
        class = frame.class,
        command = frame.command,
        event = frame.is_event(),
        len = frame.payload.len(),
        "unrecognized frame"
    );
    metrics::counter!(metric_defs::FRAMES_UNRECOGNIZED.name, &state.labels).increment(1);
    Ok(())
}

// ============================================================================
// Driver
// ============================================================================

/// Drives the armbands behind one dongle.
pub struct MyoDriver<S: SampleSink> {
    transport: Transport,
    dispatcher: Dispatcher<DriverState<S>>,
    state: DriverState<S>,
    config: DriverConfig,
    cancel: CancelToken,
}

impl<S: SampleSink> MyoDriver<S> {
    pub fn new(transport: Transport, config: DriverConfig, sink: S, cancel: CancelToken) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(EventKind::ScanResponse, on_scan_response::<S>);
        dispatcher.register(EventKind::ConnectDirectResponse, on_connect_response::<S>);
        dispatcher.register(EventKind::ConnectionStatus, on_connection_status::<S>);
        dispatcher.register(EventKind::ConnectionDisconnected, on_disconnected::<S>);
        dispatcher.register(EventKind::AttributeValue, on_attribute_value::<S>);
        dispatcher.register(EventKind::ProcedureCompleted, on_procedure_completed::<S>);
        dispatcher.register(EventKind::Unrecognized, on_unrecognized::<S>);
        for kind in [
            EventKind::SetModeResponse,
            EventKind::DiscoverResponse,
            EventKind::EndProcedureResponse,
            EventKind::DisconnectResponse,
            EventKind::ReadByHandleResponse,
            EventKind::AttributeWriteResponse,
        ] {
            dispatcher.register(kind, on_response::<S>);
        }

        let state = DriverState {
            registry: Registry::new(config.target_devices),
            session: Session::Idle,
            filter: config.filter.clone(),
            sink,
            labels: LinkLabels::new(config.label.clone()).to_labels(),
        };

        MyoDriver {
            transport,
            dispatcher,
            state,
            config,
            cancel,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }

    pub fn sink(&self) -> &S {
        &self.state.sink
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Drain the serial link once and dispatch every complete frame.
    pub fn receive(&mut self) -> Result<usize> {
        let MyoDriver {
            transport,
            dispatcher,
            state,
            ..
        } = self;
        let frames = transport.receive(|frame| dispatcher.dispatch(state, &frame).map(|_| ()))?;
        if frames > 0 {
            metrics::counter!(metric_defs::FRAMES_RECEIVED.name, &self.state.labels).increment(frames as u64);
        }
        Ok(frames)
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        self.transport.send(command)?;
        metrics::counter!(metric_defs::COMMANDS_SENT.name, &self.state.labels).increment(1);
        Ok(())
    }

    /// Receive until `check` yields a value. Fails with
    /// [`DriverError::Interrupted`] once the cancel token is set.
    fn wait_for<T>(&mut self, mut check: impl FnMut(&DriverState<S>) -> Option<T>) -> Result<T> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Interrupted);
            }
            if let Some(value) = check(&self.state) {
                return Ok(value);
            }
            self.receive()?;
        }
    }

    /// End any running GAP procedure and disconnect every radio connection
    /// handle, whether or not this process opened it.
    pub fn clear_stale_connections(&mut self) -> Result<()> {
        debug!("clearing stale connections");
        self.send(&Command::GapEndProcedure)?;
        for connection in 0..MAX_CONNECTIONS {
            self.send(&Command::Disconnect { connection })?;
        }
        Ok(())
    }

    /// Acquire one armband: scan, connect, configure and admit it.
    pub fn add_device(&mut self) -> Result<DeviceSlot> {
        let result = self.acquire();
        if result.is_err() {
            self.state.session = Session::Idle;
        }
        result
    }

    fn acquire(&mut self) -> Result<DeviceSlot> {
        info!("scanning");
        self.state.session = Session::Idle.start_scan();
        self.send(&Command::GapDiscover {
            mode: DiscoverMode::Generic,
        })?;

        let address = self.wait_for(|s| match &s.session {
            Session::Candidate(device) => Some(device.address),
            _ => None,
        })?;

        self.send(&Command::GapEndProcedure)?;
        info!(%address, "connecting");
        self.state.session = std::mem::take(&mut self.state.session).begin_connect();
        self.send(&Command::connect_direct(address))?;

        let (device, connection) = self.wait_for(|s| match &s.session {
            Session::Connected(device) => device.connection.map(|c| (device.clone(), c)),
            _ => None,
        })?;

        debug!(connection, "configuring");
        self.send(&myohw::vibrate(connection, Vibration::Short))?;
        self.send(&myohw::set_sleep_mode(connection, SleepMode::NeverSleep))?;

        let slot = self.state.registry.admit(device)?;
        self.state.session = Session::Idle;
        self.state.update_device_gauge();
        info!(slot = slot.0, connection, %address, "armband ready");
        Ok(slot)
    }

    /// Clear stale connections, then acquire devices until the registry holds
    /// the target count.
    pub fn run(&mut self) -> Result<()> {
        self.clear_stale_connections()?;
        while !self.state.registry.is_full() {
            info!(
                "connecting armband {} of {}",
                self.state.registry.len() + 1,
                self.state.registry.capacity()
            );
            self.add_device()?;
        }
        Ok(())
    }

    /// Read name, firmware and battery for every device and wait until all
    /// devices are ready.
    pub fn get_info(&mut self) -> Result<()> {
        let connections = self.connections();
        if connections.is_empty() {
            return Ok(());
        }

        info!("reading device info");
        for connection in connections {
            for handle in [HANDLE_DEVICE_NAME, HANDLE_FIRMWARE_VERSION, HANDLE_BATTERY] {
                self.send(&myohw::read(connection, handle))?;
            }
        }
        self.wait_for(|s| s.registry.all_ready().then_some(()))?;

        for (slot, device) in self.state.registry.iter() {
            info!("{}: {}", slot, device);
        }
        Ok(())
    }

    /// Subscribe every device to the enabled streams and start them.
    pub fn enable_data_all(&mut self) -> Result<()> {
        let emg = self.config.emg_mode;
        let imu = self.config.imu_mode;
        for connection in self.connections() {
            if emg != EmgMode::None {
                for descriptor in HANDLES_EMG_DESCRIPTOR {
                    self.send(&myohw::enable_notifications(connection, descriptor))?;
                }
            }
            if imu != ImuMode::None {
                self.send(&myohw::enable_notifications(connection, HANDLE_IMU_DESCRIPTOR))?;
            }
            self.send(&myohw::set_mode(connection, emg, imu))?;
        }
        info!(?emg, ?imu, "streaming enabled");
        Ok(())
    }

    /// Receive until cancelled. Returns `Ok` on cancellation.
    pub fn stream(&mut self) -> Result<()> {
        while !self.cancel.is_cancelled() {
            self.receive()?;
        }
        info!("stream stopped");
        Ok(())
    }

    /// Release every known device with exactly one command each. A device
    /// still being acquired is included once it has a connection. Failures
    /// are recorded and do not stop the remaining devices.
    pub fn teardown(&mut self, mode: TeardownMode) -> TeardownReport {
        let mut targets: Vec<(Address, u8)> = self
            .state
            .registry
            .iter()
            .filter_map(|(_, d)| d.connection.map(|c| (d.address, c)))
            .collect();
        if let Some(Device {
            address,
            connection: Some(connection),
            ..
        }) = self.state.session.device()
        {
            if !targets.iter().any(|(_, c)| c == connection) {
                targets.push((*address, *connection));
            }
        }

        info!(devices = targets.len(), %mode, "tearing down");
        let mut outcomes = Vec::with_capacity(targets.len());
        for (address, connection) in targets {
            let command = match mode {
                TeardownMode::Disconnect => Command::Disconnect { connection },
                TeardownMode::DeepSleep => myohw::deep_sleep(connection),
            };
            let result = self.send(&command).map_err(|e| e.to_string());
            match &result {
                Ok(()) => info!(%address, connection, "{} sent", mode),
                Err(e) => error!(%address, connection, "{} failed: {}", mode, e),
            }
            outcomes.push(TeardownOutcome {
                address,
                connection,
                result,
            });
        }

        self.state.registry.clear();
        self.state.session = Session::Idle;
        self.state.update_device_gauge();
        TeardownReport { mode, outcomes }
    }

    pub fn disconnect_all(&mut self) -> TeardownReport {
        self.teardown(TeardownMode::Disconnect)
    }

    pub fn deep_sleep_all(&mut self) -> TeardownReport {
        self.teardown(TeardownMode::DeepSleep)
    }

    fn connections(&self) -> Vec<u8> {
        self.state.registry.iter().filter_map(|(_, d)| d.connection).collect()
    }
}
