//! Event dispatcher: routes each decoded frame to the handlers registered for
//! its kind.
//!
//! Kinds form a closed enumeration. Each kind owns an ordered list of plain
//! function handlers that receive the driver context and the decoded message.
//! The dispatcher itself knows nothing about the protocol flow.

use myolink_bgapi::{Event, Frame, Message, Response};
use tracing::{debug, warn};

use crate::error::Result;

/// Every frame kind the driver can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ScanResponse,
    ConnectionStatus,
    ConnectionDisconnected,
    AttributeValue,
    ProcedureCompleted,
    SetModeResponse,
    DiscoverResponse,
    ConnectDirectResponse,
    EndProcedureResponse,
    DisconnectResponse,
    ReadByHandleResponse,
    AttributeWriteResponse,
    /// Well-formed frames outside the supported table.
    Unrecognized,
}

impl EventKind {
    /// Number of kinds.
    pub const COUNT: usize = 13;

    /// Classify a decoded message.
    pub fn of(message: &Message) -> Self {
        match message {
            Message::Event(event) => match event {
                Event::ScanResponse(_) => EventKind::ScanResponse,
                Event::ConnectionStatus(_) => EventKind::ConnectionStatus,
                Event::Disconnected { .. } => EventKind::ConnectionDisconnected,
                Event::AttributeValue(_) => EventKind::AttributeValue,
                Event::ProcedureCompleted { .. } => EventKind::ProcedureCompleted,
            },
            Message::Response(response) => match response {
                Response::GapSetMode { .. } => EventKind::SetModeResponse,
                Response::GapDiscover { .. } => EventKind::DiscoverResponse,
                Response::GapConnectDirect { .. } => EventKind::ConnectDirectResponse,
                Response::GapEndProcedure { .. } => EventKind::EndProcedureResponse,
                Response::Disconnect { .. } => EventKind::DisconnectResponse,
                Response::ReadByHandle { .. } => EventKind::ReadByHandleResponse,
                Response::AttributeWrite { .. } => EventKind::AttributeWriteResponse,
            },
            Message::Unrecognized(_) => EventKind::Unrecognized,
        }
    }

    fn index(self) -> usize {
        match self {
            EventKind::ScanResponse => 0,
            EventKind::ConnectionStatus => 1,
            EventKind::ConnectionDisconnected => 2,
            EventKind::AttributeValue => 3,
            EventKind::ProcedureCompleted => 4,
            EventKind::SetModeResponse => 5,
            EventKind::DiscoverResponse => 6,
            EventKind::ConnectDirectResponse => 7,
            EventKind::EndProcedureResponse => 8,
            EventKind::DisconnectResponse => 9,
            EventKind::ReadByHandleResponse => 10,
            EventKind::AttributeWriteResponse => 11,
            EventKind::Unrecognized => 12,
        }
    }
}

/// A frame handler. Returning an error aborts the current wait loop.
pub type Handler<C> = fn(&mut C, &Message) -> Result<()>;

/// Routing table from kind to handlers.
pub struct Dispatcher<C> {
    handlers: [Vec<Handler<C>>; EventKind::COUNT],
    fallback: Handler<C>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    /// Create an empty table whose fallback only logs.
    pub fn new() -> Self {
        Dispatcher {
            handlers: std::array::from_fn(|_| Vec::new()),
            fallback: log_unhandled::<C>,
        }
    }

    /// Append a handler for `kind`. Handlers run in registration order.
    pub fn register(&mut self, kind: EventKind, handler: Handler<C>) {
        self.handlers[kind.index()].push(handler);
    }

    /// Replace the handler used for kinds with nothing registered.
    pub fn set_fallback(&mut self, handler: Handler<C>) {
        self.fallback = handler;
    }

    /// Handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers[kind.index()].len()
    }

    /// Decode `frame` and run every handler for its kind. Returns the kind.
    ///
    /// A frame whose payload doesn't match its declared kind is logged and
    /// routed as unrecognized.
    pub fn dispatch(&self, ctx: &mut C, frame: &Frame) -> Result<EventKind> {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    class = frame.class,
                    command = frame.command,
                    event = frame.is_event(),
                    "malformed frame: {}",
                    e
                );
                Message::Unrecognized(frame.clone())
            }
        };

        let kind = EventKind::of(&message);
        let handlers = &self.handlers[kind.index()];
        if handlers.is_empty() {
            (self.fallback)(ctx, &message)?;
        } else {
            for handler in handlers {
                handler(ctx, &message)?;
            }
        }
        Ok(kind)
    }
}

fn log_unhandled<C>(_ctx: &mut C, message: &Message) -> Result<()> {
    debug!("unhandled: {:?}", message);
    Ok(())
}
