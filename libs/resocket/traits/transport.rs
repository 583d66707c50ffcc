//! Transport Handle seam
//!
//! The connection manager never talks to a socket directly. It asks a
//! [`TransportConnector`] for a fresh handle on every open, drives that
//! handle through [`TransportHandle`], and consumes the handle's lifecycle
//! events from the returned [`TransportEvents`] stream.
//!
//! ```text
//! Manager ──connect(request)──> Connector ──> (Handle, Events)
//!    │                                            │      │
//!    ├──send / close / ready_state ───────────────┘      │
//!    └──<── Open → (Message | Error)* → Close ───────────┘
//! ```
//!
//! Implementations must emit events in the order
//! `Open → (Message | Error)* → Close` and emit exactly one `Close`, after
//! which the stream may end. A handle that fails to connect emits
//! `Error`/`Close` without `Open`.

use crate::core::config::BinaryType;
use crate::core::connection_state::ReadyState;
use crate::error::Result;
use crate::parser::WsMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stream of lifecycle events for a single handle
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Sending side of [`TransportEvents`], held by transport implementations
pub type TransportEventSink = mpsc::UnboundedSender<TransportEvent>;

/// Everything a connector needs to create a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub protocols: Vec<String>,
    /// Preference for connectors that surface binary frames more than one
    /// way; the tungstenite connector always yields owned buffers
    pub binary_type: BinaryType,
}

/// Details of a successful open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    pub url: String,
    /// Sub-protocol selected by the server, if any
    pub protocol: Option<String>,
}

/// Details of a closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
    /// Whether a close frame was exchanged
    pub was_clean: bool,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>, was_clean: bool) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean,
        }
    }
}

/// Lifecycle event emitted by a transport handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open(OpenEvent),
    Message(WsMessage),
    Error(String),
    Close(CloseEvent),
}

/// A single underlying socket
pub trait TransportHandle: Send + Sync {
    /// Current ready state of this socket
    fn ready_state(&self) -> ReadyState;

    /// Hand a payload to the socket
    fn send(&self, message: WsMessage) -> Result<()>;

    /// Request closure; completion is reported by a `Close` event
    fn close(&self, code: u16, reason: &str);
}

/// Factory for transport handles
pub trait TransportConnector: Send + Sync + 'static {
    /// Create a handle targeting `request.url`. Must not block; the
    /// handshake proceeds in the background and is reported via events.
    fn connect(&self, request: ConnectRequest) -> (Arc<dyn TransportHandle>, TransportEvents);
}
