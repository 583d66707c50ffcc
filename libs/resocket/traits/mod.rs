//! # Resocket Traits
//!
//! Core traits and types at the seams of the managed connection:
//!
//! - **WsMessage**: Opaque text/binary payload
//! - **TransportConnector / TransportHandle**: The underlying socket
//! - **ConnectionHandler**: Lifecycle notifications for callers
//! - **ReconnectionStrategy**: Delay between automatic reconnects

pub mod error;
pub mod handler;
pub mod parser;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use handler::{ConnectionHandler, Handlers, NoOpHandler};
pub use parser::WsMessage;
pub use reconnect::{
    ExponentialBackoff, FixedDelay, ReconnectionStrategy, MAX_RECONNECT_DELAY,
    RECONNECT_BASE_DELAY,
};
pub use transport::{
    CloseEvent, ConnectRequest, OpenEvent, TransportConnector, TransportEvent, TransportEventSink,
    TransportEvents, TransportHandle,
};
