//! # Resocket
//!
//! A managed WebSocket connection: one logical connection that survives
//! the loss of individual sockets.
//!
//! ## Features
//!
//! - **Automatic reconnection**: Exponential backoff capped at 30s, bounded attempts
//! - **Keepalive**: Application-level ping on a fixed interval while open
//! - **Send guard**: Sends issued while connecting wait briefly instead of failing
//! - **Connectivity aware**: Closes on host offline, reopens on host online
//! - **Pluggable transport**: `tokio-tungstenite` by default, any [`TransportConnector`] in tests

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core connection functionality
pub use crate::core::{
    builder, close_code, config, connection, connection_state, connectivity, keepalive,
    send_guard, ws_transport,
    builder::{states, WebSocketConnectionBuilder},
    close_code::{CloseCode, DisconnectRequest, DEFAULT_CLOSE_REASON},
    config::{load_options, BinaryType, ConfigError, ConnectionOptions, PartialConnectionOptions},
    connection::{OpenOutcome, WebSocketConnection},
    connection_state::{AtomicReadyState, ReadyState},
    connectivity::{ConnectivityEvent, ConnectivityNotifier, ConnectivitySignal},
    send_guard::{ConnectionSnapshot, SendGuardPolicy},
    ws_transport::{TungsteniteConnector, TungsteniteHandle},
};

// Convenience function
pub use crate::core::builder as connection_builder;
