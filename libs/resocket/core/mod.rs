//! # Core connection machinery
//!
//! - [`connection`]: the managed connection and its driver task
//! - [`builder`]: type-state builder for [`WebSocketConnection`]
//! - [`send_guard`]: bounded wait for an open connection before sending
//! - [`keepalive`]: periodic ping timer
//! - [`connectivity`]: host online/offline signal
//! - [`ws_transport`]: `tokio-tungstenite` transport
//!
//! ## Example
//!
//! ```rust,ignore
//! use resocket::core::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = resocket::builder()
//!         .url("wss://api.example.com/stream")
//!         .overrides(PartialConnectionOptions {
//!             should_ping: Some(true),
//!             ping_timeout: Some(30),
//!             should_reconnect: Some(true),
//!             ..Default::default()
//!         })
//!         .handler(Handlers::new().on_message(|msg| println!("{:?}", msg)))
//!         .build()?;
//!
//!     connection.open().await?;
//!     connection.send(r#"{"type":"subscribe"}"#).await?;
//!     connection.close(None).await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod close_code;
pub mod config;
pub mod connection;
pub mod connection_state;
pub mod connectivity;
pub mod keepalive;
pub mod send_guard;
pub mod ws_transport;

// Re-export main types
pub use builder::{states, WebSocketConnectionBuilder};
pub use close_code::{CloseCode, DisconnectRequest, DEFAULT_CLOSE_REASON};
pub use config::{
    load_options, BinaryType, ConfigError, ConnectionOptions, PartialConnectionOptions,
};
pub use connection::{OpenOutcome, WebSocketConnection};
pub use connection_state::{AtomicReadyState, ReadyState};
pub use connectivity::{ConnectivityEvent, ConnectivityNotifier, ConnectivitySignal};
pub use keepalive::KeepaliveTimer;
pub use send_guard::{ConnectionSnapshot, SendGuardPolicy};
pub use ws_transport::{TungsteniteConnector, TungsteniteHandle};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new connection builder
///
/// Shorthand for [`WebSocketConnection::builder`].
pub fn builder() -> WebSocketConnectionBuilder<states::NoUrl> {
    WebSocketConnectionBuilder::new()
}
