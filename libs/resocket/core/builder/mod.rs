pub mod states;

use crate::core::config::{ConnectionOptions, PartialConnectionOptions};
use crate::core::connection::{ConnectionParts, WebSocketConnection};
use crate::core::connectivity::ConnectivitySignal;
use crate::core::send_guard::SendGuardPolicy;
use crate::core::ws_transport::TungsteniteConnector;
use crate::traits::*;
use states::*;
use std::sync::Arc;

/// Type-state builder for [`WebSocketConnection`]
///
/// The endpoint URL is required; everything else has a default:
/// - options: [`ConnectionOptions::default`]
/// - handler: [`NoOpHandler`]
/// - connector: [`TungsteniteConnector`]
/// - reconnect strategy: [`ExponentialBackoff`] bounded by `reconnect_attempts`
/// - send guard: [`SendGuardPolicy::default`]
///
/// # Example
/// ```ignore
/// let connection = WebSocketConnection::builder()
///     .url("wss://api.example.com/stream")
///     .handler(Handlers::new().on_message(|msg| println!("{:?}", msg)))
///     .overrides(PartialConnectionOptions {
///         should_reconnect: Some(true),
///         ..Default::default()
///     })
///     .build()?;
///
/// connection.open().await?;
/// connection.send("hello").await?;
/// ```
pub struct WebSocketConnectionBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    options: ConnectionOptions,
    handler: Option<Arc<dyn ConnectionHandler>>,
    connector: Option<Arc<dyn TransportConnector>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    send_guard: SendGuardPolicy,
    connectivity: Option<ConnectivitySignal>,
}

impl WebSocketConnectionBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            options: ConnectionOptions::default(),
            handler: None,
            connector: None,
            reconnect_strategy: None,
            send_guard: SendGuardPolicy::default(),
            connectivity: None,
        }
    }

    /// Set the endpoint (ws:// or wss://)
    pub fn url(self, url: impl Into<String>) -> WebSocketConnectionBuilder<HasUrl> {
        WebSocketConnectionBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            options: self.options,
            handler: self.handler,
            connector: self.connector,
            reconnect_strategy: self.reconnect_strategy,
            send_guard: self.send_guard,
            connectivity: self.connectivity,
        }
    }
}

impl Default for WebSocketConnectionBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> WebSocketConnectionBuilder<U>
where
    U: UrlState,
{
    /// Replace the options wholesale
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Shallow-merge overrides onto the current options
    pub fn overrides(mut self, overrides: PartialConnectionOptions) -> Self {
        self.options = overrides.apply(self.options);
        self
    }

    /// Lifecycle notifications
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: ConnectionHandler,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Transport used to create socket handles
    pub fn connector<C>(mut self, connector: C) -> Self
    where
        C: TransportConnector,
    {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Delay calculation for automatic reconnects
    ///
    /// `reconnect_attempts` from the options still bounds the number of attempts.
    pub fn reconnect_strategy<S>(mut self, strategy: S) -> Self
    where
        S: ReconnectionStrategy + 'static,
    {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Escalation table for sends issued while not open
    pub fn send_guard(mut self, policy: SendGuardPolicy) -> Self {
        self.send_guard = policy;
        self
    }

    /// Host online/offline notifications
    pub fn connectivity(mut self, signal: ConnectivitySignal) -> Self {
        self.connectivity = Some(signal);
        self
    }
}

impl WebSocketConnectionBuilder<HasUrl> {
    /// Validate and start the connection driver
    ///
    /// Does not open the connection; call [`WebSocketConnection::open`].
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<WebSocketConnection> {
        let url = self.url.unwrap_or_default();
        if url.is_empty() {
            return Err(SocketError::Configuration("URL must not be empty".to_string()));
        }

        self.options
            .validate()
            .map_err(|e| SocketError::Configuration(e.to_string()))?;

        let reconnect_strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::with_max_attempts(
                self.options.reconnect_attempts,
            ))
        });

        Ok(WebSocketConnection::spawn(ConnectionParts {
            url,
            options: self.options,
            handler: self.handler.unwrap_or_else(|| Arc::new(NoOpHandler)),
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(TungsteniteConnector::new())),
            reconnect_strategy,
            send_guard: self.send_guard,
            connectivity: self.connectivity,
        }))
    }
}
