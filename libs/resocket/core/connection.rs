use crate::core::close_code::DisconnectRequest;
use crate::core::config::ConnectionOptions;
use crate::core::connection_state::ReadyState;
use crate::core::connectivity::{ConnectivityEvent, ConnectivitySignal};
use crate::core::keepalive::KeepaliveTimer;
use crate::core::send_guard::{self, ConnectionSnapshot, SendGuardPolicy};
use crate::traits::*;
use parking_lot::RwLock;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tracing::{debug, info, warn};

/// Result of [`WebSocketConnection::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new handle reached the open state
    Opened(OpenEvent),
    /// The current handle was already open; nothing was created
    AlreadyOpen,
}

/// Internal command messages for the connection driver
#[derive(Debug)]
enum Command {
    Open(oneshot::Sender<Result<OpenOutcome>>),
    Close {
        request: DisconnectRequest,
        reply: oneshot::Sender<()>,
    },
    CancelReconnect,
}

/// State readable from outside the driver task
///
/// Only the driver writes here; callers read it for `ready_state` and the
/// send guard.
pub(crate) struct SharedState {
    handle: RwLock<Option<Arc<dyn TransportHandle>>>,
    has_endpoint: AtomicBool,
    reconnect_pending: AtomicBool,
}

impl SharedState {
    fn new(has_endpoint: bool) -> Self {
        Self {
            handle: RwLock::new(None),
            has_endpoint: AtomicBool::new(has_endpoint),
            reconnect_pending: AtomicBool::new(false),
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.handle
            .read()
            .as_ref()
            .map(|handle| handle.ready_state())
            .unwrap_or(ReadyState::Closed)
    }

    fn current_handle(&self) -> Option<Arc<dyn TransportHandle>> {
        self.handle.read().as_ref().map(Arc::clone)
    }

    fn snapshot(&self) -> ConnectionSnapshot {
        let handle = self.handle.read();
        ConnectionSnapshot {
            ready_state: handle
                .as_ref()
                .map(|h| h.ready_state())
                .unwrap_or(ReadyState::Closed),
            has_handle: handle.is_some(),
            has_endpoint: self.has_endpoint.load(Ordering::Acquire),
            reconnect_pending: self.reconnect_pending.load(Ordering::Acquire),
        }
    }
}

/// Everything the builder hands over to start a connection
pub(crate) struct ConnectionParts {
    pub url: String,
    pub options: ConnectionOptions,
    pub handler: Arc<dyn ConnectionHandler>,
    pub connector: Arc<dyn TransportConnector>,
    pub reconnect_strategy: Box<dyn ReconnectionStrategy>,
    pub send_guard: SendGuardPolicy,
    pub connectivity: Option<ConnectivitySignal>,
}

/// A managed WebSocket connection
///
/// Presents one logical connection on top of a sequence of transport
/// handles:
/// - `open()` creates a handle and resolves when it opens
/// - unexpected closures reopen with exponential backoff (when enabled)
/// - a keepalive ping is sent periodically while open (when enabled)
/// - `send()` waits briefly for an open connection before failing
///
/// All lifecycle state lives in a driver task spawned at build time. This
/// type is a cheap, cloneable handle to it; dropping every clone stops the
/// driver and releases the socket.
#[derive(Clone)]
pub struct WebSocketConnection {
    command_tx: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedState>,
    send_guard: Arc<SendGuardPolicy>,
}

impl WebSocketConnection {
    /// Start building a connection
    pub fn builder() -> crate::core::builder::WebSocketConnectionBuilder<
        crate::core::builder::states::NoUrl,
    > {
        crate::core::builder::WebSocketConnectionBuilder::new()
    }

    /// Spawn the driver task. Must be called within a Tokio runtime.
    pub(crate) fn spawn(parts: ConnectionParts) -> Self {
        let shared = Arc::new(SharedState::new(!parts.url.is_empty()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let send_guard = Arc::new(parts.send_guard);

        let driver = ConnectionDriver {
            url: Some(parts.url).filter(|url| !url.is_empty()),
            options: Some(parts.options),
            handler: parts.handler,
            connector: parts.connector,
            reconnect_strategy: parts.reconnect_strategy,
            shared: Arc::clone(&shared),
            transport: None,
            transports_created: 0,
            reconnect_attempts: 0,
            reconnect_cancelled: false,
            manually_closed: false,
            reopen_after_close: false,
            last_close: None,
            keepalive: None,
            reconnect_timer: None,
            open_waiters: Vec::new(),
            close_waiters: Vec::new(),
        };

        tokio::spawn(driver.run(command_rx, parts.connectivity));

        Self {
            command_tx,
            shared,
            send_guard,
        }
    }

    /// Open the connection
    ///
    /// Resolves with [`OpenOutcome::AlreadyOpen`] if the current handle is
    /// open. Otherwise resolves once a handle reaches the open state; there
    /// is no timeout. Fails if the connection has been torn down.
    pub async fn open(&self) -> Result<OpenOutcome> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Open(tx))?;
        rx.await
            .map_err(|_| SocketError::ConnectionClosed("connection driver stopped".to_string()))?
    }

    /// Close the connection and disable automatic reconnection for good
    ///
    /// Resolves once the transport reports closure, or immediately if there
    /// is nothing to close.
    pub async fn close(&self, request: Option<DisconnectRequest>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Close {
            request: request.unwrap_or_default(),
            reply: tx,
        })?;
        // A dropped reply means the driver is gone, so the socket is too
        let _ = rx.await;
        Ok(())
    }

    /// Send a payload, waiting briefly for the connection to open first
    pub async fn send(&self, message: impl Into<WsMessage>) -> Result<()> {
        let message = message.into();

        if !self.shared.ready_state().is_open() {
            debug!("Send requested while not open, waiting for connection");
            send_guard::wait_until_open(&self.send_guard, || self.shared.snapshot()).await?;
        }

        match self.shared.current_handle() {
            Some(handle) => handle.send(message),
            None => Err(SocketError::ConnectionClosed(
                "no active transport".to_string(),
            )),
        }
    }

    /// Prevent any scheduled or future automatic reconnect
    ///
    /// The current connection, if any, stays up.
    pub fn cancel_reconnect(&self) {
        let _ = self.command(Command::CancelReconnect);
    }

    /// Ready state of the current handle, `Closed` if there is none
    #[inline]
    pub fn ready_state(&self) -> ReadyState {
        self.shared.ready_state()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.ready_state().is_open()
    }

    fn command(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| SocketError::ChannelSend(e.to_string()))
    }
}

/// The transport handle currently owned by the driver
struct ActiveTransport {
    id: u64,
    handle: Arc<dyn TransportHandle>,
    /// `None` once the handle has reported its closure
    events: Option<TransportEvents>,
}

/// Lifecycle state machine, run as a single task
///
/// Every mutation happens in one of the `handle_*` methods below, which the
/// run loop calls one at a time.
struct ConnectionDriver {
    /// `None` after teardown
    url: Option<String>,
    /// `None` after teardown
    options: Option<ConnectionOptions>,
    handler: Arc<dyn ConnectionHandler>,
    connector: Arc<dyn TransportConnector>,
    reconnect_strategy: Box<dyn ReconnectionStrategy>,
    shared: Arc<SharedState>,

    transport: Option<ActiveTransport>,
    transports_created: u64,
    reconnect_attempts: u32,
    reconnect_cancelled: bool,
    manually_closed: bool,
    /// An `open()` arrived while a manual close was still in flight
    reopen_after_close: bool,
    /// Closure that started the current reconnect sequence
    last_close: Option<CloseEvent>,
    keepalive: Option<KeepaliveTimer>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    open_waiters: Vec<oneshot::Sender<Result<OpenOutcome>>>,
    close_waiters: Vec<oneshot::Sender<()>>,
}

impl ConnectionDriver {
    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        mut connectivity: Option<ConnectivitySignal>,
    ) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All connection handles dropped, stopping driver");
                        break;
                    }
                },

                event = next_transport_event(&mut self.transport) => {
                    self.handle_transport_event(event);
                }

                _ = wait_reconnect(&mut self.reconnect_timer) => {
                    self.handle_reconnect_timer();
                }

                tick = next_keepalive_tick(&mut self.keepalive) => match tick {
                    Some(()) => self.handle_keepalive_tick(),
                    None => self.keepalive = None,
                },

                signal = next_connectivity_event(&mut connectivity) => match signal {
                    Some(event) => self.handle_connectivity(event),
                    None => {
                        debug!("Connectivity signal closed");
                        connectivity = None;
                    }
                },
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open(reply) => self.handle_open(Some(reply)),
            Command::Close { request, reply } => self.handle_close(request, Some(reply)),
            Command::CancelReconnect => {
                info!("Automatic reconnection cancelled");
                self.reconnect_cancelled = true;
            }
        }
    }

    fn current_ready_state(&self) -> ReadyState {
        self.transport
            .as_ref()
            .map(|t| t.handle.ready_state())
            .unwrap_or(ReadyState::Closed)
    }

    fn should_reconnect(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.should_reconnect)
    }

    fn handle_open(&mut self, reply: Option<oneshot::Sender<Result<OpenOutcome>>>) {
        let Some(url) = self.url.clone() else {
            warn!("Open requested on a connection without endpoint");
            if let Some(reply) = reply {
                let _ = reply.send(Err(SocketError::EndpointMissing));
            }
            return;
        };

        match self.current_ready_state() {
            ReadyState::Open => {
                debug!("Open requested while already open");
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(OpenOutcome::AlreadyOpen));
                }
                return;
            }
            ReadyState::Connecting if self.transport.is_some() => {
                debug!("Open requested while a handshake is in flight, joining it");
                self.open_waiters.extend(reply);
                return;
            }
            ReadyState::Closing
                if self.transport.as_ref().is_some_and(|t| t.events.is_some()) =>
            {
                debug!("Open requested while closing, deferring until the close completes");
                self.open_waiters.extend(reply);
                self.reopen_after_close = true;
                return;
            }
            _ => {}
        }

        self.open_waiters.extend(reply);
        self.start_transport(url);
    }

    /// Replace the current handle with a fresh one
    fn start_transport(&mut self, url: String) {
        self.stop_keepalive();

        if let Some(old) = self.transport.take() {
            // Dropping the event stream detaches the stale handle
            debug!("Releasing transport #{}", old.id);
            self.resolve_close_waiters();
        }

        let (protocols, binary_type) = match &self.options {
            Some(options) => (options.protocols.clone(), options.binary_type),
            None => return,
        };

        let request = ConnectRequest {
            url,
            protocols,
            binary_type,
        };

        self.transports_created += 1;
        let id = self.transports_created;
        info!("Connecting to {} (transport #{})", request.url, id);

        let (handle, events) = self.connector.connect(request);
        *self.shared.handle.write() = Some(Arc::clone(&handle));
        self.transport = Some(ActiveTransport {
            id,
            handle,
            events: Some(events),
        });
    }

    fn handle_close(&mut self, request: DisconnectRequest, reply: Option<oneshot::Sender<()>>) {
        self.manually_closed = true;
        self.reconnect_cancelled = true;
        self.reopen_after_close = false;

        if self.reconnect_timer.is_some() {
            self.abandon_reconnect();
        }

        let Some(transport) = &self.transport else {
            debug!("Close requested with no transport");
            if let Some(reply) = reply {
                let _ = reply.send(());
            }
            return;
        };

        match transport.handle.ready_state() {
            ReadyState::Connecting | ReadyState::Open => {
                info!(
                    "Closing connection with code {} ({})",
                    request.code, request.reason
                );
                transport
                    .handle
                    .close(request.code.as_u16(), &request.reason);
                self.close_waiters.extend(reply);
            }
            ReadyState::Closing if transport.events.is_some() => {
                debug!("Close requested while already closing");
                self.close_waiters.extend(reply);
            }
            _ => {
                debug!("Close requested on a closed transport");
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open(event) => self.handle_transport_open(event),
            TransportEvent::Message(message) => self.handler.on_message(&message),
            TransportEvent::Error(error) => {
                warn!("Transport error: {}", error);
                self.handler.on_error(&error);
            }
            TransportEvent::Close(event) => self.handle_transport_close(event),
        }
    }

    fn handle_transport_open(&mut self, event: OpenEvent) {
        self.stop_keepalive();
        if let Some(options) = self.options.as_ref().filter(|o| o.should_ping) {
            debug!("Starting keepalive every {:?}", options.ping_interval());
            self.keepalive = Some(KeepaliveTimer::spawn(options.ping_interval()));
        }

        if self.reconnect_attempts > 0 {
            info!(
                "Reconnected to {} after {} attempts",
                event.url, self.reconnect_attempts
            );
            self.handler.on_reconnect();
            self.reconnect_attempts = 0;
            self.last_close = None;
        } else {
            info!("Connected to {}", event.url);
            self.handler.on_open(&event);
        }

        for waiter in self.open_waiters.drain(..) {
            let _ = waiter.send(Ok(OpenOutcome::Opened(event.clone())));
        }
    }

    fn handle_transport_close(&mut self, event: CloseEvent) {
        if let Some(transport) = self.transport.as_mut() {
            transport.events = None;
        }
        self.stop_keepalive();

        if !self.manually_closed && self.should_reconnect() {
            warn!(
                "Connection closed unexpectedly (code {}: {})",
                event.code, event.reason
            );
            self.reopen_after_close = false;
            self.last_close = Some(event);
            self.init_reconnect();
            return;
        }

        info!("Connection closed (code {}: {})", event.code, event.reason);
        self.reconnect_attempts = 0;
        self.last_close = None;
        self.handler.on_close(&event);
        self.resolve_close_waiters();

        if std::mem::take(&mut self.reopen_after_close) {
            if let Some(url) = self.url.clone() {
                debug!("Previous transport closed, starting deferred open");
                self.start_transport(url);
                return;
            }
        }

        self.fail_open_waiters(&format!("closed with code {}", event.code));
    }

    /// Drop a scheduled retry after a manual close
    ///
    /// The closure that started the sequence was held back from `on_close`;
    /// it is delivered now since no reopen will follow.
    fn abandon_reconnect(&mut self) {
        info!("Manual close, dropping the scheduled reconnect");
        self.reconnect_timer = None;
        self.shared.reconnect_pending.store(false, Ordering::Release);
        self.reconnect_attempts = 0;

        let event = self.last_close.take().unwrap_or_else(|| {
            CloseEvent::new(
                crate::core::close_code::CloseCode::AbnormalClosure.as_u16(),
                "connection lost",
                false,
            )
        });
        self.handler.on_close(&event);
        self.fail_open_waiters("closed while waiting to reconnect");
    }

    fn fail_open_waiters(&mut self, reason: &str) {
        for waiter in self.open_waiters.drain(..) {
            let _ = waiter.send(Err(SocketError::ConnectionClosed(reason.to_string())));
        }
    }

    /// Reconnection scheduler: count the attempt, then either schedule a
    /// single reopen or give up and tear down
    fn init_reconnect(&mut self) {
        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        let max_attempts = self.options.as_ref().map_or(0, |o| o.reconnect_attempts);

        let delay = if self.reconnect_cancelled || attempt > max_attempts {
            None
        } else {
            self.reconnect_strategy.next_delay(attempt)
        };

        match delay {
            Some(delay) => {
                info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay, attempt, max_attempts
                );
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
                self.shared.reconnect_pending.store(true, Ordering::Release);
            }
            None => {
                warn!(
                    "Giving up reconnecting after {} attempts (cancelled: {})",
                    attempt - 1,
                    self.reconnect_cancelled
                );
                self.handler.on_reconnect_fail();
                self.teardown();
            }
        }
    }

    fn handle_reconnect_timer(&mut self) {
        self.reconnect_timer = None;
        self.shared.reconnect_pending.store(false, Ordering::Release);

        if self.reconnect_cancelled {
            // Ends the sequence through the same give-up path as exhaustion
            debug!("Scheduled reconnect skipped, reconnection was cancelled");
            self.init_reconnect();
            return;
        }

        self.handle_open(None);
    }

    /// Keepalive scheduler: a tick becomes a ping only while open
    fn handle_keepalive_tick(&mut self) {
        let (Some(transport), Some(options)) = (&self.transport, &self.options) else {
            return;
        };

        if !transport.handle.ready_state().is_open() {
            debug!("Keepalive tick skipped, connection not open");
            return;
        }

        match transport.handle.send(WsMessage::Text(options.ping_payload())) {
            Ok(()) => {
                debug!("Keepalive ping sent");
                self.handler.on_ping();
            }
            Err(e) => warn!("Failed to send keepalive ping: {}", e),
        }
    }

    fn handle_connectivity(&mut self, event: ConnectivityEvent) {
        let dead = self.current_ready_state().is_dead();

        match event {
            ConnectivityEvent::Online => {
                if dead && self.should_reconnect() {
                    info!("Host back online, reopening connection");
                    self.handle_open(None);
                }
            }
            ConnectivityEvent::Offline => {
                if !dead {
                    info!("Host offline, closing connection");
                    self.handle_close(DisconnectRequest::default(), None);
                }
            }
        }
    }

    fn stop_keepalive(&mut self) {
        if let Some(mut keepalive) = self.keepalive.take() {
            keepalive.stop();
        }
    }

    fn resolve_close_waiters(&mut self) {
        for waiter in self.close_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Release everything; the connection cannot reconnect afterwards
    fn teardown(&mut self) {
        info!("Tearing down connection state");
        self.stop_keepalive();
        self.reconnect_timer = None;
        self.transport = None;
        *self.shared.handle.write() = None;
        self.shared.has_endpoint.store(false, Ordering::Release);
        self.shared.reconnect_pending.store(false, Ordering::Release);

        self.url = None;
        self.options = None;
        self.handler = Arc::new(NoOpHandler);
        self.reconnect_attempts = 0;
        self.manually_closed = false;
        self.reconnect_cancelled = false;
        self.reopen_after_close = false;
        self.last_close = None;

        self.fail_open_waiters("reconnect attempts exhausted");
        self.resolve_close_waiters();
    }

    fn shutdown(&mut self) {
        self.stop_keepalive();
        if let Some(transport) = self.transport.take() {
            if !transport.handle.ready_state().is_dead() {
                let request = DisconnectRequest::default();
                transport
                    .handle
                    .close(request.code.as_u16(), &request.reason);
            }
        }
        *self.shared.handle.write() = None;
    }
}

async fn next_transport_event(transport: &mut Option<ActiveTransport>) -> TransportEvent {
    match transport.as_mut().and_then(|t| t.events.as_mut()) {
        Some(events) => events.recv().await.unwrap_or_else(|| {
            TransportEvent::Close(CloseEvent::new(
                crate::core::close_code::CloseCode::AbnormalClosure.as_u16(),
                "transport ended without a close event",
                false,
            ))
        }),
        None => std::future::pending().await,
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_keepalive_tick(keepalive: &mut Option<KeepaliveTimer>) -> Option<()> {
    match keepalive {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}

async fn next_connectivity_event(
    signal: &mut Option<ConnectivitySignal>,
) -> Option<ConnectivityEvent> {
    match signal {
        Some(signal) => signal.recv().await,
        None => std::future::pending().await,
    }
}
