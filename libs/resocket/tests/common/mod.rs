//! Common test utilities for resocket integration tests
//!
//! - [`MockConnector`]: scripted transport; tests drive each handle by hand
//! - [`RecordingHandler`]: records every lifecycle notification in order
//! - [`MockWsServer`]: real echo server for end-to-end tests

#![allow(dead_code)]

use parking_lot::Mutex;
use resocket::core::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Let the driver task drain its queues
///
/// Under paused time this advances the clock by 1ms.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ============================================================================
// Scripted transport
// ============================================================================

/// One scripted socket
pub struct MockHandle {
    pub id: usize,
    pub request: ConnectRequest,
    state: AtomicReadyState,
    events: TransportEventSink,
    sent: Mutex<Vec<WsMessage>>,
    close_calls: Mutex<Vec<(u16, String)>>,
    complete_close: bool,
}

impl MockHandle {
    /// Finish the handshake
    pub fn open(&self) {
        self.state.set(ReadyState::Open);
        let _ = self.events.send(TransportEvent::Open(OpenEvent {
            url: self.request.url.clone(),
            protocol: self.request.protocols.first().cloned(),
        }));
    }

    /// Deliver an incoming payload. Returns false if nobody listens anymore.
    pub fn receive(&self, message: impl Into<WsMessage>) -> bool {
        self.events
            .send(TransportEvent::Message(message.into()))
            .is_ok()
    }

    pub fn error(&self, error: &str) -> bool {
        self.events
            .send(TransportEvent::Error(error.to_string()))
            .is_ok()
    }

    /// Connection lost without a close handshake
    pub fn drop_connection(&self) -> bool {
        self.finish(CloseEvent::new(1006, "connection lost", false))
    }

    /// Server-initiated close
    pub fn server_close(&self, code: u16, reason: &str) -> bool {
        self.finish(CloseEvent::new(code, reason, true))
    }

    fn finish(&self, event: CloseEvent) -> bool {
        self.state.set(ReadyState::Closed);
        self.events.send(TransportEvent::Close(event)).is_ok()
    }

    pub fn sent(&self) -> Vec<WsMessage> {
        self.sent.lock().clone()
    }

    pub fn close_calls(&self) -> Vec<(u16, String)> {
        self.close_calls.lock().clone()
    }
}

impl TransportHandle for MockHandle {
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, message: WsMessage) -> resocket::Result<()> {
        if !self.state.is_open() {
            return Err(SocketError::ConnectionClosed("mock socket not open".to_string()));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        self.close_calls.lock().push((code, reason.to_string()));
        if self.state.get().is_dead() {
            return;
        }
        self.state.set(ReadyState::Closing);
        if self.complete_close {
            self.finish(CloseEvent::new(code, reason, true));
        }
    }
}

/// How freshly created handles behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Stay connecting until the test calls [`MockHandle::open`]
    Manual,
    /// Open right away
    AutoOpen,
    /// Fail the handshake right away
    Refuse,
}

struct ConnectorState {
    behavior: ConnectBehavior,
    complete_close: bool,
    handles: Vec<Arc<MockHandle>>,
}

/// Transport connector that hands out [`MockHandle`]s
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConnectorState {
                behavior,
                complete_close: true,
                handles: Vec::new(),
            })),
        }
    }

    /// Close requests leave the handle in `Closing` until the test finishes it
    pub fn with_slow_close(self) -> Self {
        self.inner.lock().complete_close = false;
        self
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        self.inner.lock().behavior = behavior;
    }

    pub fn handles_created(&self) -> usize {
        self.inner.lock().handles.len()
    }

    pub fn handle(&self, index: usize) -> Arc<MockHandle> {
        Arc::clone(&self.inner.lock().handles[index])
    }

    pub fn last_handle(&self) -> Arc<MockHandle> {
        let inner = self.inner.lock();
        Arc::clone(inner.handles.last().expect("no handle created yet"))
    }
}

impl TransportConnector for MockConnector {
    fn connect(&self, request: ConnectRequest) -> (Arc<dyn TransportHandle>, TransportEvents) {
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut inner = self.inner.lock();

        let handle = Arc::new(MockHandle {
            id: inner.handles.len(),
            request,
            state: AtomicReadyState::new(ReadyState::Connecting),
            events: events_tx,
            sent: Mutex::new(Vec::new()),
            close_calls: Mutex::new(Vec::new()),
            complete_close: inner.complete_close,
        });

        match inner.behavior {
            ConnectBehavior::Manual => {}
            ConnectBehavior::AutoOpen => handle.open(),
            ConnectBehavior::Refuse => {
                let _ = handle.error("connection refused");
                handle.drop_connection();
            }
        }

        inner.handles.push(Arc::clone(&handle));
        (handle, events_rx)
    }
}

// ============================================================================
// Recording handler
// ============================================================================

/// Records notifications as short strings, e.g. `"open"`, `"close:1000"`
#[derive(Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: String) {
        verbose_println!("  handler: {}", event);
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Occurrences of `name`, ignoring any `:detail` suffix
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.split(':').next() == Some(name))
            .count()
    }
}

impl ConnectionHandler for RecordingHandler {
    fn on_open(&self, _event: &OpenEvent) {
        self.record("open".to_string());
    }

    fn on_message(&self, message: &WsMessage) {
        match message {
            WsMessage::Text(text) => self.record(format!("message:{}", text)),
            WsMessage::Binary(data) => self.record(format!("binary:{}", data.len())),
        }
    }

    fn on_error(&self, error: &str) {
        self.record(format!("error:{}", error));
    }

    fn on_close(&self, event: &CloseEvent) {
        self.record(format!("close:{}", event.code));
    }

    fn on_reconnect(&self) {
        self.record("reconnect".to_string());
    }

    fn on_reconnect_fail(&self) {
        self.record("reconnect_fail".to_string());
    }

    fn on_ping(&self) {
        self.record("ping".to_string());
    }
}

/// Build a connection over `connector` with the given overrides
pub fn connection_with(
    connector: &MockConnector,
    handler: &RecordingHandler,
    overrides: PartialConnectionOptions,
) -> WebSocketConnection {
    WebSocketConnection::builder()
        .url("ws://mock.test/feed")
        .overrides(overrides)
        .connector(connector.clone())
        .handler(handler.clone())
        .build()
        .expect("valid test connection")
}

/// Overrides enabling automatic reconnection
pub fn reconnecting(attempts: u32) -> PartialConnectionOptions {
    PartialConnectionOptions {
        should_reconnect: Some(true),
        reconnect_attempts: Some(attempts),
        ..Default::default()
    }
}

// ============================================================================
// Echo server
// ============================================================================

/// A simple mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                // tungstenite queues the close reply; flush it
                                let _ = write.close().await;
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
