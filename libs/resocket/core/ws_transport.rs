//! Production transport over `tokio-tungstenite`
//!
//! Each [`TungsteniteConnector::connect`] call spawns one socket task:
//!
//! ```text
//! TungsteniteHandle ──Outbound──> Socket Task ──frames──> Server
//!        ▲                          │
//!   AtomicReadyState <──────────────┤
//!                                   └──TransportEvent──> Connection driver
//! ```
//!
//! The handle is a thin front for the task. Dropping the last reference to
//! it closes the socket.

use crate::core::connection_state::{AtomicReadyState, ReadyState};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const ABNORMAL_CLOSURE: u16 = 1006;
const NO_STATUS_RECEIVED: u16 = 1005;

/// Commands from the handle to its socket task
#[derive(Debug)]
enum Outbound {
    Frame(Message),
    Close { code: u16, reason: String },
}

/// Creates sockets with `tokio_tungstenite::connect_async`
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl TransportConnector for TungsteniteConnector {
    fn connect(&self, request: ConnectRequest) -> (Arc<dyn TransportHandle>, TransportEvents) {
        let state = Arc::new(AtomicReadyState::new(ReadyState::Connecting));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let handle = TungsteniteHandle {
            state: Arc::clone(&state),
            outbound_tx,
        };

        tokio::spawn(run_socket(request, state, outbound_rx, event_tx));

        (Arc::new(handle), event_rx)
    }
}

/// Handle to one tungstenite socket task
///
/// Binary frames always arrive as owned buffers in [`WsMessage::Binary`],
/// so the request's `binary_type` does not change delivery here.
#[derive(Debug)]
pub struct TungsteniteHandle {
    state: Arc<AtomicReadyState>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle for TungsteniteHandle {
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, message: WsMessage) -> Result<()> {
        if !self.state.is_open() {
            return Err(SocketError::ConnectionClosed(format!(
                "socket is {:?}",
                self.state.get()
            )));
        }

        self.outbound_tx
            .send(Outbound::Frame(ws_message_to_tungstenite(message)))
            .map_err(|e| SocketError::ChannelSend(e.to_string()))
    }

    fn close(&self, code: u16, reason: &str) {
        let moved = self.state.transition(ReadyState::Open, ReadyState::Closing)
            || self
                .state
                .transition(ReadyState::Connecting, ReadyState::Closing);

        if moved {
            let _ = self.outbound_tx.send(Outbound::Close {
                code,
                reason: reason.to_string(),
            });
        }
    }
}

/// Socket task: handshake, then pump frames both ways until closed
async fn run_socket(
    request: ConnectRequest,
    state: Arc<AtomicReadyState>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    event_tx: TransportEventSink,
) {
    let client_request = match build_client_request(&request) {
        Ok(req) => req,
        Err(e) => {
            error!("Invalid connection request for {}: {}", request.url, e);
            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
            finish(&state, &event_tx, CloseEvent::new(ABNORMAL_CLOSURE, e.to_string(), false));
            return;
        }
    };

    let connect = connect_async(client_request);
    tokio::pin!(connect);

    let (ws_stream, response) = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(connected) => break connected,
                Err(e) => {
                    error!("Failed to connect to {}: {}", request.url, e);
                    let err = SocketError::WebSocket(e.to_string());
                    let _ = event_tx.send(TransportEvent::Error(err.to_string()));
                    finish(&state, &event_tx, CloseEvent::new(ABNORMAL_CLOSURE, e.to_string(), false));
                    return;
                }
            },
            command = outbound_rx.recv() => match command {
                Some(Outbound::Close { code, reason }) => {
                    debug!("Close requested during handshake with {}", request.url);
                    finish(&state, &event_tx, CloseEvent::new(code, reason, false));
                    return;
                }
                Some(Outbound::Frame(_)) => {
                    warn!("Dropping frame queued before the socket opened");
                }
                None => {
                    debug!("Handle dropped during handshake with {}", request.url);
                    state.set(ReadyState::Closed);
                    return;
                }
            },
        }
    };

    let protocol = response
        .headers()
        .get(http::header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // A close requested as the handshake finished is still queued and is
    // handled by the loop below
    if !state.transition(ReadyState::Connecting, ReadyState::Open) {
        debug!("Socket to {} closed before it opened", request.url);
    } else {
        info!("Socket open: {}", request.url);
        let _ = event_tx.send(TransportEvent::Open(OpenEvent {
            url: request.url.clone(),
            protocol,
        }));
    }

    let (mut write, mut read) = ws_stream.split();
    let mut received_close: Option<(u16, String)> = None;
    let mut requested_close: Option<(u16, String)> = None;
    let mut handle_alive = true;

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = event_tx.send(TransportEvent::Message(WsMessage::Text(text)));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = event_tx.send(TransportEvent::Message(WsMessage::Binary(data)));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Close frame received from {}", request.url);
                    state.set(ReadyState::Closing);
                    received_close = Some(
                        frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((NO_STATUS_RECEIVED, String::new())),
                    );
                }
                // Ping/Pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    if received_close.is_none() && requested_close.is_none() {
                        warn!("WebSocket error on {}: {}", request.url, e);
                        let err = SocketError::WebSocket(e.to_string());
                        let _ = event_tx.send(TransportEvent::Error(err.to_string()));
                    }
                    break;
                }
                None => break,
            },

            command = outbound_rx.recv(), if handle_alive => match command {
                Some(Outbound::Frame(message)) => {
                    if let Err(e) = write.send(message).await {
                        warn!("Failed to send frame to {}: {}", request.url, e);
                        let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: WireCloseCode::from(code),
                        reason: Cow::Owned(reason.clone()),
                    };
                    requested_close = Some((code, reason));
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("Close frame not delivered to {}: {}", request.url, e);
                        break;
                    }
                }
                None => {
                    debug!("Handle dropped, closing socket to {}", request.url);
                    handle_alive = false;
                    if !state.get().is_dead() {
                        state.set(ReadyState::Closing);
                        requested_close = Some((1000, String::new()));
                        let _ = write.send(Message::Close(None)).await;
                    }
                }
            },
        }
    }

    let event = match (received_close, requested_close) {
        (Some((code, reason)), _) => CloseEvent::new(code, reason, true),
        (None, Some((code, reason))) => CloseEvent::new(code, reason, false),
        (None, None) => CloseEvent::new(ABNORMAL_CLOSURE, "connection lost", false),
    };
    info!(
        "Socket closed: {} (code {}, clean: {})",
        request.url, event.code, event.was_clean
    );
    finish(&state, &event_tx, event);
}

fn finish(state: &AtomicReadyState, event_tx: &TransportEventSink, event: CloseEvent) {
    state.set(ReadyState::Closed);
    let _ = event_tx.send(TransportEvent::Close(event));
}

/// Build the handshake request, offering sub-protocols if configured
fn build_client_request(
    request: &ConnectRequest,
) -> std::result::Result<http::Request<()>, SocketError> {
    let mut client_request = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| SocketError::Configuration(e.to_string()))?;

    if !request.protocols.is_empty() {
        let value = http::HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| SocketError::Configuration(format!("invalid sub-protocol: {}", e)))?;
        client_request
            .headers_mut()
            .insert(http::header::SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(client_request)
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
