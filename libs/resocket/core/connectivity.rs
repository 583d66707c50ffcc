//! Host connectivity notifications
//!
//! The connection does not register any global listeners. Whatever knows
//! about network reachability (an OS hook or a test) holds a
//! [`ConnectivityNotifier`] and the connection consumes the paired
//! [`ConnectivitySignal`]:
//!
//! - **Online**: if the connection is dead and auto-reconnect is enabled, open it
//! - **Offline**: if the connection is not dead, close it

use tokio::sync::mpsc;

/// Reachability change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Producer side, cheap to clone
#[derive(Debug, Clone)]
pub struct ConnectivityNotifier {
    tx: mpsc::UnboundedSender<ConnectivityEvent>,
}

impl ConnectivityNotifier {
    /// Report that the host is online. Returns false if the connection is gone.
    pub fn online(&self) -> bool {
        self.tx.send(ConnectivityEvent::Online).is_ok()
    }

    /// Report that the host is offline. Returns false if the connection is gone.
    pub fn offline(&self) -> bool {
        self.tx.send(ConnectivityEvent::Offline).is_ok()
    }
}

/// Consumer side, handed to the connection builder
#[derive(Debug)]
pub struct ConnectivitySignal {
    rx: mpsc::UnboundedReceiver<ConnectivityEvent>,
}

impl ConnectivitySignal {
    pub async fn recv(&mut self) -> Option<ConnectivityEvent> {
        self.rx.recv().await
    }
}

/// Create a connected notifier/signal pair
pub fn channel() -> (ConnectivityNotifier, ConnectivitySignal) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ConnectivityNotifier { tx }, ConnectivitySignal { rx })
}
