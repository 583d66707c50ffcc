//! Keepalive (ping) scheduler
//!
//! # Architecture
//!
//! The keepalive timer is a dedicated Tokio task that only keeps time:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Keepalive Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. Emit tick ──────┼──> Unbounded Channel ──> Connection driver
//! │  3. Repeat          │                           (checks open, sends ping,
//! └─────────────────────┘                            fires on_ping)
//! ```
//!
//! The driver owns the decision of whether a tick turns into a ping, so the
//! task never touches the socket. Dropping the [`KeepaliveTimer`] stops the
//! task; the driver drops it on every closure path and before creating a new
//! handle, so at most one timer is alive per connection.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Tick loop run by the keepalive task
///
/// 1. Wait for the first interval (skips the immediate first tick)
/// 2. On each tick, notify the driver
/// 3. Continue until the shutdown signal fires or the driver stops listening
pub async fn keepalive_task(
    interval: Duration,
    tick_tx: mpsc::UnboundedSender<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Keepalive task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Keepalive task received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if tick_tx.send(()).is_err() {
                    debug!("Keepalive channel closed, shutting down keepalive task");
                    break;
                }
            }
        }
    }

    debug!("Keepalive task exiting");
}

/// Handle to a running keepalive task
pub struct KeepaliveTimer {
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    tick_rx: mpsc::UnboundedReceiver<()>,
}

impl KeepaliveTimer {
    /// Spawn a keepalive task ticking every `interval`
    pub fn spawn(interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(keepalive_task(interval, tick_tx, shutdown_rx));

        Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            tick_rx,
        }
    }

    /// Wait for the next tick; `None` once the task has exited
    pub async fn tick(&mut self) -> Option<()> {
        self.tick_rx.recv().await
    }

    /// Stop the task
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for KeepaliveTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
