//! Send guard
//!
//! Sends issued while the connection is not open wait here for an open
//! already in flight (the initial `open()` or an automatic reconnect). The
//! guard never starts a connection itself. It polls with escalating delays
//! and gives up with [`SocketError::EstablishmentFailed`] when:
//!
//! - the attempt budget is spent,
//! - the connection has no endpoint, or
//! - the current handle is closed/closing and no reconnect is pending.

use crate::core::connection_state::ReadyState;
use crate::error::{Result, SocketError};
use std::time::Duration;
use tracing::{debug, warn};

/// Point-in-time view of the connection, as seen by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub ready_state: ReadyState,
    pub has_handle: bool,
    pub has_endpoint: bool,
    pub reconnect_pending: bool,
}

impl ConnectionSnapshot {
    /// A live handle is dead and nothing will replace it
    fn without_prospect(&self) -> bool {
        self.has_handle && self.ready_state.is_dead() && !self.reconnect_pending
    }
}

/// Escalation table for the send guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendGuardPolicy {
    delays: Vec<Duration>,
}

impl SendGuardPolicy {
    /// One attempt per entry; attempt `n` sleeps `delays[n - 1]`
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    #[inline]
    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    /// Delay for a 1-indexed attempt; the last entry repeats
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let index = attempt.saturating_sub(1).min(self.delays.len().saturating_sub(1));
        self.delays.get(index).copied().unwrap_or_default()
    }

    /// Sum of every delay in the table
    pub fn total_wait(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for SendGuardPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(2000),
            Duration::from_millis(5000),
        ])
    }
}

/// Wait until `current` reports an open connection
pub async fn wait_until_open<F>(policy: &SendGuardPolicy, current: F) -> Result<()>
where
    F: Fn() -> ConnectionSnapshot,
{
    let mut attempt = 0;

    loop {
        let snapshot = current();

        if snapshot.ready_state.is_open() {
            if attempt > 0 {
                debug!("Connection opened after {} send guard attempts", attempt);
            }
            return Ok(());
        }

        if attempt >= policy.max_attempts()
            || !snapshot.has_endpoint
            || snapshot.without_prospect()
        {
            warn!(
                "Send guard giving up after {} attempts (state: {:?})",
                attempt, snapshot.ready_state
            );
            return Err(SocketError::EstablishmentFailed { attempts: attempt });
        }

        attempt += 1;
        tokio::time::sleep(policy.delay_for(attempt)).await;
    }
}
