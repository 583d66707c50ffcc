use std::sync::atomic::{AtomicU8, Ordering};

/// Ready state of a socket, matching the four standard WebSocket states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    #[inline]
    pub fn is_open(self) -> bool {
        self == ReadyState::Open
    }

    /// Closed or closing: the socket will never reach open again
    #[inline]
    pub fn is_dead(self) -> bool {
        matches!(self, ReadyState::Closing | ReadyState::Closed)
    }
}

/// Lock-free ready state cell shared between a transport task and readers
#[derive(Debug)]
pub struct AtomicReadyState {
    state: AtomicU8,
}

impl AtomicReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ReadyState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move to `next` only if the current state is `current`
    pub fn transition(&self, current: ReadyState, next: ReadyState) -> bool {
        self.state
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get().is_open()
    }
}

impl Default for AtomicReadyState {
    fn default() -> Self {
        Self::new(ReadyState::Connecting)
    }
}
