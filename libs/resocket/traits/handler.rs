use crate::parser::WsMessage;
use crate::transport::{CloseEvent, OpenEvent};

/// Lifecycle notifications for a managed connection
///
/// Every method has an empty default body, so implementors only override
/// the notifications they care about. All callbacks are invoked from the
/// connection's driver task, one at a time, and should return quickly.
///
/// # Example
///
/// ```ignore
/// struct Logger;
///
/// impl ConnectionHandler for Logger {
///     fn on_message(&self, message: &WsMessage) {
///         tracing::info!("received {} bytes", message.len());
///     }
/// }
/// ```
pub trait ConnectionHandler: Send + Sync + 'static {
    /// First open, or any open not preceded by reconnect attempts
    fn on_open(&self, _event: &OpenEvent) {}

    /// Incoming text or binary payload
    fn on_message(&self, _message: &WsMessage) {}

    /// Transport error, forwarded verbatim
    fn on_error(&self, _error: &str) {}

    /// Closure that is not followed by an automatic reconnect
    fn on_close(&self, _event: &CloseEvent) {}

    /// Open that ended a chain of reconnect attempts
    fn on_reconnect(&self) {}

    /// Reconnect attempts exhausted or cancelled
    fn on_reconnect_fail(&self) {}

    /// Keepalive ping was sent
    fn on_ping(&self) {}
}

/// A handler that ignores every notification
pub struct NoOpHandler;

impl ConnectionHandler for NoOpHandler {}

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;
type Notify = Box<dyn Fn() + Send + Sync>;

/// Closure-based handler set
///
/// A sparse mapping from lifecycle event to callback. Unset entries are
/// skipped.
///
/// ```ignore
/// let handlers = Handlers::new()
///     .on_message(|msg| println!("{:?}", msg))
///     .on_reconnect_fail(|| eprintln!("gave up"));
/// ```
#[derive(Default)]
pub struct Handlers {
    open: Option<Callback<OpenEvent>>,
    message: Option<Callback<WsMessage>>,
    error: Option<Box<dyn Fn(&str) + Send + Sync>>,
    close: Option<Callback<CloseEvent>>,
    reconnect: Option<Notify>,
    reconnect_fail: Option<Notify>,
    ping: Option<Notify>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(mut self, f: impl Fn(&OpenEvent) + Send + Sync + 'static) -> Self {
        self.open = Some(Box::new(f));
        self
    }

    pub fn on_message(mut self, f: impl Fn(&WsMessage) + Send + Sync + 'static) -> Self {
        self.message = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn(&CloseEvent) + Send + Sync + 'static) -> Self {
        self.close = Some(Box::new(f));
        self
    }

    pub fn on_reconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.reconnect = Some(Box::new(f));
        self
    }

    pub fn on_reconnect_fail(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.reconnect_fail = Some(Box::new(f));
        self
    }

    pub fn on_ping(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.ping = Some(Box::new(f));
        self
    }
}

impl ConnectionHandler for Handlers {
    fn on_open(&self, event: &OpenEvent) {
        if let Some(f) = &self.open {
            f(event);
        }
    }

    fn on_message(&self, message: &WsMessage) {
        if let Some(f) = &self.message {
            f(message);
        }
    }

    fn on_error(&self, error: &str) {
        if let Some(f) = &self.error {
            f(error);
        }
    }

    fn on_close(&self, event: &CloseEvent) {
        if let Some(f) = &self.close {
            f(event);
        }
    }

    fn on_reconnect(&self) {
        if let Some(f) = &self.reconnect {
            f();
        }
    }

    fn on_reconnect_fail(&self) {
        if let Some(f) = &self.reconnect_fail {
            f();
        }
    }

    fn on_ping(&self) {
        if let Some(f) = &self.ping {
            f();
        }
    }
}
