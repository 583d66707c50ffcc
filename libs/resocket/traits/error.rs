use thiserror::Error;

/// Main error type for resocket
#[derive(Error, Debug)]
pub enum SocketError {
    /// The send guard gave up waiting for the connection to open
    #[error("Failed to establish connection after {attempts} attempts")]
    EstablishmentFailed { attempts: usize },

    /// The manager has no endpoint (never configured, or torn down)
    #[error("No endpoint configured for this connection")]
    EndpointMissing,

    /// Connection closed before the operation could complete
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Transport-level WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for resocket operations
pub type Result<T> = std::result::Result<T, SocketError>;
