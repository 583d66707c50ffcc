//! WebSocket close codes and disconnect requests

/// Standard close codes from the WebSocket close-code registry (RFC 6455 §7.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    NormalClosure = 1000,
    GoingAway = 1001,
    ProtocolError = 1002,
    UnsupportedData = 1003,
    Reserved = 1004,
    NoStatusReceived = 1005,
    AbnormalClosure = 1006,
    InvalidFramePayloadData = 1007,
    PolicyViolation = 1008,
    MessageTooBig = 1009,
    MandatoryExtension = 1010,
    InternalError = 1011,
    ServiceRestart = 1012,
    TryAgainLater = 1013,
    BadGateway = 1014,
    TlsHandshake = 1015,
}

impl CloseCode {
    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            1000 => CloseCode::NormalClosure,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1004 => CloseCode::Reserved,
            1005 => CloseCode::NoStatusReceived,
            1006 => CloseCode::AbnormalClosure,
            1007 => CloseCode::InvalidFramePayloadData,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            1012 => CloseCode::ServiceRestart,
            1013 => CloseCode::TryAgainLater,
            1014 => CloseCode::BadGateway,
            1015 => CloseCode::TlsHandshake,
            _ => return None,
        })
    }

    /// Human-readable registry name
    pub fn description(self) -> &'static str {
        match self {
            CloseCode::NormalClosure => "Normal Closure",
            CloseCode::GoingAway => "Going Away",
            CloseCode::ProtocolError => "Protocol Error",
            CloseCode::UnsupportedData => "Unsupported Data",
            CloseCode::Reserved => "Reserved",
            CloseCode::NoStatusReceived => "No Status Received",
            CloseCode::AbnormalClosure => "Abnormal Closure",
            CloseCode::InvalidFramePayloadData => "Invalid frame payload data",
            CloseCode::PolicyViolation => "Policy Violation",
            CloseCode::MessageTooBig => "Message Too Big",
            CloseCode::MandatoryExtension => "Mandatory Ext.",
            CloseCode::InternalError => "Internal Error",
            CloseCode::ServiceRestart => "Service restart",
            CloseCode::TryAgainLater => "Try again later",
            CloseCode::BadGateway => "Bad Gateway",
            CloseCode::TlsHandshake => "TLS handshake",
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.description())
    }
}

/// Reason sent when a caller closes without specifying one
pub const DEFAULT_CLOSE_REASON: &str = "Client closed the connection.";

/// Code and reason for an explicit close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub code: CloseCode,
    pub reason: String,
}

impl DisconnectRequest {
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn with_code(code: CloseCode) -> Self {
        Self::new(code, DEFAULT_CLOSE_REASON)
    }
}

impl Default for DisconnectRequest {
    fn default() -> Self {
        Self::with_code(CloseCode::NormalClosure)
    }
}
