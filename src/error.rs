//! Crate-level error types
//!
//! Errors surfaced by the server, transport, and bus layers. Authorization
//! failures have their own type in [`crate::auth::AuthError`] because they
//! are reported back to the requesting connection rather than propagated.

use tokio_tungstenite::tungstenite;

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for broker operations
#[derive(Debug)]
pub enum Error {
    /// I/O error (bind, accept)
    Io(std::io::Error),
    /// WebSocket handshake or framing error
    WebSocket(tungstenite::Error),
    /// Distributed bus / cache error
    Bus(redis::RedisError),
    /// JSON encoding or decoding error
    Serialize(serde_json::Error),
    /// Invalid configuration value
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Bus(e) => write!(f, "Bus error: {}", e),
            Error::Serialize(e) => write!(f, "Serialization error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::Bus(e) => Some(e),
            Error::Serialize(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Bus(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialize(e)
    }
}
