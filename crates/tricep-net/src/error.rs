//! Error types for the socket layer.

use std::fmt;

/// Transport-level socket errors.
///
/// This is the only error kind the socket layer produces. Payloads are kept as
/// strings so the error can be cloned, handed to an error handler and compared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// Establishing an outbound connection failed.
    #[error("Failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// Opening the listening endpoint failed.
    #[error("Failed to bind {address}: {message}")]
    Bind { address: String, message: String },

    /// Accepting an inbound connection failed.
    #[error("Accept error: {0}")]
    Accept(String),

    /// Mid-session I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The socket has no live connection to write to.
    #[error("Socket is not connected")]
    NotConnected,

    /// The write side has already been closed.
    #[error("Socket is closed")]
    Closed,

    /// No async runtime was available to drive the socket.
    #[error("No async runtime available: {0}")]
    Runtime(String),
}

impl SocketError {
    /// Create a connect error.
    pub fn connect(address: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connect {
            address: address.into(),
            message: message.to_string(),
        }
    }

    /// Create a bind error.
    pub fn bind(address: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Bind {
            address: address.into(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for SocketError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// A specialized Result type for socket operations.
pub type Result<T> = std::result::Result<T, SocketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SocketError::connect("localhost:9876", "connection refused");
        assert_eq!(err.to_string(), "Failed to connect to localhost:9876: connection refused");

        let err = SocketError::bind("0.0.0.0:80", "permission denied");
        assert_eq!(err.to_string(), "Failed to bind 0.0.0.0:80: permission denied");

        assert_eq!(SocketError::NotConnected.to_string(), "Socket is not connected");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        assert_eq!(SocketError::from(io), SocketError::Io("pipe gone".into()));
    }
}
