//! Gateway error types.
//!
//! Errors raised by the external gateway client. The session supervisor only
//! retries the transient ones; everything else ends startup immediately.

use thiserror::Error;

/// Errors that can occur while talking to the messaging gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The handshake could not reach the remote endpoint.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// The remote endpoint rejected the supplied credentials.
    #[error("authentication rejected: {reason}")]
    Unauthorized {
        /// Reason given by the gateway.
        reason: String,
    },

    /// The established connection was closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl GatewayError {
    /// Creates a connection failure.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Creates an authentication failure.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Creates a connection-closed error.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Returns `true` when retrying the handshake may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Io(_))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::connection_failed("timeout").is_transient());
        assert!(GatewayError::from(std::io::Error::other("reset")).is_transient());
        assert!(!GatewayError::unauthorized("bad token").is_transient());
        assert!(!GatewayError::closed("bye").is_transient());
        assert!(!GatewayError::SendFailed("full".into()).is_transient());
    }
}
