//! Gateway client trait.
//!
//! The engine never speaks the wire protocol itself. A gateway client (a
//! Discord library wrapper, a console shim, a test double) implements
//! [`Gateway`] and the session supervisor drives it:
//!
//! ```text
//! authenticate ──(retry w/ backoff)──► pre-flight gate ──► serve_events
//!                                                            │
//!                             commands ── send_message ◄─────┘
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::{ChannelId, Destination, GatewayResult, MessageSpec};

/// Credentials used for the gateway handshake.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// Wraps a bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the raw token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// An externally supplied messaging gateway client.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns a short name used in logs.
    fn name(&self) -> &str {
        "gateway"
    }

    /// Performs the authentication handshake.
    ///
    /// Transient failures should be reported as
    /// [`GatewayError::ConnectionFailed`](crate::GatewayError::ConnectionFailed)
    /// so the supervisor retries them.
    async fn authenticate(&self, credentials: &Credentials) -> GatewayResult<()>;

    /// Serves inbound events until the connection ends.
    async fn serve_events(&self) -> GatewayResult<()>;

    /// Looks up a send target by id.
    fn resolve_destination(&self, id: ChannelId) -> Option<Destination>;

    /// Sends a compiled message.
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageSpec,
    ) -> GatewayResult<()>;
}

/// Shared gateway handle.
pub type BoxedGateway = Arc<dyn Gateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = Credentials::new("super-secret");
        let shown = format!("{creds:?}");
        assert!(!shown.contains("super-secret"));
        assert_eq!(creds.token(), "super-secret");
    }
}
