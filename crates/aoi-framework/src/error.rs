//! Error types for the Aoi framework.

use aoi_core::{ChannelId, GatewayError};
use thiserror::Error;

/// Errors surfaced to the immediate caller of framework operations.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// The target channel is not reachable from the actor's location.
    #[error("channel {channel} is not available in this server")]
    DestinationUnavailable {
        /// The requested channel.
        channel: ChannelId,
    },

    /// The gateway failed while sending.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Errors from looking up a command group by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No group starts with the given name.
    #[error("module {0} not found")]
    NotFound(String),

    /// More than one group starts with the given name.
    #[error(
        "name {name} can refer to multiple modules: {}; use a more specific name",
        .candidates.join(", ")
    )]
    Ambiguous {
        /// The searched name.
        name: String,
        /// Every matching group.
        candidates: Vec<String>,
    },
}

/// Result type for framework operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
