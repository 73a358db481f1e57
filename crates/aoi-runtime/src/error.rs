//! Runtime error types.

use aoi_core::GatewayError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::preflight::ValidationError;

/// Reasons startup or the session ended fatally.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Configuration could not be loaded or required keys are missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The command catalog failed pre-flight validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Every handshake attempt failed with a transient error.
    #[error("gave up connecting after {attempts} attempts: {last_error}")]
    ConnectAttemptsExhausted {
        attempts: u32,
        last_error: GatewayError,
    },

    /// A non-transient gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// `start` was called without a gateway.
    #[error("no gateway configured")]
    MissingGateway,

    /// `start` was called on a session that already started.
    #[error("session already started")]
    AlreadyStarted,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
