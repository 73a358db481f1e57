//! Aoi Runtime - session lifecycle for the Aoi bot engine.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`)
//! - Logging setup (`LoggingBuilder`)
//! - The pre-flight command catalog check (`validate_catalog`)
//! - The session supervisor (`SessionSupervisor`): configuration check,
//!   bounded connect loop with exponential backoff, event service and
//!   graceful shutdown
//!
//! ```ignore
//! use aoi_runtime::SessionSupervisor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let supervisor = SessionSupervisor::builder()
//!         .gateway(my_gateway)
//!         .catalog(my_commands)
//!         .build()?;
//!
//!     let state = supervisor.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod preflight;
pub mod supervisor;

#[cfg(test)]
mod test_support;

// Re-exports
pub use config::{AoiConfig, ConfigError, ConfigLoader, ConfigResult, Secrets};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use preflight::{ValidationError, Violation, validate_catalog};
pub use supervisor::{
    MAX_CONNECT_ATTEMPTS, SessionState, SessionSupervisor, SupervisorBuilder, backoff_delay,
    wait_for_shutdown,
};

// Re-export tracing for use by other crates
pub use tracing;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
