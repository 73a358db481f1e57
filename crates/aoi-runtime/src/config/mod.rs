//! Configuration module for the Aoi runtime.
//!
//! Layered loading (defaults, `aoi.toml`, environment), the schema, and
//! validation of the loaded values.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config};
pub use schema::{
    AoiConfig, ConnectionConfig, CredentialsConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, SECRET_KEYS, Secrets, SpanEventConfig, split_tags,
};
pub use validation::validate_config;
