//! # Aoi
//!
//! Session lifecycle and task supervision for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  authenticate / serve_events   ┌─────────┐
//! │ SessionSupervisor│───────────────────────────────▶│ Gateway │
//! │  (aoi-runtime)   │                                 └────▲────┘
//! └────────┬─────────┘                                      │ send_message
//!          │ owns                                           │
//!          ▼                                          ┌─────┴─────┐
//! ┌──────────────────┐   register / list_for         │ Messenger │
//! │     BotState     │◀──────── command handlers ───▶│ (compile) │
//! │ tasks · counter  │                                └───────────┘
//! └──────────────────┘
//! ```
//!
//! - **Core**: identities, message shapes and the gateway / catalog traits
//! - **Framework**: placeholders, message compilation, background tasks,
//!   command counting and the command registry
//! - **Runtime**: configuration, logging, pre-flight validation and the
//!   session supervisor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aoi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut commands = CommandRegistry::new();
//!     commands.register_group("General", Some("Everyday commands"));
//!
//!     let supervisor = SessionSupervisor::builder()
//!         .gateway(Arc::new(MyGateway::default()))
//!         .catalog(Arc::new(commands))
//!         .build()?;
//!
//!     supervisor.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `aoi.toml` configuration files (default)
//! - `json-log`: JSON log output

pub use aoi_core as core;
pub use aoi_framework as framework;
pub use aoi_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use aoi::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use aoi_runtime::{SessionState, SessionSupervisor};

    // Identities and messages
    pub use aoi_core::{Actor, ChannelId, Destination, Location, MessageSpec};

    // Traits for custom gateways and catalogs
    pub use aoi_core::{
        BoxedGateway, CommandCatalog, CommandInfo, Credentials, Gateway, GatewayError,
        GatewayResult,
    };

    // Command handling
    pub use aoi_framework::{
        BotState, CommandRegistry, CountCompletedLayer, Member, Messenger, StatusFn,
        TaskOutcome, TaskRegistry,
    };

    pub use std::sync::Arc;
}
