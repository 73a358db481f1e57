//! # Aoi Core
//!
//! Core types of the Aoi bot engine.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Identities and message shapes:
//! - **Identities**: [`Actor`], [`Location`], [`Destination`]
//! - **Outbound messages**: [`MessageSpec`]
//! - **Errors**: [`GatewayError`]
//!
//! ### Integration Layer
//!
//! Interfaces to external collaborators:
//! - **Gateway client**: [`Gateway`]
//! - **Command registry**: [`CommandCatalog`]
//!
//! Higher-level machinery (placeholders, message compilation, background
//! tasks) lives in `aoi-framework`; the session supervisor lives in
//! `aoi-runtime`.

pub mod foundation;
pub mod integration;

pub use foundation::{
    Actor, ActorId, ChannelId, Destination, GatewayError, GatewayResult, Location, LocationId,
    MessageSpec, PLAIN_TEXT_KEY, RichContent, THUMBNAIL_KEY,
};

pub use integration::{
    BoxedGateway, CommandCatalog, CommandGroupInfo, CommandInfo, Credentials, Gateway,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
