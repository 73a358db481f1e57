//! Foundation layer - identities and message shapes.
//!
//! This module contains the read-only data the engine receives from the
//! gateway client and the normalized outbound message form:
//! - [`Actor`] / [`Location`] / [`Destination`] identities
//! - [`MessageSpec`], the compiled outbound message

pub mod error;
pub mod message;
pub mod model;

pub use error::{GatewayError, GatewayResult};
pub use message::{MessageSpec, PLAIN_TEXT_KEY, RichContent, THUMBNAIL_KEY};
pub use model::{Actor, ActorId, ChannelId, Destination, Location, LocationId};
