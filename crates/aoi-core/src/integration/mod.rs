//! Integration layer - interfaces to external collaborators.
//!
//! - [`Gateway`]: the externally supplied messaging gateway client
//! - [`CommandCatalog`]: read-only view of the registered command vocabulary

pub mod command;
pub mod gateway;

pub use command::{CommandCatalog, CommandGroupInfo, CommandInfo};
pub use gateway::{BoxedGateway, Credentials, Gateway};
