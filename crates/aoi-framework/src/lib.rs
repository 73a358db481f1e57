//! # Aoi Framework
//!
//! Building blocks used by command handlers of an Aoi bot.
//!
//! This layer provides:
//! - Placeholder substitution for user-authored templates ([`Placeholders`])
//! - Compilation of raw text / JSON documents into outbound messages
//!   ([`MessageCompiler`], [`Messenger`])
//! - Per-actor background task tracking ([`TaskRegistry`])
//! - A tower layer counting completed commands ([`CountCompletedLayer`])
//! - An in-memory command registry ([`CommandRegistry`])
//!
//! Everything here is independent of the session lifecycle, which lives in
//! `aoi-runtime`.

pub mod commands;
pub mod counter;
pub mod error;
pub mod message;
pub mod messenger;
pub mod placeholder;
pub mod state;
pub mod task;

pub use commands::{CommandRegistry, FindOptions, HIDDEN_CATEGORY};
pub use counter::{CommandCounter, CountCompleted, CountCompletedLayer};
pub use error::{FrameworkError, FrameworkResult, LookupError};
pub use message::{MessageCompiler, Structured, compile, parse_structured};
pub use messenger::{Member, Messenger};
pub use placeholder::{PlaceholderContext, Placeholders, ResolverFn, STANDARD_PLACEHOLDERS};
pub use state::BotState;
pub use task::{BackgroundTask, StatusFn, TaskHandle, TaskId, TaskOutcome, TaskRegistry};
