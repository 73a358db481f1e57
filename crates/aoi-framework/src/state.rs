//! Process-wide bot state shared by command handlers.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::counter::CommandCounter;
use crate::message::MessageCompiler;
use crate::placeholder::Placeholders;
use crate::task::TaskRegistry;

/// State shared between the supervisor and every command.
///
/// Cloning is cheap and clones observe the same registry and counter.
#[derive(Debug, Clone)]
pub struct BotState {
    placeholders: Arc<Placeholders>,
    tasks: TaskRegistry,
    commands_executed: CommandCounter,
    messages_seen: CommandCounter,
    started_at: Instant,
    started_wall: SystemTime,
}

impl BotState {
    /// Creates state with the given placeholder table.
    pub fn new(placeholders: Placeholders) -> Self {
        Self {
            placeholders: Arc::new(placeholders),
            tasks: TaskRegistry::new(),
            commands_executed: CommandCounter::new(),
            messages_seen: CommandCounter::new(),
            started_at: Instant::now(),
            started_wall: SystemTime::now(),
        }
    }

    /// Returns the placeholder table.
    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Returns a message compiler over this state's placeholder table.
    pub fn compiler(&self) -> MessageCompiler {
        MessageCompiler::new(Arc::clone(&self.placeholders))
    }

    /// Returns the background task registry.
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Returns the completed-commands counter.
    pub fn commands_executed(&self) -> &CommandCounter {
        &self.commands_executed
    }

    /// Returns the counter of ordinary messages: ones from people that are
    /// not commands.
    pub fn messages_seen(&self) -> &CommandCounter {
        &self.messages_seen
    }

    /// Wall-clock time the state was created.
    pub fn started_at(&self) -> SystemTime {
        self.started_wall
    }

    /// Time since the state was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new(Placeholders::standard())
    }
}
