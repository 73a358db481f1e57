//! Read-only view of the registered command vocabulary.
//!
//! The pre-flight validation gate walks this catalog before the bot goes
//! live; the bot publishes its own command documentation, so every command
//! must carry help text and every visible group a description.

/// Metadata of a command group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroupInfo {
    /// Group name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Hidden groups are left out of the published documentation.
    pub hidden: bool,
}

impl CommandGroupInfo {
    /// Returns `true` if the description is present and not blank.
    pub fn is_documented(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Metadata of a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name.
    pub name: String,
    /// Short help text shown in listings.
    pub short_help: Option<String>,
    /// Alternative names.
    pub aliases: Vec<String>,
    /// Owning group, if any.
    pub group: Option<String>,
}

impl CommandInfo {
    /// Returns `true` if the short help is present and not blank.
    pub fn is_documented(&self) -> bool {
        self.short_help
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
    }

    /// Returns `group.name`, or just the name for ungrouped commands.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Enumerable command registry.
pub trait CommandCatalog: Send + Sync {
    /// Returns every registered group.
    fn groups(&self) -> Vec<CommandGroupInfo>;

    /// Returns every registered command.
    fn commands(&self) -> Vec<CommandInfo>;
}
