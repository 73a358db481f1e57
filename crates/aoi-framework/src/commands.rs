//! In-memory command registry.
//!
//! Holds the command groups and commands a bot exposes, files groups under
//! display categories, and implements [`CommandCatalog`] so the pre-flight
//! gate can inspect it. Groups filed under [`HIDDEN_CATEGORY`] are reported
//! as hidden.

use aoi_core::{CommandCatalog, CommandGroupInfo, CommandInfo};
use tracing::trace;

use crate::error::LookupError;

/// Category whose groups are hidden from help and exempt from description checks.
pub const HIDDEN_CATEGORY: &str = "Hidden";

/// Options for [`CommandRegistry::find_group`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Return every match instead of failing when several groups match.
    pub allow_ambiguous: bool,
    /// Return an empty list instead of failing when nothing matches.
    pub allow_none: bool,
}

#[derive(Debug, Clone)]
struct GroupEntry {
    name: String,
    description: Option<String>,
}

/// Registry of command groups and commands.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    groups: Vec<GroupEntry>,
    commands: Vec<CommandInfo>,
    categories: Vec<(String, Vec<String>)>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group, replacing the description of an existing one.
    pub fn register_group(
        &mut self,
        name: impl Into<String>,
        description: Option<impl Into<String>>,
    ) -> &mut Self {
        let name = name.into();
        let description = description.map(Into::into);

        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(existing) => existing.description = description,
            None => {
                trace!(group = %name, "Command group registered");
                self.groups.push(GroupEntry { name, description });
            }
        }
        self
    }

    /// Registers a command.
    pub fn register_command(&mut self, command: CommandInfo) -> &mut Self {
        trace!(command = %command.qualified_name(), "Command registered");
        self.commands.push(command);
        self
    }

    /// Files `group` under `category`. A group may appear in several categories.
    pub fn set_group_category(
        &mut self,
        group: impl Into<String>,
        category: impl Into<String>,
    ) -> &mut Self {
        let group = group.into();
        let category = category.into();

        match self.categories.iter_mut().find(|(c, _)| *c == category) {
            Some((_, groups)) => groups.push(group),
            None => self.categories.push((category, vec![group])),
        }
        self
    }

    /// Returns the categories and their groups, in the order they were created.
    pub fn categories(&self) -> &[(String, Vec<String>)] {
        &self.categories
    }

    /// Returns `true` if `group` is filed under [`HIDDEN_CATEGORY`].
    pub fn is_hidden(&self, group: &str) -> bool {
        self.categories
            .iter()
            .any(|(c, groups)| c == HIDDEN_CATEGORY && groups.iter().any(|g| g == group))
    }

    /// Returns the commands belonging to `group`.
    pub fn commands_in<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a CommandInfo> {
        self.commands
            .iter()
            .filter(move |c| c.group.as_deref() == Some(group))
    }

    /// Looks up groups by case-insensitive name prefix.
    ///
    /// An exact (case-insensitive) match returns only that group.
    ///
    /// # Errors
    ///
    /// [`LookupError::NotFound`] when nothing matches and `allow_none` is unset;
    /// [`LookupError::Ambiguous`] when several groups match and
    /// `allow_ambiguous` is unset.
    pub fn find_group(&self, name: &str, options: FindOptions) -> Result<Vec<String>, LookupError> {
        let needle = name.to_lowercase();
        let mut found = Vec::new();

        for group in &self.groups {
            let candidate = group.name.to_lowercase();
            if candidate == needle {
                found = vec![group.name.clone()];
                break;
            }
            if candidate.starts_with(&needle) {
                found.push(group.name.clone());
            }
        }

        if found.is_empty() && !options.allow_none {
            return Err(LookupError::NotFound(name.to_string()));
        }
        if found.len() > 1 && !options.allow_ambiguous {
            return Err(LookupError::Ambiguous {
                name: name.to_string(),
                candidates: found,
            });
        }
        Ok(found)
    }
}

impl CommandCatalog for CommandRegistry {
    fn groups(&self) -> Vec<CommandGroupInfo> {
        self.groups
            .iter()
            .map(|g| CommandGroupInfo {
                name: g.name.clone(),
                description: g.description.clone(),
                hidden: self.is_hidden(&g.name),
            })
            .collect()
    }

    fn commands(&self) -> Vec<CommandInfo> {
        self.commands.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register_group("Weather", Some("Forecasts"))
            .register_group("Web", Some("Web searches"))
            .register_group("Owner", None::<String>)
            .set_group_category("Weather", "Information")
            .set_group_category("Web", "Information")
            .set_group_category("Owner", HIDDEN_CATEGORY);
        registry
    }

    #[test]
    fn test_prefix_lookup_is_case_insensitive() {
        let registry = registry();
        let found = registry.find_group("own", FindOptions::default()).unwrap();
        assert_eq!(found, vec!["Owner"]);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let registry = registry();

        let err = registry.find_group("we", FindOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            LookupError::Ambiguous { ref candidates, .. } if candidates == &["Weather", "Web"]
        ));

        let found = registry
            .find_group(
                "we",
                FindOptions {
                    allow_ambiguous: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(found, vec!["Weather", "Web"]);
    }

    #[test]
    fn test_exact_match_wins_over_prefix() {
        let mut registry = registry();
        registry.register_group("Webhooks", Some("Hooks"));

        let found = registry.find_group("WEB", FindOptions::default()).unwrap();
        assert_eq!(found, vec!["Web"]);
    }

    #[test]
    fn test_not_found() {
        let registry = registry();

        assert!(matches!(
            registry.find_group("music", FindOptions::default()),
            Err(LookupError::NotFound(ref n)) if n == "music"
        ));

        let found = registry
            .find_group(
                "music",
                FindOptions {
                    allow_none: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_catalog_marks_hidden_groups() {
        let registry = registry();
        let groups = registry.groups();

        let owner = groups.iter().find(|g| g.name == "Owner").unwrap();
        assert!(owner.hidden);
        assert!(groups.iter().filter(|g| g.name != "Owner").all(|g| !g.hidden));
    }

    #[test]
    fn test_commands_in_group() {
        let mut registry = registry();
        registry
            .register_command(CommandInfo {
                name: "forecast".into(),
                short_help: Some("Shows the forecast".into()),
                aliases: vec!["fc".into()],
                group: Some("Weather".into()),
            })
            .register_command(CommandInfo {
                name: "google".into(),
                short_help: Some("Searches the web".into()),
                aliases: Vec::new(),
                group: Some("Web".into()),
            });

        let names: Vec<_> = registry.commands_in("Weather").map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["forecast"]);
        assert_eq!(registry.commands().len(), 2);
    }

    #[test]
    fn test_reregistering_group_updates_description() {
        let mut registry = registry();
        registry.register_group("Owner", Some("Bot owner tools"));

        let groups = registry.groups();
        assert_eq!(groups.len(), 3);
        let owner = groups.iter().find(|g| g.name == "Owner").unwrap();
        assert_eq!(owner.description.as_deref(), Some("Bot owner tools"));
    }
}
