//! Pre-flight validation of the command catalog.
//!
//! The bot publishes its own command documentation, so before it serves
//! events every visible group must have a description and every command
//! short help text. All violations are collected and logged together so a
//! single run shows everything that needs fixing.

use std::fmt;

use aoi_core::CommandCatalog;
use thiserror::Error;
use tracing::{debug, error};

/// One undocumented group or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A visible group without a description.
    GroupMissingDescription { group: String },
    /// A command without short help, named `group.command`.
    CommandMissingHelp { command: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupMissingDescription { group } => write!(f, "group {group}"),
            Self::CommandMissingHelp { command } => write!(f, "command {command}"),
        }
    }
}

/// The catalog failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "{} command group(s) or command(s) are undocumented: {}",
    .violations.len(),
    list(.violations)
)]
pub struct ValidationError {
    /// Every violation found, groups first.
    pub violations: Vec<Violation>,
}

fn list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// Names of the visible groups without a description.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().filter_map(|v| match v {
            Violation::GroupMissingDescription { group } => Some(group.as_str()),
            _ => None,
        })
    }

    /// Qualified names (`group.command`) of the commands without help text.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().filter_map(|v| match v {
            Violation::CommandMissingHelp { command } => Some(command.as_str()),
            _ => None,
        })
    }
}

/// Checks that every visible group and every command is documented.
///
/// Hidden groups may lack a description, but their commands still need help
/// text.
///
/// # Errors
///
/// [`ValidationError`] listing every violation, groups first.
pub fn validate_catalog(catalog: &dyn CommandCatalog) -> Result<(), ValidationError> {
    let groups = catalog.groups();
    let commands = catalog.commands();

    let mut violations: Vec<Violation> = groups
        .iter()
        .filter(|g| !g.hidden && !g.is_documented())
        .map(|g| Violation::GroupMissingDescription {
            group: g.name.clone(),
        })
        .collect();

    violations.extend(
        commands
            .iter()
            .filter(|c| !c.is_documented())
            .map(|c| Violation::CommandMissingHelp {
                command: c.qualified_name(),
            }),
    );

    if violations.is_empty() {
        debug!(
            groups = groups.len(),
            commands = commands.len(),
            "Command catalog passed validation"
        );
        return Ok(());
    }

    let err = ValidationError { violations };

    let missing_groups: Vec<_> = err.groups().collect();
    if !missing_groups.is_empty() {
        error!("The following command groups are missing a description");
        for group in &missing_groups {
            error!(group = %group, " - {group}");
        }
    }

    let missing_help: Vec<_> = err.commands().collect();
    if !missing_help.is_empty() {
        error!("The following commands are missing help text");
        for command in &missing_help {
            error!(command = %command, " - {command}");
        }
    }

    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;
    use aoi_core::{CommandGroupInfo, CommandInfo};

    struct StaticCatalog {
        groups: Vec<CommandGroupInfo>,
        commands: Vec<CommandInfo>,
    }

    impl CommandCatalog for StaticCatalog {
        fn groups(&self) -> Vec<CommandGroupInfo> {
            self.groups.clone()
        }

        fn commands(&self) -> Vec<CommandInfo> {
            self.commands.clone()
        }
    }

    fn group(name: &str, description: Option<&str>, hidden: bool) -> CommandGroupInfo {
        CommandGroupInfo {
            name: name.into(),
            description: description.map(Into::into),
            hidden,
        }
    }

    fn command(group: &str, name: &str, help: Option<&str>) -> CommandInfo {
        CommandInfo {
            name: name.into(),
            short_help: help.map(Into::into),
            aliases: Vec::new(),
            group: Some(group.into()),
        }
    }

    #[test]
    fn test_documented_catalog_passes() {
        let catalog = StaticCatalog {
            groups: vec![group("Weather", Some("Forecasts"), false)],
            commands: vec![command("Weather", "forecast", Some("Shows the forecast"))],
        };
        assert_eq!(validate_catalog(&catalog), Ok(()));
    }

    #[test]
    fn test_hidden_group_needs_no_description() {
        let catalog = StaticCatalog {
            groups: vec![group("Owner", None, true)],
            commands: vec![command("Owner", "reload", Some("Reloads a module"))],
        };
        assert!(validate_catalog(&catalog).is_ok());
    }

    #[test]
    fn test_reports_every_violation() {
        let catalog = StaticCatalog {
            groups: vec![
                group("Weather", Some("  "), false),
                group("Fun", Some("Games"), false),
                group("Owner", None, true),
            ],
            commands: vec![
                command("Fun", "roll", None),
                command("Fun", "flip", Some("Flips a coin")),
                command("Owner", "eval", Some("")),
            ],
        };

        let err = validate_catalog(&catalog).unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::GroupMissingDescription {
                    group: "Weather".into()
                },
                Violation::CommandMissingHelp {
                    command: "Fun.roll".into()
                },
                Violation::CommandMissingHelp {
                    command: "Owner.eval".into()
                },
            ]
        );
        assert_eq!(err.groups().collect::<Vec<_>>(), vec!["Weather"]);
        assert_eq!(err.commands().count(), 2);
        assert!(err.to_string().contains("command Fun.roll"));
    }

    #[test]
    fn test_logs_every_offender_by_group_and_name() {
        let catalog = StaticCatalog {
            groups: vec![group("Weather", None, false), group("Fun", Some("Games"), false)],
            commands: vec![
                command("Fun", "roll", None),
                command("Weather", "radar", Some("")),
                command("Fun", "flip", Some("Flips a coin")),
            ],
        };

        let (result, logs) = capture_logs(|| validate_catalog(&catalog));

        assert!(result.is_err());
        assert!(logs.contains("command groups are missing a description"));
        assert!(logs.contains(" - Weather"));
        assert!(logs.contains("commands are missing help text"));
        assert!(logs.contains(" - Fun.roll"));
        assert!(logs.contains(" - Weather.radar"));
        assert!(!logs.contains("Fun.flip"));
    }
}
