//! Console commands and their dispatch loop.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use aoi::framework::{FindOptions, HIDDEN_CATEGORY};
use aoi::prelude::*;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tower::{ServiceBuilder, ServiceExt, service_fn};
use tracing::{debug, warn};

use crate::gateway::ConsoleLine;

/// A parsed `/name args` line together with who typed it.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub actor: Actor,
    pub location: Location,
    pub channel: ChannelId,
    pub name: String,
    pub args: String,
}

/// Splits `/name rest of line` into its name and arguments.
pub fn parse(line: &str) -> Option<(String, String)> {
    let rest = line.trim().strip_prefix('/')?;
    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.trim().to_string()))
}

fn command(group: &str, name: &str, help: Option<&str>, aliases: &[&str]) -> CommandInfo {
    CommandInfo {
        name: name.into(),
        short_help: help.map(Into::into),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        group: Some(group.into()),
    }
}

/// Builds the command registry. `undocumented` adds a command without help
/// text, which makes the pre-flight check refuse to start.
pub fn registry(undocumented: bool) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register_group("General", Some("Everyday commands"))
        .register_group("Tasks", Some("Background work you can check on"))
        .register_group("Debug", None::<String>)
        .set_group_category("General", "Information")
        .set_group_category("Tasks", "Utility")
        .set_group_category("Debug", HIDDEN_CATEGORY)
        .register_command(command("General", "help", Some("Shows this list"), &["h"]))
        .register_command(command("General", "ping", Some("Checks that the bot is alive"), &[]))
        .register_command(command(
            "General",
            "say",
            Some("Sends text or a JSON document, with placeholders"),
            &["echo"],
        ))
        .register_command(command(
            "General",
            "whisper",
            Some("Like say, but the reply is deleted after ten seconds"),
            &[],
        ))
        .register_command(command(
            "General",
            "placeholders",
            Some("Lists the placeholders say understands"),
            &[],
        ))
        .register_command(command(
            "General",
            "modules",
            Some("Finds command groups by name prefix"),
            &[],
        ))
        .register_command(command("General", "stats", Some("Shows bot statistics"), &[]))
        .register_command(command(
            "Tasks",
            "sleep",
            Some("Sleeps in the background for N seconds"),
            &[],
        ))
        .register_command(command(
            "Tasks",
            "tasks",
            Some("Lists your running background tasks"),
            &[],
        ))
        .register_command(command(
            "Debug",
            "fail",
            Some("Always fails and is not counted"),
            &[],
        ));

    if undocumented {
        registry.register_command(command("General", "todo", None, &[]));
    }

    registry
}

/// Parses `/sleep` arguments into the number of seconds and the wake-up time.
fn sleep_deadline(args: &str, now: Instant) -> Result<(u64, Instant)> {
    let secs: u64 = args
        .parse()
        .with_context(|| format!("usage: /sleep <seconds>, got {args:?}"))?;
    let deadline = now
        .checked_add(Duration::from_secs(secs))
        .ok_or_else(|| anyhow!("usage: /sleep <seconds>, {secs}s is too long"))?;
    Ok((secs, deadline))
}

/// Executes console commands.
pub struct Commands {
    messenger: Messenger,
    state: BotState,
    registry: CommandRegistry,
}

impl Commands {
    pub fn new(messenger: Messenger, state: BotState, registry: CommandRegistry) -> Self {
        Self {
            messenger,
            state,
            registry,
        }
    }

    fn resolve(&self, name: &str) -> Option<CommandInfo> {
        self.registry.commands().into_iter().find(|c| {
            c.name.eq_ignore_ascii_case(name) || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }

    async fn reply(&self, req: &CommandRequest, text: &str) -> Result<()> {
        self.messenger
            .send_json_to_channel(req.channel, text, None, None)
            .await?;
        Ok(())
    }

    /// Runs one command.
    pub async fn handle(&self, req: CommandRequest) -> Result<()> {
        let command = self
            .resolve(&req.name)
            .ok_or_else(|| anyhow!("unknown command /{}", req.name))?;
        debug!(command = %command.qualified_name(), args = %req.args, "Running command");

        match command.name.as_str() {
            "help" => self.help(&req).await,
            "ping" => self.reply(&req, "Pong!").await,
            "say" | "whisper" => {
                if req.args.is_empty() {
                    bail!("usage: /{} <text or JSON>", command.name);
                }
                let delete_after = (command.name == "whisper").then(|| Duration::from_secs(10));
                self.messenger
                    .send_json_to_channel(
                        req.channel,
                        &req.args,
                        Some(Member::new(&req.actor, &req.location)),
                        delete_after,
                    )
                    .await?;
                Ok(())
            }
            "placeholders" => {
                let tokens: Vec<String> = self
                    .state
                    .placeholders()
                    .supported()
                    .iter()
                    .map(|t| format!("&{t};"))
                    .collect();
                self.reply(&req, &tokens.join(" ")).await
            }
            "modules" => {
                let found = self.registry.find_group(
                    &req.args,
                    FindOptions {
                        allow_ambiguous: true,
                        allow_none: false,
                    },
                )?;
                self.reply(&req, &found.join(", ")).await
            }
            "stats" => {
                let text = format!(
                    "{} commands completed, {} messages seen, {} background tasks, up {}s",
                    self.state.commands_executed().get(),
                    self.state.messages_seen().get(),
                    self.state.tasks().len(),
                    self.state.uptime().as_secs()
                );
                self.reply(&req, &text).await
            }
            "sleep" => self.sleep(&req).await,
            "tasks" => self.tasks(&req).await,
            "fail" => bail!("this command always fails"),
            other => bail!("/{other} is registered but not implemented"),
        }
    }

    async fn help(&self, req: &CommandRequest) -> Result<()> {
        let mut lines = Vec::new();
        for (category, groups) in self.registry.categories() {
            if category == HIDDEN_CATEGORY {
                continue;
            }
            lines.push(format!("{category}:"));
            for group in groups {
                for command in self.registry.commands_in(group) {
                    lines.push(format!(
                        "  /{} - {}",
                        command.name,
                        command.short_help.as_deref().unwrap_or("")
                    ));
                }
            }
        }
        self.reply(req, &lines.join("\n")).await
    }

    async fn sleep(&self, req: &CommandRequest) -> Result<()> {
        let (secs, deadline) = sleep_deadline(&req.args, Instant::now())?;

        let status: StatusFn = Arc::new(move || {
            format!(
                "sleeping, {}s left",
                deadline.saturating_duration_since(Instant::now()).as_secs()
            )
        });

        let messenger = self.messenger.clone();
        let channel = req.channel;
        let handle = self.state.tasks().register(
            &req.actor,
            async move {
                tokio::time::sleep_until(deadline).await;
                messenger
                    .send_json_to_channel(channel, &format!("Slept for {secs}s"), None, None)
                    .await
            },
            Some(status),
        );

        self.reply(req, &format!("Started task #{}", handle.id())).await
    }

    async fn tasks(&self, req: &CommandRequest) -> Result<()> {
        let tasks = self.state.tasks().list_for(req.actor.id);
        if tasks.is_empty() {
            return self.reply(req, "You have no running tasks").await;
        }

        let lines: Vec<String> = tasks
            .iter()
            .map(|t| format!("#{} {} (running {}s)", t.id(), t.status(), t.elapsed().as_secs()))
            .collect();
        self.reply(req, &lines.join("\n")).await
    }
}

/// Handles console lines one at a time until the gateway stops sending.
pub async fn dispatch(
    mut lines: mpsc::Receiver<ConsoleLine>,
    commands: Arc<Commands>,
    actor: Actor,
    location: Location,
    channel: ChannelId,
) {
    let counter = commands.state.commands_executed().clone();
    let messages_seen = commands.state.messages_seen().clone();
    let service = ServiceBuilder::new()
        .layer(CountCompletedLayer::new(counter))
        .service(service_fn(move |req: CommandRequest| {
            let commands = Arc::clone(&commands);
            async move { commands.handle(req).await }
        }));

    while let Some(line) = lines.recv().await {
        let Some((name, args)) = parse(&line.text) else {
            if !line.text.trim().is_empty() {
                messages_seen.increment();
            }
            let _ = line.done.send(());
            continue;
        };

        let req = CommandRequest {
            actor: actor.clone(),
            location: location.clone(),
            channel,
            name: name.clone(),
            args,
        };
        if let Err(e) = service.clone().oneshot(req).await {
            warn!(command = %name, error = %e, "Command failed");
            println!("error: {e:#}");
        }
        let _ = line.done.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoi::runtime::validate_catalog;

    #[test]
    fn test_parse() {
        assert_eq!(parse("/ping"), Some(("ping".into(), String::new())));
        assert_eq!(
            parse("  /SAY hello &user_name; "),
            Some(("say".into(), "hello &user_name;".into()))
        );
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("/"), None);
    }

    #[test]
    fn test_sleep_deadline() {
        let now = Instant::now();
        let (secs, deadline) = sleep_deadline("5", now).unwrap();
        assert_eq!(secs, 5);
        assert_eq!(deadline - now, Duration::from_secs(5));

        assert!(sleep_deadline("soon", now).is_err());
        assert!(sleep_deadline(&u64::MAX.to_string(), now).is_err());
    }

    #[test]
    fn test_registry_passes_preflight() {
        assert!(validate_catalog(&registry(false)).is_ok());
        assert!(validate_catalog(&registry(true)).is_err());
    }
}
