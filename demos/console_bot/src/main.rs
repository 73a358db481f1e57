//! Console Bot
//!
//! Runs the Aoi session lifecycle against a gateway backed by the terminal:
//! lines typed on stdin are commands, replies are printed to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Secrets come from the environment like in production
//! GATEWAY_TOKEN=t BANNED_TAGS=gore BANNED_PIXIV_TAGS=r18 cargo run -p console-bot
//!
//! # Or use throwaway credentials and watch three failed connects back off
//! cargo run -p console-bot -- --demo-credentials --fail-connects 3 --backoff-unit-ms 100
//!
//! # An undocumented command stops the bot before it serves anything
//! cargo run -p console-bot -- --demo-credentials --undocumented
//! ```

mod commands;
mod gateway;

use std::path::PathBuf;

use anyhow::{Result, bail};
use aoi::prelude::*;
use aoi::runtime::config::{AoiConfig, CredentialsConfig};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use crate::commands::Commands;
use crate::gateway::{CONSOLE_CHANNEL, ConsoleGateway};

#[derive(Debug, Parser)]
#[command(name = "console-bot", about = "Drive an Aoi bot from the terminal")]
struct Args {
    /// Configuration file to load instead of searching for aoi.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration profile (overrides AOI_PROFILE).
    #[arg(long)]
    profile: Option<String>,

    /// Number of handshakes that fail before the console comes online.
    #[arg(long, default_value_t = 0)]
    fail_connects: u32,

    /// Length of one backoff unit in milliseconds.
    #[arg(long)]
    backoff_unit_ms: Option<u64>,

    /// Use placeholder secrets instead of reading them from the environment.
    #[arg(long)]
    demo_credentials: bool,

    /// Register a command without help text.
    #[arg(long)]
    undocumented: bool,
}

fn base_config(args: &Args) -> AoiConfig {
    let mut config = AoiConfig::default();
    if let Some(unit) = args.backoff_unit_ms {
        config.connection.backoff_unit_ms = unit;
    }
    if args.demo_credentials {
        config.credentials = CredentialsConfig {
            gateway_token: Some("console".into()),
            banned_tags: Some("gore, spoilers".into()),
            banned_pixiv_tags: Some("r18".into()),
            ..Default::default()
        };
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let state = BotState::default();
    let registry = commands::registry(args.undocumented);
    let (lines_tx, lines_rx) = mpsc::channel(16);
    let gateway: BoxedGateway = Arc::new(ConsoleGateway::new(lines_tx, args.fail_connects));

    let mut builder = SessionSupervisor::builder()
        .merge(base_config(&args))
        .gateway(Arc::clone(&gateway))
        .catalog(Arc::new(registry.clone()))
        .state(state.clone());
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile.clone());
    }
    let supervisor = builder.build()?;

    let commands = Arc::new(Commands::new(
        Messenger::new(gateway, state.compiler()),
        state,
        registry,
    ));
    let user = Actor::new(1, "console", "0001");
    tokio::spawn(commands::dispatch(
        lines_rx,
        commands,
        user,
        ConsoleGateway::location(),
        CONSOLE_CHANNEL,
    ));

    let outcome = supervisor.run().await;
    info!(state = %outcome, "Session ended");

    if let SessionState::FatallyFailed(reason) = outcome {
        bail!("session failed: {reason}");
    }
    Ok(())
}
