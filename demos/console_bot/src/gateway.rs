//! A gateway that reads commands from stdin and prints replies to stdout.

use std::sync::atomic::{AtomicU32, Ordering};

use aoi::prelude::*;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// The only channel of the console server.
pub const CONSOLE_CHANNEL: ChannelId = 1;

/// The console server.
pub const CONSOLE_LOCATION: u64 = 1;

/// One line typed by the user, acknowledged once it has been handled.
#[derive(Debug)]
pub struct ConsoleLine {
    pub text: String,
    pub done: oneshot::Sender<()>,
}

/// Gateway backed by the process's stdin and stdout.
pub struct ConsoleGateway {
    lines: mpsc::Sender<ConsoleLine>,
    fail_connects: u32,
    attempts: AtomicU32,
}

impl ConsoleGateway {
    /// Creates a gateway forwarding input lines to `lines`.
    ///
    /// The first `fail_connects` handshakes fail as if the network were down.
    pub fn new(lines: mpsc::Sender<ConsoleLine>, fail_connects: u32) -> Self {
        Self {
            lines,
            fail_connects,
            attempts: AtomicU32::new(0),
        }
    }

    /// The server the console user is in.
    pub fn location() -> Location {
        Location::new(CONSOLE_LOCATION, "Console").with_channel(CONSOLE_CHANNEL)
    }
}

#[async_trait]
impl Gateway for ConsoleGateway {
    fn name(&self) -> &str {
        "console"
    }

    async fn authenticate(&self, credentials: &Credentials) -> GatewayResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_connects {
            return Err(GatewayError::connection_failed("console is not reachable yet"));
        }
        if credentials.token() == "invalid" {
            return Err(GatewayError::unauthorized("token rejected"));
        }
        Ok(())
    }

    async fn serve_events(&self) -> GatewayResult<()> {
        info!("Type /help for a list of commands, Ctrl+D to quit");

        let mut input = BufReader::new(tokio::io::stdin()).lines();
        while let Some(text) = input.next_line().await? {
            let (done, handled) = oneshot::channel();
            if self.lines.send(ConsoleLine { text, done }).await.is_err() {
                return Err(GatewayError::closed("command dispatcher stopped"));
            }
            let _ = handled.await;
        }

        debug!("Standard input closed");
        Ok(())
    }

    fn resolve_destination(&self, channel: ChannelId) -> Option<Destination> {
        (channel == CONSOLE_CHANNEL)
            .then(|| Destination::new(channel, "general").in_location(CONSOLE_LOCATION))
    }

    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageSpec,
    ) -> GatewayResult<()> {
        if let Some(body) = &message.body {
            println!("[#{}] {body}", destination.name);
        }
        if let Some(rich) = &message.rich_content {
            for (key, value) in rich {
                println!("[#{}]   {key}: {value}", destination.name);
            }
        }
        if let Some(after) = message.delete_after {
            println!("[#{}]   (deleted after {}s)", destination.name, after.as_secs());
        }
        Ok(())
    }
}
