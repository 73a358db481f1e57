//! Sending compiled messages through the gateway.

use std::time::Duration;

use aoi_core::{Actor, BoxedGateway, ChannelId, Destination, Location, MessageSpec};
use tracing::{debug, warn};

use crate::error::{FrameworkError, FrameworkResult};
use crate::message::MessageCompiler;

/// The member a template is rendered for.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    /// The user.
    pub actor: &'a Actor,
    /// The server the user belongs to.
    pub location: &'a Location,
}

impl<'a> Member<'a> {
    /// Pairs an actor with its location.
    pub fn new(actor: &'a Actor, location: &'a Location) -> Self {
        Self { actor, location }
    }
}

/// Compiles raw message text and sends it to a channel.
#[derive(Clone)]
pub struct Messenger {
    gateway: BoxedGateway,
    compiler: MessageCompiler,
}

impl Messenger {
    /// Creates a messenger sending through `gateway`.
    pub fn new(gateway: BoxedGateway, compiler: MessageCompiler) -> Self {
        Self { gateway, compiler }
    }

    /// Returns the compiler used for outgoing messages.
    pub fn compiler(&self) -> &MessageCompiler {
        &self.compiler
    }

    /// Sends `raw` (plain text or a JSON document) to `channel`.
    ///
    /// With a `member`, placeholders are substituted for that member and the
    /// channel must belong to the member's server.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::DestinationUnavailable`] when the channel cannot be
    /// reached; nothing is sent in that case.
    pub async fn send_json_to_channel(
        &self,
        channel: ChannelId,
        raw: &str,
        member: Option<Member<'_>>,
        delete_after: Option<Duration>,
    ) -> FrameworkResult<()> {
        let spec = match member {
            Some(m) => self.compiler.compile_for(raw, m.actor, m.location, channel)?,
            None => self.compiler.compile(raw),
        };

        let destination = self
            .gateway
            .resolve_destination(channel)
            .ok_or(FrameworkError::DestinationUnavailable { channel })?;

        self.send(&destination, spec.with_delete_after(delete_after))
            .await
    }

    /// Sends an already compiled message.
    pub async fn send(
        &self,
        destination: &Destination,
        spec: MessageSpec,
    ) -> FrameworkResult<()> {
        if spec.is_empty() {
            warn!(
                channel = destination.id,
                "Sending a message with neither body nor rich content"
            );
        }

        debug!(
            channel = destination.id,
            has_body = spec.body.is_some(),
            has_rich_content = spec.rich_content.is_some(),
            "Sending message"
        );

        self.gateway.send_message(destination, &spec).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("gateway", &self.gateway.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoi_core::{Credentials, Gateway, GatewayResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<(u64, MessageSpec)>>,
    }

    #[async_trait]
    impl Gateway for RecordingGateway {
        async fn authenticate(&self, _credentials: &Credentials) -> GatewayResult<()> {
            Ok(())
        }

        async fn serve_events(&self) -> GatewayResult<()> {
            Ok(())
        }

        fn resolve_destination(&self, id: u64) -> Option<Destination> {
            (id < 100).then(|| Destination::new(id, "general").in_location(1))
        }

        async fn send_message(
            &self,
            destination: &Destination,
            message: &MessageSpec,
        ) -> GatewayResult<()> {
            self.sent.lock().push((destination.id, message.clone()));
            Ok(())
        }
    }

    fn messenger() -> (Arc<RecordingGateway>, Messenger) {
        let gateway = Arc::new(RecordingGateway::default());
        let messenger = Messenger::new(gateway.clone(), MessageCompiler::default());
        (gateway, messenger)
    }

    #[tokio::test]
    async fn test_send_plain_text_with_delete_after() {
        let (gateway, messenger) = messenger();

        assert_ok!(
            messenger
                .send_json_to_channel(10, "hello", None, Some(Duration::from_secs(5)))
                .await
        );

        let sent = gateway.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 10);
        assert_eq!(sent[0].1.body.as_deref(), Some("hello"));
        assert_eq!(sent[0].1.delete_after, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_member_template_is_substituted() {
        let (gateway, messenger) = messenger();
        let actor = Actor::new(3, "Aoi", "0003");
        let location = Location::new(1, "Guild").with_channel(10);

        assert_ok!(
            messenger
                .send_json_to_channel(
                    10,
                    "Welcome &user_name; to &guild_name;",
                    Some(Member::new(&actor, &location)),
                    None,
                )
                .await
        );

        let sent = gateway.sent.lock();
        assert_eq!(sent[0].1.body.as_deref(), Some("Welcome Aoi to Guild"));
    }

    #[tokio::test]
    async fn test_channel_outside_member_location_is_not_sent() {
        let (gateway, messenger) = messenger();
        let actor = Actor::new(3, "Aoi", "0003");
        let location = Location::new(1, "Guild").with_channel(10);

        let result = messenger
            .send_json_to_channel(20, "hi", Some(Member::new(&actor, &location)), None)
            .await;

        assert!(matches!(
            result,
            Err(FrameworkError::DestinationUnavailable { channel: 20 })
        ));
        assert!(gateway.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_channel_is_not_sent() {
        let (gateway, messenger) = messenger();

        assert_err!(messenger.send_json_to_channel(500, "hi", None, None).await);
        assert!(gateway.sent.lock().is_empty());
    }
}
