//! Identities supplied by the gateway client.
//!
//! These values are read-only from the engine's point of view: the gateway
//! creates them from its own cache and hands them to commands.

use serde::{Deserialize, Serialize};

/// Identifier of an [`Actor`].
pub type ActorId = u64;

/// Identifier of a [`Location`].
pub type LocationId = u64;

/// Identifier of a send target (channel).
pub type ChannelId = u64;

/// An external user or guild-member identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier.
    pub id: ActorId,
    /// Display name.
    pub name: String,
    /// Discriminator / tag suffix (e.g. `"0420"`).
    #[serde(default)]
    pub discriminator: String,
    /// Avatar reference (usually a URL).
    #[serde(default)]
    pub avatar_url: String,
}

impl Actor {
    /// Creates an actor without an avatar.
    pub fn new(id: ActorId, name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            discriminator: discriminator.into(),
            avatar_url: String::new(),
        }
    }

    /// Sets the avatar reference.
    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = avatar_url.into();
        self
    }

    /// Returns the mention string that pings this actor.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Returns `name#discriminator`.
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }
}

/// A server / guild context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Icon reference (usually a URL).
    #[serde(default)]
    pub icon_url: String,
    /// Channels that belong to this location.
    #[serde(default)]
    pub channels: Vec<ChannelId>,
}

impl Location {
    /// Creates a location without channels or icon.
    pub fn new(id: LocationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            icon_url: String::new(),
            channels: Vec::new(),
        }
    }

    /// Sets the icon reference.
    pub fn with_icon(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = icon_url.into();
        self
    }

    /// Adds a channel to this location.
    pub fn with_channel(mut self, channel: ChannelId) -> Self {
        self.channels.push(channel);
        self
    }

    /// Returns `true` if `channel` is reachable from this location.
    pub fn has_channel(&self, channel: ChannelId) -> bool {
        self.channels.contains(&channel)
    }
}

/// A resolved send target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name of the channel.
    #[serde(default)]
    pub name: String,
    /// Owning location, if the channel lives in one.
    #[serde(default)]
    pub location: Option<LocationId>,
}

impl Destination {
    /// Creates a destination that does not belong to any location.
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: None,
        }
    }

    /// Sets the owning location.
    pub fn in_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_mention_and_tag() {
        let actor = Actor::new(42, "aoi", "0001");
        assert_eq!(actor.mention(), "<@42>");
        assert_eq!(actor.tag(), "aoi#0001");
    }

    #[test]
    fn test_location_channels() {
        let location = Location::new(1, "guild").with_channel(10).with_channel(11);
        assert!(location.has_channel(11));
        assert!(!location.has_channel(12));
    }

    #[test]
    fn test_actor_deserialize_defaults() {
        let actor: Actor = serde_json::from_str(r#"{"id": 7, "name": "x"}"#).unwrap();
        assert_eq!(actor.discriminator, "");
        assert_eq!(actor.avatar_url, "");
    }
}
