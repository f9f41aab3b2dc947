//! Channel names and security classification
//!
//! Channels are identified by name and classified by prefix: `private-`
//! channels require authorization, `presence-` channels additionally
//! broadcast membership changes to their members. Everything else is public.

use serde::{Deserialize, Serialize};

/// Security class of a channel, derived from its name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Open to any connection, no authorization
    Public,
    /// Requires authorization (`private-` prefix)
    Private,
    /// Requires authorization and broadcasts membership changes
    /// (`presence-` prefix)
    Presence,
}

/// Name of a channel (e.g. "news", "private-orders", "presence-lobby")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a channel name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw channel name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the channel by its name prefix
    pub fn kind(&self) -> ChannelKind {
        if self.0.starts_with("presence-") {
            ChannelKind::Presence
        } else if self.0.starts_with("private-") {
            ChannelKind::Private
        } else {
            ChannelKind::Public
        }
    }

    /// Whether joining this channel requires authorization
    pub fn requires_auth(&self) -> bool {
        matches!(self.kind(), ChannelKind::Private | ChannelKind::Presence)
    }

    /// Whether membership changes are broadcast to members
    pub fn is_presence(&self) -> bool {
        self.kind() == ChannelKind::Presence
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
