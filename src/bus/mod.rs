//! Distributed bus boundary
//!
//! Cross-process fanout rides on a shared pub/sub bus: every process
//! pattern-subscribes to all channel topics and delivers whatever arrives to
//! its local members. The bus also doubles as the authorization cache store
//! in the Redis implementation.
//!
//! [`memory::MemoryBus`] keeps everything in-process (tests, single-node);
//! [`redis::RedisBus`] is the production implementation.

pub mod memory;
pub mod redis;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::ConnectionId;
use crate::error::Result;
use crate::registry::ChannelName;

/// A message published on a channel topic
///
/// Wire format: `{"event": ..., "data": ..., "socket": <origin connection id
/// or absent>}`. The origin, when present, identifies the connection whose
/// publish produced the message so fanout can suppress the echo back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: Value,
    /// Originating connection, if the publish came from one
    #[serde(rename = "socket", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ConnectionId>,
}

impl BusMessage {
    /// Create a message with no origin connection
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            origin: None,
        }
    }

    /// Attach the originating connection
    pub fn with_origin(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Stream of (channel, message) pairs from the bus
pub type BusStream = Pin<Box<dyn Stream<Item = (ChannelName, BusMessage)> + Send>>;

/// The distributed pub/sub bus
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message on a channel topic
    async fn publish(&self, channel: &ChannelName, message: &BusMessage) -> Result<()>;

    /// Subscribe to all channel topics
    ///
    /// Delivery is best effort; per-channel publish order is preserved for
    /// messages originating on a single bus connection.
    async fn subscribe_all(&self) -> Result<BusStream>;
}
