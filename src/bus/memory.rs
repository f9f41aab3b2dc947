//! In-process event bus
//!
//! Single `tokio::sync::broadcast` channel carrying (channel, message)
//! pairs. Used in tests and single-node deployments where cross-process
//! fanout is not needed. Slow subscribers that fall behind skip messages
//! (lagged receivers), matching the bus's best-effort delivery contract.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::Result;
use crate::registry::ChannelName;

use super::{BusMessage, BusStream, EventBus};

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// [`EventBus`] confined to the current process
pub struct MemoryBus {
    tx: broadcast::Sender<(ChannelName, BusMessage)>,
}

impl MemoryBus {
    /// Create a bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, channel: &ChannelName, message: &BusMessage) -> Result<()> {
        // send() errs only when there are no subscribers, which is fine
        let _ = self.tx.send((channel.clone(), message.clone()));
        Ok(())
    }

    async fn subscribe_all(&self) -> Result<BusStream> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|item| async move { item.ok() });
        Ok(Box::pin(stream))
    }
}
