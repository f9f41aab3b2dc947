//! Fanout relay implementation

use std::sync::Arc;

use futures::StreamExt;

use crate::bus::{BusMessage, EventBus};
use crate::connection::ConnectionId;
use crate::error::Result;
use crate::protocol::ServerMessage;
use crate::registry::{ChannelName, ChannelRegistry};

/// Relay delivering channel events to local members
///
/// Locally-originated publishes (presence broadcasts) go straight to the
/// registry's members; bus-originated publishes are consumed by
/// [`run`](Self::run) and delivered the same way, minus the origin
/// connection.
pub struct FanoutRelay {
    registry: Arc<ChannelRegistry>,
}

impl FanoutRelay {
    /// Create a relay over the given registry
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an envelope to every current local member of a channel
    ///
    /// The member matching `exclude` is skipped. Delivery to closed
    /// connections is dropped silently and does not affect other members.
    pub async fn broadcast_local(
        &self,
        channel: &ChannelName,
        message: &ServerMessage,
        exclude: Option<&ConnectionId>,
    ) {
        for connection in self.registry.member_snapshot(channel).await {
            if exclude.is_some_and(|origin| origin == connection.id()) {
                continue;
            }
            connection.send_message(message);
        }
    }

    /// Deliver a bus message to the channel's local members
    ///
    /// The origin connection, when present, is excluded so a sender never
    /// receives its own publish back (whether it arrived via this process or
    /// another one).
    pub async fn dispatch(&self, channel: &ChannelName, message: BusMessage) {
        tracing::debug!(channel = %channel, event = %message.event, "Fanout");

        let envelope = ServerMessage::new(message.event, message.data, Some(channel.clone()));
        self.broadcast_local(channel, &envelope, message.origin.as_ref())
            .await;
    }

    /// Consume the bus and dispatch every channel message
    ///
    /// Runs until the bus stream ends. If the bus connection fails, fanout
    /// degrades to local-only delivery (presence broadcasts keep working).
    pub async fn run(&self, bus: Arc<dyn EventBus>) -> Result<()> {
        let mut stream = bus.subscribe_all().await?;

        while let Some((channel, message)) = stream.next().await {
            self.dispatch(&channel, message).await;
        }

        tracing::warn!("Bus stream ended; fanout degraded to local-only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::bus::memory::MemoryBus;
    use crate::connection::Connection;

    async fn registry_with_members(
        channel: &ChannelName,
        count: usize,
    ) -> (
        Arc<ChannelRegistry>,
        Vec<(Arc<Connection>, mpsc::UnboundedReceiver<String>)>,
    ) {
        let registry = Arc::new(ChannelRegistry::new());
        let mut members = Vec::new();
        for _ in 0..count {
            let (conn, rx) = Connection::new(None);
            registry.join(channel, &conn).await;
            members.push((conn, rx));
        }
        (registry, members)
    }

    #[tokio::test]
    async fn test_dispatch_excludes_origin() {
        let channel = ChannelName::from("news");
        let (registry, mut members) = registry_with_members(&channel, 2).await;
        let relay = FanoutRelay::new(registry);

        let origin_id = members[1].0.id().clone();
        let message = BusMessage::new("headline", json!({"text": "hi"})).with_origin(origin_id);
        relay.dispatch(&channel, message).await;

        let frame = members[0].1.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "headline");
        assert_eq!(value["data"]["text"], "hi");
        assert_eq!(value["channel"], "news");

        // The origin receives nothing
        assert!(members[1].1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_skips_other_channels() {
        let news = ChannelName::from("news");
        let sports = ChannelName::from("sports");
        let registry = Arc::new(ChannelRegistry::new());

        let (news_conn, mut news_rx) = Connection::new(None);
        let (sports_conn, mut sports_rx) = Connection::new(None);
        registry.join(&news, &news_conn).await;
        registry.join(&sports, &sports_conn).await;

        let relay = FanoutRelay::new(registry);
        relay
            .dispatch(&news, BusMessage::new("headline", json!({})))
            .await;

        assert!(news_rx.try_recv().is_ok());
        assert!(sports_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_survives_closed_member() {
        let channel = ChannelName::from("news");
        let (registry, mut members) = registry_with_members(&channel, 2).await;
        let relay = FanoutRelay::new(registry);

        // One member's writer is gone
        let (_closed_conn, closed_rx) = members.remove(0);
        drop(closed_rx);

        relay
            .dispatch(&channel, BusMessage::new("headline", json!({})))
            .await;

        // The other member still gets the event
        assert!(members[0].1.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_run_consumes_bus() {
        let channel = ChannelName::from("news");
        let (registry, mut members) = registry_with_members(&channel, 1).await;
        let relay = Arc::new(FanoutRelay::new(registry));

        let bus = Arc::new(MemoryBus::new());
        let relay_task = {
            let relay = Arc::clone(&relay);
            let bus: Arc<dyn EventBus> = Arc::clone(&bus) as _;
            tokio::spawn(async move { relay.run(bus).await })
        };

        // Give the relay time to subscribe before publishing
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.publish(&channel, &BusMessage::new("headline", json!({"text": "hi"})))
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(1), members[0].1.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("headline"));

        relay_task.abort();
    }
}
