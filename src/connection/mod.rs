//! Connection handles and per-connection member state
//!
//! A [`Connection`] is the broker's view of one client: a stable identifier,
//! an outbound frame queue owned by the transport's writer task, and the
//! mutable member record that accumulates authorization payloads as the
//! connection subscribes to restricted channels.
//!
//! The transport owns the connection's network lifecycle; the registry and
//! coordinator only hold `Arc` references while the connection is a member
//! of at least one channel.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::protocol::ServerMessage;
use crate::registry::ChannelName;

/// Unique identifier for a connection, stable for its lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Per-connection member record
///
/// `channels` maps each authenticated channel to the authorization payload
/// the auth endpoint returned for it, used later as presence metadata.
#[derive(Debug)]
struct Member {
    /// Authorization identity (handshake-provided, or the connection id)
    id: String,
    /// Channel name to stored authorization info
    channels: HashMap<ChannelName, Value>,
}

/// A connected client
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    member: RwLock<Member>,
}

impl Connection {
    /// Create a connection with a generated id
    ///
    /// Returns the connection and the receiving end of its outbound frame
    /// queue, which the transport's writer task drains. When no member id is
    /// given the connection id doubles as the member identity.
    pub fn new(
        member_id: Option<String>,
    ) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::with_id(ConnectionId::generate(), member_id)
    }

    /// Create a connection with a caller-supplied id
    pub fn with_id(
        id: ConnectionId,
        member_id: Option<String>,
    ) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let member = Member {
            id: member_id.unwrap_or_else(|| id.as_str().to_string()),
            channels: HashMap::new(),
        };

        let connection = std::sync::Arc::new(Self {
            id,
            outbound: tx,
            member: RwLock::new(member),
        });

        (connection, rx)
    }

    /// The connection's identifier
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The connection's member identity
    pub async fn member_id(&self) -> String {
        self.member.read().await.id.clone()
    }

    /// Stored authorization info for a channel, if any
    pub async fn channel_info(&self, channel: &ChannelName) -> Option<Value> {
        self.member.read().await.channels.get(channel).cloned()
    }

    /// Channels this connection has stored authorization info for
    pub async fn authenticated_channels(&self) -> Vec<ChannelName> {
        self.member.read().await.channels.keys().cloned().collect()
    }

    /// Store authorization info for a channel
    pub async fn set_channel_info(&self, channel: &ChannelName, info: Value) {
        self.member
            .write()
            .await
            .channels
            .insert(channel.clone(), info);
    }

    /// Remove stored authorization info for a channel (no-op if absent)
    pub async fn clear_channel_info(&self, channel: &ChannelName) {
        self.member.write().await.channels.remove(channel);
    }

    /// Queue a raw frame for delivery
    ///
    /// Returns `false` when the connection's writer task is gone (the
    /// connection closed); the frame is dropped silently per the delivery
    /// contract.
    pub fn send(&self, frame: String) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Encode and queue an envelope for delivery
    ///
    /// Delivery failures are dropped without affecting other members.
    pub fn send_message(&self, message: &ServerMessage) {
        match message.encode() {
            Ok(frame) => {
                if !self.send(frame) {
                    tracing::debug!(
                        connection = %self.id,
                        event = %message.event,
                        "Dropping frame for closed connection"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    connection = %self.id,
                    event = %message.event,
                    error = %e,
                    "Failed to encode outbound envelope"
                );
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_member_id_defaults_to_connection_id() {
        let (conn, _rx) = Connection::new(None);
        assert_eq!(conn.member_id().await, conn.id().as_str());
    }

    #[tokio::test]
    async fn test_member_id_from_handshake() {
        let (conn, _rx) = Connection::new(Some("member-42".into()));
        assert_eq!(conn.member_id().await, "member-42");
    }

    #[tokio::test]
    async fn test_channel_info_lifecycle() {
        let (conn, _rx) = Connection::new(None);
        let channel = ChannelName::from("presence-lobby");

        assert!(conn.channel_info(&channel).await.is_none());

        conn.set_channel_info(&channel, json!({"info": {"name": "ada"}}))
            .await;
        assert_eq!(
            conn.channel_info(&channel).await.unwrap()["info"]["name"],
            "ada"
        );
        assert_eq!(conn.authenticated_channels().await, vec![channel.clone()]);

        conn.clear_channel_info(&channel).await;
        assert!(conn.channel_info(&channel).await.is_none());

        // Clearing again is a no-op
        conn.clear_channel_info(&channel).await;
    }

    #[tokio::test]
    async fn test_send_to_closed_connection() {
        let (conn, rx) = Connection::new(None);
        drop(rx);

        assert!(!conn.send("frame".into()));
        // send_message drops silently
        conn.send_message(&ServerMessage::event_only("connected"));
    }

    #[tokio::test]
    async fn test_send_message_queues_frame() {
        let (conn, mut rx) = Connection::new(None);
        conn.send_message(&ServerMessage::event_only("connected"));

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame, r#"{"event":"connected","data":{}}"#);
    }
}
