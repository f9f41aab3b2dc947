//! Channel membership registry
//!
//! The per-process registry mapping channel names to the set of
//! locally-connected members. A channel exists iff its membership set is
//! non-empty: the entry is created on first join and removed when the last
//! member leaves.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::connection::{Connection, ConnectionId};

use super::channel::ChannelName;

/// Registry of locally-connected channel members
///
/// Thread-safe via `RwLock`; all mutating operations are mutually exclusive,
/// so unsubscribe/close removals are atomic with respect to subsequent
/// [`members`](Self::members) reads.
///
/// Constructed once at process start and shared by reference with the
/// subscription coordinator and the fanout relay.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelName, HashMap<ConnectionId, Arc<Connection>>>>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a channel's membership
    ///
    /// Idempotent; creates the channel entry on first join.
    pub async fn join(&self, channel: &ChannelName, connection: &Arc<Connection>) {
        let mut channels = self.channels.write().await;

        channels
            .entry(channel.clone())
            .or_default()
            .insert(connection.id().clone(), Arc::clone(connection));
    }

    /// Remove a connection from a channel's membership
    ///
    /// Idempotent; no-op if the connection is not a member. The channel
    /// entry is dropped when its last member leaves.
    pub async fn leave(&self, channel: &ChannelName, connection_id: &ConnectionId) {
        let mut channels = self.channels.write().await;

        if let Some(members) = channels.get_mut(channel) {
            members.remove(connection_id);
            if members.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Whether a connection is currently a member of a channel
    pub async fn contains(&self, channel: &ChannelName, connection_id: &ConnectionId) -> bool {
        self.channels
            .read()
            .await
            .get(channel)
            .is_some_and(|members| members.contains_key(connection_id))
    }

    /// Current membership of a channel, enriched with presence metadata
    ///
    /// Returns a JSON object keyed by connection id. Each value is the
    /// authorization info the connection presented for this channel (an
    /// empty object if none, e.g. public channels) merged with
    /// `"socket_ids": [<connection id>]`.
    pub async fn members(&self, channel: &ChannelName) -> Map<String, Value> {
        let snapshot = self.member_snapshot(channel).await;
        let mut members = Map::new();

        for connection in snapshot {
            let mut entry = match connection.channel_info(channel).await {
                Some(Value::Object(info)) => info,
                _ => Map::new(),
            };
            entry.insert(
                "socket_ids".to_string(),
                Value::Array(vec![Value::String(connection.id().as_str().to_string())]),
            );
            members.insert(connection.id().as_str().to_string(), Value::Object(entry));
        }

        members
    }

    /// Point-in-time snapshot of a channel's member connections
    ///
    /// Mutations after the snapshot is taken are not observed; iterating the
    /// result never yields duplicates or skips.
    pub async fn member_snapshot(&self, channel: &ChannelName) -> Vec<Arc<Connection>> {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Point-in-time snapshot of current channel names
    pub async fn channel_names(&self) -> Vec<ChannelName> {
        self.channels.read().await.keys().cloned().collect()
    }

    /// Channels the given connection currently belongs to
    ///
    /// Drives the close sweep: the returned list is a snapshot, so running
    /// the unsubscribe transition per channel stays safe when a concurrent
    /// unsubscribe already removed some memberships.
    pub async fn channels_of(&self, connection_id: &ConnectionId) -> Vec<ChannelName> {
        self.channels
            .read()
            .await
            .iter()
            .filter(|(_, members)| members.contains_key(connection_id))
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    /// Number of channels with at least one member
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Number of members in a channel
    pub async fn member_count(&self, channel: &ChannelName) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_join_then_leave() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("news");
        let (conn, _rx) = Connection::new(None);

        registry.join(&channel, &conn).await;
        assert!(registry.contains(&channel, conn.id()).await);
        assert_eq!(registry.member_count(&channel).await, 1);

        registry.leave(&channel, conn.id()).await;
        assert!(!registry.contains(&channel, conn.id()).await);
        assert!(registry.members(&channel).await.is_empty());

        // Sole member left: the channel entry itself is gone
        assert_eq!(registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("news");
        let (conn, _rx) = Connection::new(None);

        registry.join(&channel, &conn).await;
        registry.join(&channel, &conn).await;

        assert_eq!(registry.member_count(&channel).await, 1);
    }

    #[tokio::test]
    async fn test_leave_non_member_is_noop() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("news");
        let (member, _rx1) = Connection::new(None);
        let (stranger, _rx2) = Connection::new(None);

        registry.join(&channel, &member).await;
        registry.leave(&channel, stranger.id()).await;

        assert_eq!(registry.member_count(&channel).await, 1);
        assert!(registry.contains(&channel, member.id()).await);
    }

    #[tokio::test]
    async fn test_members_merges_channel_info() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("presence-lobby");
        let (conn, _rx) = Connection::new(Some("member-1".into()));

        conn.set_channel_info(&channel, json!({"info": {"name": "ada"}, "id": "member-1"}))
            .await;
        registry.join(&channel, &conn).await;

        let members = registry.members(&channel).await;
        let entry = &members[conn.id().as_str()];

        assert_eq!(entry["info"]["name"], "ada");
        assert_eq!(entry["id"], "member-1");
        assert_eq!(entry["socket_ids"], json!([conn.id().as_str()]));
    }

    #[tokio::test]
    async fn test_members_without_info_is_bare() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("news");
        let (conn, _rx) = Connection::new(None);

        registry.join(&channel, &conn).await;

        let members = registry.members(&channel).await;
        let entry = &members[conn.id().as_str()];

        // Public channels carry only the socket id list
        assert_eq!(entry, &json!({"socket_ids": [conn.id().as_str()]}));
    }

    #[tokio::test]
    async fn test_channels_of() {
        let registry = ChannelRegistry::new();
        let (conn, _rx1) = Connection::new(None);
        let (other, _rx2) = Connection::new(None);

        registry.join(&ChannelName::from("news"), &conn).await;
        registry
            .join(&ChannelName::from("presence-lobby"), &conn)
            .await;
        registry.join(&ChannelName::from("sports"), &other).await;

        let mut channels = registry.channels_of(conn.id()).await;
        channels.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        assert_eq!(
            channels,
            vec![
                ChannelName::from("news"),
                ChannelName::from("presence-lobby")
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_under_mutation() {
        let registry = ChannelRegistry::new();
        let channel = ChannelName::from("news");
        let (a, _rx1) = Connection::new(None);
        let (b, _rx2) = Connection::new(None);

        registry.join(&channel, &a).await;
        registry.join(&channel, &b).await;

        let snapshot = registry.member_snapshot(&channel).await;
        registry.leave(&channel, a.id()).await;

        // The earlier snapshot still holds both members, with no duplicates
        assert_eq!(snapshot.len(), 2);
        let ids: std::collections::HashSet<_> = snapshot.iter().map(|c| c.id().clone()).collect();
        assert_eq!(ids.len(), 2);
    }
}
