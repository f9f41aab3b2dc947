//! Redis-backed event bus and authorization cache
//!
//! Production implementation of the distributed bus: `PSUBSCRIBE *` for
//! inbound channel messages, `PUBLISH` for outbound, and GET / SET ... EX
//! for the authorization cache. Connection management, timeouts and
//! reconnection policy are the Redis client's concern; any failure here
//! surfaces as [`crate::error::Error::Bus`].

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::auth::AuthCache;
use crate::error::Result;
use crate::registry::ChannelName;

use super::{BusMessage, BusStream, EventBus};

/// [`super::EventBus`] over a Redis server
pub struct RedisBus {
    client: redis::Client,
}

impl RedisBus {
    /// Create a bus for the given Redis URL (e.g. `redis://localhost:6379`)
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, channel: &ChannelName, message: &BusMessage) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(channel.as_str(), payload).await?;
        Ok(())
    }

    async fn subscribe_all(&self) -> Result<BusStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe("*").await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let channel = ChannelName::from(msg.get_channel_name());
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(channel = %channel, error = %e, "Dropping non-text bus payload");
                    return None;
                }
            };

            match serde_json::from_str::<BusMessage>(&payload) {
                Ok(message) => Some((channel, message)),
                Err(e) => {
                    tracing::debug!(
                        channel = %channel,
                        error = %e,
                        "Dropping undecodable bus message"
                    );
                    None
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

/// [`AuthCache`] over a Redis server
///
/// Entries are plain strings with a TTL set at write time (`SET ... EX`), so
/// expiry is enforced server-side.
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connect to the given Redis URL
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl AuthCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}
