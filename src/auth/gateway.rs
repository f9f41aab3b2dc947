//! Authorization gateway
//!
//! Validates a connection's right to join a restricted channel with a
//! cache-first, remote-fallback strategy: a cached result (positive or
//! negative) short-circuits the remote call; a miss consults the external
//! endpoint and caches whatever it decides.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::connection::Connection;
use crate::protocol::AuthCredentials;
use crate::registry::ChannelName;

use super::cache::{AuthCache, CacheEntry};
use super::client::{AuthClient, AuthRequest};
use super::error::AuthError;

/// Default cache TTL in seconds
pub const DEFAULT_CACHE_EXPIRES: u64 = 86_400;

/// Gateway deciding restricted-channel subscriptions
///
/// The cache is best effort, not a single-flight lock: concurrent calls for
/// the same key may both miss and both hit the endpoint, which is fine
/// because the endpoint is idempotent. Cache failures degrade to a remote
/// call (reads) or are logged and ignored (writes).
pub struct AuthGateway {
    cache: Arc<dyn AuthCache>,
    client: Arc<dyn AuthClient>,
    cache_expires: Duration,
}

impl AuthGateway {
    /// Create a gateway with the given cache, endpoint client and entry TTL
    pub fn new(
        cache: Arc<dyn AuthCache>,
        client: Arc<dyn AuthClient>,
        cache_expires: Duration,
    ) -> Self {
        Self {
            cache,
            client,
            cache_expires,
        }
    }

    /// Cache key for a (channel, member) pair
    pub fn cache_key(channel: &ChannelName, member_id: &str) -> String {
        format!("auth:{}:{}", channel, member_id)
    }

    /// Authorize a connection to join a restricted channel
    ///
    /// On success returns the authorization payload, later used as the
    /// connection's presence metadata for the channel.
    pub async fn authorize(
        &self,
        channel: &ChannelName,
        credentials: &AuthCredentials,
        connection: &Connection,
    ) -> Result<Value, AuthError> {
        let member_id = connection.member_id().await;
        let key = Self::cache_key(channel, &member_id);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match CacheEntry::decode(&raw) {
                Some(CacheEntry::Denied) => {
                    tracing::debug!(channel = %channel, member = %member_id, "Cached denial");
                    return Err(AuthError::Denied(
                        "authorization request previously failed".to_string(),
                    ));
                }
                Some(CacheEntry::Granted(payload)) => {
                    tracing::debug!(channel = %channel, member = %member_id, "Cached grant");
                    return Ok(payload);
                }
                // Unreadable entry: fall through to the endpoint
                None => {}
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Auth cache read failed");
            }
        }

        let request = AuthRequest {
            channel: channel.clone(),
            socket_id: connection.id().clone(),
            headers: credentials.headers.clone(),
        };

        match self.client.authorize(&request).await {
            Ok(payload) => {
                self.store(&key, &CacheEntry::Granted(payload.clone())).await;
                Ok(payload)
            }
            Err(err) => {
                // Failures are negatively cached regardless of cause, so
                // known-bad credentials don't hammer the endpoint
                self.store(&key, &CacheEntry::Denied).await;
                Err(err)
            }
        }
    }

    async fn store(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = self.cache.set(key, &entry.encode(), self.cache_expires).await {
            tracing::warn!(key = %key, error = %e, "Auth cache write failed");
        }
    }
}
