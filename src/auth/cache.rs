//! Authorization result cache
//!
//! Cache entries are keyed by `(channel, member)` and hold either the
//! serialized authorization payload or a negative sentinel recording that a
//! prior attempt failed. Both expire after the configured TTL, which bounds
//! the staleness of revoked/granted access and the load on the auth
//! endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

/// Sentinel value recording a failed authorization attempt
const DENIED_SENTINEL: &str = "false";

/// Key-value store with expiry used by the authorization gateway
///
/// The production implementation is [`crate::bus::redis::RedisCache`];
/// tests and single-node deployments use [`MemoryCache`].
#[async_trait]
pub trait AuthCache: Send + Sync {
    /// Fetch a raw entry, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw entry with a time-to-live
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Decoded form of a cached authorization result
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// The endpoint granted access with this payload
    Granted(Value),
    /// The endpoint rejected access (negative cache)
    Denied,
}

impl CacheEntry {
    /// Serialize for storage
    pub fn encode(&self) -> String {
        match self {
            CacheEntry::Denied => DENIED_SENTINEL.to_string(),
            CacheEntry::Granted(payload) => payload.to_string(),
        }
    }

    /// Decode a stored entry; `None` for unreadable values (treated as a
    /// cache miss by the gateway)
    pub fn decode(raw: &str) -> Option<Self> {
        if raw == DENIED_SENTINEL {
            return Some(CacheEntry::Denied);
        }

        serde_json::from_str(raw).ok().map(CacheEntry::Granted)
    }
}

/// In-process [`AuthCache`] backed by a `HashMap`
///
/// Expired entries are dropped on read.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}
