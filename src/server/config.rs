//! Broker configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::DEFAULT_CACHE_EXPIRES;

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// URL of the external authorization endpoint
    pub auth_url: String,

    /// TTL for cached authorization results
    pub cache_expires: Duration,

    /// Redis host (bus and auth cache)
    pub redis_host: String,

    /// Redis port
    pub redis_port: u16,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".parse().expect("valid default bind addr"),
            auth_url: "http://localhost/broadcasting/auth".to_string(),
            cache_expires: Duration::from_secs(DEFAULT_CACHE_EXPIRES),
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            max_connections: 0, // Unlimited
        }
    }
}

impl BrokerConfig {
    /// Create a config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from the environment
    ///
    /// Loads `.env` when present, then reads `BROKER_BIND`,
    /// `BROADCASTING_AUTH_URL`, `BROKER_CACHE_EXPIRES` (seconds),
    /// `BROKER_REDIS_HOST`, `BROKER_REDIS_PORT` and
    /// `BROKER_MAX_CONNECTIONS`. Unset or unparseable variables fall back to
    /// the defaults with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(bind) = env_var("BROKER_BIND") {
            match bind.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => tracing::warn!(value = %bind, "Ignoring invalid BROKER_BIND"),
            }
        }

        if let Some(url) = env_var("BROADCASTING_AUTH_URL") {
            config.auth_url = url;
        }

        if let Some(expires) = env_var("BROKER_CACHE_EXPIRES") {
            match expires.parse() {
                Ok(secs) => config.cache_expires = Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(value = %expires, "Ignoring invalid BROKER_CACHE_EXPIRES")
                }
            }
        }

        if let Some(host) = env_var("BROKER_REDIS_HOST") {
            config.redis_host = host;
        }

        if let Some(port) = env_var("BROKER_REDIS_PORT") {
            match port.parse() {
                Ok(port) => config.redis_port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid BROKER_REDIS_PORT"),
            }
        }

        if let Some(max) = env_var("BROKER_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(max) => config.max_connections = max,
                Err(_) => {
                    tracing::warn!(value = %max, "Ignoring invalid BROKER_MAX_CONNECTIONS")
                }
            }
        }

        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the authorization endpoint URL
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the authorization cache TTL
    pub fn cache_expires(mut self, ttl: Duration) -> Self {
        self.cache_expires = ttl;
        self
    }

    /// Set the Redis host and port
    pub fn redis(mut self, host: impl Into<String>, port: u16) -> Self {
        self.redis_host = host.into();
        self.redis_port = port;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Redis connection URL for the bus and cache
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.auth_url, "http://localhost/broadcasting/auth");
        assert_eq!(config.cache_expires, Duration::from_secs(86_400));
        assert_eq!(config.redis_host, "localhost");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let config = BrokerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_redis_url() {
        let config = BrokerConfig::default().redis("cache.internal", 6380);
        assert_eq!(config.redis_url(), "redis://cache.internal:6380");
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:3001".parse().unwrap();
        let config = BrokerConfig::default()
            .bind(addr)
            .auth_url("https://app.internal/broadcasting/auth")
            .cache_expires(Duration::from_secs(600))
            .redis("cache.internal", 6380)
            .max_connections(500);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.auth_url, "https://app.internal/broadcasting/auth");
        assert_eq!(config.cache_expires, Duration::from_secs(600));
        assert_eq!(config.redis_host, "cache.internal");
        assert_eq!(config.max_connections, 500);
    }
}
