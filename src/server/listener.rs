//! Broker server listener
//!
//! Handles the TCP accept loop, WebSocket upgrades and per-connection
//! reader/writer tasks, and wires the registry, gateway, coordinator, relay
//! and bus together.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

use crate::auth::{AuthCache, AuthClient, AuthGateway, HttpAuthClient};
use crate::bus::redis::{RedisBus, RedisCache};
use crate::bus::EventBus;
use crate::connection::Connection;
use crate::error::Result;
use crate::fanout::FanoutRelay;
use crate::protocol::ServerMessage;
use crate::registry::ChannelRegistry;
use crate::server::config::BrokerConfig;
use crate::subscription::SubscriptionCoordinator;

/// Publish/subscribe broker server
pub struct BrokerServer {
    config: BrokerConfig,
    registry: Arc<ChannelRegistry>,
    coordinator: Arc<SubscriptionCoordinator>,
    relay: Arc<FanoutRelay>,
    bus: Arc<dyn EventBus>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl BrokerServer {
    /// Create a server wired to Redis (bus + auth cache) and the HTTP auth
    /// endpoint from the configuration
    pub async fn connect(config: BrokerConfig) -> Result<Self> {
        let url = config.redis_url();
        let bus: Arc<dyn EventBus> = Arc::new(RedisBus::connect(&url)?);
        let cache: Arc<dyn AuthCache> = Arc::new(RedisCache::connect(&url).await?);
        let client: Arc<dyn AuthClient> = Arc::new(HttpAuthClient::new(&config.auth_url));

        Ok(Self::with_parts(config, bus, cache, client))
    }

    /// Create a server with caller-supplied bus, cache and auth client
    pub fn with_parts(
        config: BrokerConfig,
        bus: Arc<dyn EventBus>,
        cache: Arc<dyn AuthCache>,
        client: Arc<dyn AuthClient>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let registry = Arc::new(ChannelRegistry::new());
        let relay = Arc::new(FanoutRelay::new(Arc::clone(&registry)));
        let gateway = Arc::new(AuthGateway::new(cache, client, config.cache_expires));
        let coordinator = Arc::new(SubscriptionCoordinator::new(
            Arc::clone(&registry),
            gateway,
            Arc::clone(&relay),
        ));

        Self {
            config,
            registry,
            coordinator,
            relay,
            bus,
            connection_semaphore,
        }
    }

    /// Get a reference to the channel registry
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Broker listening");

        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Broker listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept connections on an already-bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        // Bus consumption runs for the lifetime of the accept loop
        let relay_handle = self.spawn_relay();

        let result = self.accept_loop(&listener).await;
        relay_handle.abort();
        result
    }

    fn spawn_relay(&self) -> tokio::task::JoinHandle<()> {
        let relay = Arc::clone(&self.relay);
        let bus = Arc::clone(&self.bus);

        tokio::spawn(async move {
            if let Err(e) = relay.run(bus).await {
                tracing::error!(error = %e, "Bus subscription failed");
            }
        })
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let coordinator = Arc::clone(&self.coordinator);

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(socket, peer_addr, coordinator).await {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }

            tracing::debug!(peer = %peer_addr, "Connection closed");
        });
    }
}

/// Drive one WebSocket connection from upgrade to close sweep
async fn serve_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    coordinator: Arc<SubscriptionCoordinator>,
) -> Result<()> {
    // The member identity rides on the upgrade request's query string
    let mut member_id = None;
    let ws = tokio_tungstenite::accept_hdr_async(socket, |request: &Request, response: Response| {
        member_id = member_id_from_query(request.uri().query());
        Ok(response)
    })
    .await?;

    let (connection, mut outbound) = Connection::new(member_id);

    tracing::debug!(
        connection = %connection.id(),
        peer = %peer_addr,
        "New connection"
    );

    let (mut sink, mut stream) = ws.split();

    // Writer task: drains the outbound queue until every sender is gone
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
    });

    connection.send_message(&ServerMessage::event_only("connected"));

    // One message at a time: subscribe/unsubscribe requests from a single
    // connection are processed in arrival order
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                coordinator.handle_message(&connection, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // binary/ping/pong frames carry no protocol messages
            Err(e) => {
                tracing::debug!(connection = %connection.id(), error = %e, "Read error");
                break;
            }
        }
    }

    coordinator.handle_close(&connection).await;

    // The close sweep released the registry's references; dropping ours lets
    // the writer task drain and exit
    drop(connection);
    let _ = writer.await;

    Ok(())
}

/// Extract the `member_id` query parameter from an upgrade request
fn member_id_from_query(query: Option<&str>) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "member_id" && !value.is_empty()).then(|| value.to_string())
    })
}
