//! Real-time publish/subscribe broker
//!
//! Clients connect over WebSocket, subscribe to named channels and receive
//! every event published to those channels. Channel names carry their own
//! access rules: `private-` and `presence-` prefixed channels are authorized
//! against an external HTTP endpoint (with positive and negative caching),
//! and presence channels additionally broadcast membership changes to their
//! members. Multiple broker processes share traffic through a distributed
//! bus so a publish in one process reaches subscribers connected anywhere.
//!
//! # Quick start
//!
//! ```no_run
//! use pubsub_rs::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> pubsub_rs::Result<()> {
//!     let config = BrokerConfig::from_env();
//!     let server = BrokerServer::connect(config).await?;
//!     server.run().await
//! }
//! ```
//!
//! # Modules
//!
//! - [`registry`]: channel membership store and channel name taxonomy
//! - [`subscription`]: subscribe/unsubscribe protocol and close sweep
//! - [`auth`]: authorization gateway, HTTP client and result cache
//! - [`fanout`]: delivery of bus traffic to local members
//! - [`bus`]: distributed bus trait with Redis and in-memory backends
//! - [`protocol`]: client and server wire messages
//! - [`connection`]: per-connection identity and outbound queue
//! - [`server`]: WebSocket listener and configuration

pub mod auth;
pub mod bus;
pub mod connection;
pub mod error;
pub mod fanout;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod subscription;

pub use auth::AuthGateway;
pub use connection::{Connection, ConnectionId};
pub use error::{Error, Result};
pub use fanout::FanoutRelay;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ChannelKind, ChannelName, ChannelRegistry};
pub use server::{BrokerConfig, BrokerServer};
pub use subscription::SubscriptionCoordinator;
