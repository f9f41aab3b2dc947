//! Broker server
//!
//! Accepts WebSocket connections, runs the subscription protocol per
//! connection and keeps the fanout relay attached to the distributed bus.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<BrokerServer>
//!          ┌──────────────────────────────────────────┐
//!          │ registry:    Arc<ChannelRegistry>        │
//!          │ coordinator: Arc<SubscriptionCoordinator>│
//!          │ relay:       Arc<FanoutRelay>            │
//!          │ bus:         Arc<dyn EventBus>           │
//!          └───────────────────┬──────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  [accept loop]        [relay task]          [per connection]
//!  TcpListener          bus.subscribe_all()   reader ──► coordinator
//!  accept() ──► spawn   dispatch() ──► local  writer ◄── outbound queue
//! ```

pub mod config;
pub mod listener;

pub use config::BrokerConfig;
pub use listener::BrokerServer;
