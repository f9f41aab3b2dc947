//! Channel registry for pub/sub membership
//!
//! The registry tracks which locally-connected clients belong to which
//! channels. It is the single source of truth for local fanout: presence
//! broadcasts and bus-originated publishes both resolve their recipients
//! here.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ChannelRegistry>
//!                   ┌────────────────────────────┐
//!                   │ channels: HashMap<Name,    │
//!                   │   HashMap<ConnectionId,    │
//!                   │     Arc<Connection>>       │
//!                   │ >                          │
//!                   └─────────────┬──────────────┘
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!   [Coordinator]           [Fanout Relay]        [Fanout Relay]
//!   join()/leave()          member_snapshot()     members()
//!          │                      │                      │
//!          └── subscribe/close ───┴── send_message() ──► WebSocket
//! ```
//!
//! Channel entries are created lazily on first join and removed when the
//! last member leaves: membership, not a standing object, is authoritative.

pub mod channel;
pub mod store;

pub use channel::{ChannelKind, ChannelName};
pub use store::ChannelRegistry;
