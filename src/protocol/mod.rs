//! Wire protocol for client connections
//!
//! Defines the inbound subscribe/unsubscribe messages and the outbound
//! `{event, data, channel}` envelope. The bus-side message format lives in
//! [`crate::bus`].

pub mod message;

pub use message::{AuthCredentials, ClientMessage, ServerMessage};
