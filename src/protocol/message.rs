//! Wire message types
//!
//! Inbound messages arrive as JSON text frames from connections; outbound
//! messages are always wrapped in the `{event, data, channel}` envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ChannelName;

/// Credential headers a client presents when subscribing to a restricted
/// channel. Forwarded verbatim to the auth endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthCredentials {
    /// Request headers (e.g. cookies, Authorization)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Inbound message from a connection
///
/// Wire format: `{"event": "subscribe"|"unsubscribe", "channel": "...",
/// "auth": {"headers": {...}}}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a channel
    Subscribe {
        /// Channel to join
        channel: ChannelName,
        /// Credentials for restricted channels
        #[serde(default)]
        auth: Option<AuthCredentials>,
    },
    /// Leave a channel
    Unsubscribe {
        /// Channel to leave
        channel: ChannelName,
    },
}

/// Outbound event envelope sent to connections
///
/// Always serialized as `{event, data, channel}`; `channel` is omitted for
/// connection-level events (the initial `connected` greeting).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerMessage {
    /// Event name
    pub event: String,
    /// Event payload; `{}` when the event carries no data
    pub data: Value,
    /// Channel the event belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelName>,
}

impl ServerMessage {
    /// Create an envelope. A `Null` payload normalizes to `{}`.
    pub fn new(event: impl Into<String>, data: Value, channel: Option<ChannelName>) -> Self {
        let data = match data {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        Self {
            event: event.into(),
            data,
            channel,
        }
    }

    /// Create a bare confirmation envelope for a channel
    ///
    /// This is the normalized form of a string payload: the string becomes
    /// the event name and `data` defaults to `{}`.
    pub fn confirmation(event: impl Into<String>, channel: &ChannelName) -> Self {
        Self::new(event, Value::Null, Some(channel.clone()))
    }

    /// Create a connection-level envelope with no channel
    pub fn event_only(event: impl Into<String>) -> Self {
        Self::new(event, Value::Null, None)
    }

    /// Encode the envelope as a JSON text frame
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_subscribe_with_auth() {
        let raw = r#"{"event":"subscribe","channel":"private-orders","auth":{"headers":{"Authorization":"Bearer t"}}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();

        match msg {
            ClientMessage::Subscribe { channel, auth } => {
                assert_eq!(channel.as_str(), "private-orders");
                let auth = auth.unwrap();
                assert_eq!(auth.headers.get("Authorization").unwrap(), "Bearer t");
            }
            _ => panic!("expected subscribe"),
        }
    }

    #[test]
    fn test_parse_subscribe_without_auth() {
        let raw = r#"{"event":"subscribe","channel":"news"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();

        assert!(matches!(
            msg,
            ClientMessage::Subscribe { auth: None, .. }
        ));
    }

    #[test]
    fn test_parse_unsubscribe() {
        let raw = r#"{"event":"unsubscribe","channel":"news"}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();

        assert!(matches!(msg, ClientMessage::Unsubscribe { channel } if channel.as_str() == "news"));
    }

    #[test]
    fn test_parse_unknown_event_fails() {
        let raw = r#"{"event":"publish","channel":"news"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_envelope_defaults_data() {
        let msg = ServerMessage::confirmation("subscribed", &ChannelName::from("news"));
        let encoded = msg.encode().unwrap();

        assert_eq!(
            encoded,
            r#"{"event":"subscribed","data":{},"channel":"news"}"#
        );
    }

    #[test]
    fn test_envelope_with_data() {
        let msg = ServerMessage::new(
            "headline",
            json!({"text": "hi"}),
            Some(ChannelName::from("news")),
        );

        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["event"], "headline");
        assert_eq!(value["data"]["text"], "hi");
        assert_eq!(value["channel"], "news");
    }

    #[test]
    fn test_envelope_omits_missing_channel() {
        let msg = ServerMessage::event_only("connected");
        assert_eq!(msg.encode().unwrap(), r#"{"event":"connected","data":{}}"#);
    }
}
