//! Subscription coordinator implementation

use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::AuthGateway;
use crate::connection::Connection;
use crate::fanout::FanoutRelay;
use crate::protocol::{AuthCredentials, ClientMessage, ServerMessage};
use crate::registry::{ChannelName, ChannelRegistry};

/// Drives the per-(connection, channel) subscription state machine
///
/// `Unsubscribed → Subscribed` for public channels, with an `Authorizing`
/// step in between for private/presence channels. All paths that mutate a
/// connection's member record (subscribe success, unsubscribe, close sweep)
/// funnel through [`subscribe`](Self::subscribe) and
/// [`unsubscribe`](Self::unsubscribe).
pub struct SubscriptionCoordinator {
    registry: Arc<ChannelRegistry>,
    gateway: Arc<AuthGateway>,
    relay: Arc<FanoutRelay>,
}

impl SubscriptionCoordinator {
    /// Create a coordinator over the shared registry, gateway and relay
    pub fn new(
        registry: Arc<ChannelRegistry>,
        gateway: Arc<AuthGateway>,
        relay: Arc<FanoutRelay>,
    ) -> Self {
        Self {
            registry,
            gateway,
            relay,
        }
    }

    /// Handle one inbound text frame from a connection
    ///
    /// Malformed payloads are dropped; the connection is unaffected and no
    /// confirmation is sent.
    pub async fn handle_message(&self, connection: &Arc<Connection>, raw: &str) {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(ClientMessage::Subscribe { channel, auth }) => {
                self.subscribe(connection, channel, auth.unwrap_or_default())
                    .await;
            }
            Ok(ClientMessage::Unsubscribe { channel }) => {
                self.unsubscribe(connection, &channel, true).await;
            }
            Err(e) => {
                tracing::debug!(
                    connection = %connection.id(),
                    error = %e,
                    "Dropping malformed message"
                );
            }
        }
    }

    /// Process a subscribe request
    ///
    /// Private/presence channels are routed through the authorization
    /// gateway first, even when a prior subscribe for the same pair is
    /// pending (last completed transition wins). Registry membership is
    /// never granted on an authorization failure.
    pub async fn subscribe(
        &self,
        connection: &Arc<Connection>,
        channel: ChannelName,
        credentials: AuthCredentials,
    ) {
        if !channel.requires_auth() {
            self.grant(connection, channel).await;
            return;
        }

        match self.gateway.authorize(&channel, &credentials, connection).await {
            Ok(payload) => {
                let member_id = connection.member_id().await;
                let info = json!({ "info": payload, "id": member_id });
                connection.set_channel_info(&channel, info).await;
                self.grant(connection, channel).await;
            }
            Err(err) => {
                tracing::warn!(
                    channel = %channel,
                    connection = %connection.id(),
                    error = %err,
                    "Subscription rejected"
                );
                connection.send_message(&ServerMessage::new(
                    "subscription_error",
                    json!({ "error": err.to_string() }),
                    Some(channel),
                ));
            }
        }
    }

    /// Process an unsubscribe, optionally confirming to the requester
    ///
    /// Confirmation is suppressed for the close sweep, where there is no one
    /// left to confirm to. Every step is idempotent, so running the
    /// transition again for an already-left channel is harmless.
    pub async fn unsubscribe(
        &self,
        connection: &Arc<Connection>,
        channel: &ChannelName,
        confirm: bool,
    ) {
        tracing::debug!(channel = %channel, connection = %connection.id(), "Unsubscribe");

        connection.clear_channel_info(channel).await;
        self.registry.leave(channel, connection.id()).await;

        if confirm {
            connection.send_message(&ServerMessage::confirmation("unsubscribed", channel));
        }

        // Remaining members see the post-removal membership
        if channel.is_presence() {
            self.presence(channel, "member:removed").await;
        }
    }

    /// Run the unsubscribe transition for every channel the connection
    /// belongs to, without confirmations
    ///
    /// Driven by the transport's close notification. Safe to run once per
    /// channel even when an unsubscribe is already in flight.
    pub async fn handle_close(&self, connection: &Arc<Connection>) {
        let channels = self.registry.channels_of(connection.id()).await;

        tracing::debug!(
            connection = %connection.id(),
            channels = channels.len(),
            "Connection closed, sweeping memberships"
        );

        for channel in channels {
            self.unsubscribe(connection, &channel, false).await;
        }
    }

    async fn grant(&self, connection: &Arc<Connection>, channel: ChannelName) {
        tracing::debug!(channel = %channel, connection = %connection.id(), "Subscribe");

        self.registry.join(&channel, connection).await;
        connection.send_message(&ServerMessage::confirmation("subscribed", &channel));

        if channel.is_presence() {
            self.presence(&channel, "member:added").await;
        }
    }

    /// Broadcast the channel's current membership to its members
    async fn presence(&self, channel: &ChannelName, event: &str) {
        let members = self.registry.members(channel).await;
        let message = ServerMessage::new(event, Value::Object(members), Some(channel.clone()));
        self.relay.broadcast_local(channel, &message, None).await;
    }
}
