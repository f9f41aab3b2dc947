//! Remote authorization endpoint client
//!
//! Restricted channel subscriptions are authorized by an external HTTP
//! endpoint: a POST carrying the connection's credential headers and
//! `{channel_name, socket_id}`. A 200 response with a JSON body grants
//! access; any other status or transport failure denies it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::connection::ConnectionId;
use crate::registry::ChannelName;

use super::error::AuthError;

/// A single authorization request
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Channel being joined
    pub channel: ChannelName,
    /// Connection requesting the join
    pub socket_id: ConnectionId,
    /// Credential headers presented by the client
    pub headers: HashMap<String, String>,
}

/// Client for the external authorization endpoint
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Ask the endpoint to authorize a request
    ///
    /// Returns the endpoint's payload on success; the payload is stored as
    /// presence metadata for the channel.
    async fn authorize(&self, request: &AuthRequest) -> Result<Value, AuthError>;
}

/// [`AuthClient`] over HTTP (reqwest)
pub struct HttpAuthClient {
    http: reqwest::Client,
    url: String,
}

impl HttpAuthClient {
    /// Create a client posting to the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// The endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn authorize(&self, request: &AuthRequest) -> Result<Value, AuthError> {
        let mut builder = self.http.post(&self.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = serde_json::json!({
            "channel_name": request.channel,
            "socket_id": request.socket_id,
        });

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Denied(format!(
                "auth endpoint returned {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AuthError::Denied(format!("unreadable auth response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            channel: ChannelName::from("presence-lobby"),
            socket_id: ConnectionId::from("socket-1"),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_success_returns_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/broadcasting/auth")
            .match_header("authorization", "Bearer t")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user":{"id":7,"name":"ada"}}"#)
            .create_async()
            .await;

        let client = HttpAuthClient::new(format!("{}/broadcasting/auth", server.url()));
        let payload = client
            .authorize(&request(&[("authorization", "Bearer t")]))
            .await
            .unwrap();

        assert_eq!(payload, json!({"user": {"id": 7, "name": "ada"}}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_is_denied() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/broadcasting/auth")
            .with_status(403)
            .create_async()
            .await;

        let client = HttpAuthClient::new(format!("{}/broadcasting/auth", server.url()));
        let err = client.authorize(&request(&[])).await.unwrap_err();

        assert!(matches!(err, AuthError::Denied(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        // Nothing listens on this port
        let client = HttpAuthClient::new("http://127.0.0.1:1/broadcasting/auth");
        let err = client.authorize(&request(&[])).await.unwrap_err();

        assert!(matches!(err, AuthError::Unavailable(_)));
    }
}
