//! Gateway-backed transport.
//!
//! The gateway is a sidecar speaking the messaging network's protocol. Each
//! session is one WebSocket connection: `session.open` starts it, events
//! stream back on the same socket, and closing the socket abandons it.
//!
//! # Connection Flow
//!
//! 1. Connect to `GATEWAY_URL`
//! 2. Send `session.open` with credentials, version and identity
//! 3. Gateway streams `connection.update`, `messages.upsert`, `creds.update`
//! 4. Reactions go out as `message.send`

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::Jid;
use crate::protocol::{ClientIdentity, Command, MessageContent, ProtocolVersion, Reaction};
use crate::store::SessionCredentials;

use super::{Connection, EventSinks, SessionHandle, SessionLink, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// GatewayTransport
// ============================================================================

/// [`Transport`] implementation talking to a gateway over WebSocket.
#[derive(Debug, Clone)]
pub struct GatewayTransport {
    /// Gateway WebSocket URL.
    url: Url,
}

impl GatewayTransport {
    /// Creates a transport for the gateway at `url`.
    #[inline]
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Connects to the gateway.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the gateway does not answer in time
    /// - [`Error::WebSocket`] if the WebSocket handshake fails
    async fn connect(&self, sinks: Option<EventSinks>) -> Result<Connection> {
        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))??;

        debug!(url = %self.url, "Gateway connection established");

        Ok(Connection::new(ws_stream, sinks))
    }
}

#[async_trait]
impl Transport for GatewayTransport {
    async fn latest_version(&self) -> Result<ProtocolVersion> {
        let connection = self.connect(None).await?;
        let result = connection
            .send(Command::LatestVersion)
            .await
            .and_then(|response| response.into_result());
        connection.shutdown();

        ProtocolVersion::from_result(&result?)
    }

    async fn open_session(
        &self,
        credentials: Option<SessionCredentials>,
        version: ProtocolVersion,
        identity: &ClientIdentity,
    ) -> Result<SessionHandle> {
        let (sinks, streams) = EventSinks::channel();
        let connection = self.connect(Some(sinks)).await?;

        let command = Command::OpenSession {
            credentials: credentials.map(SessionCredentials::into_value),
            version,
            browser: identity.clone(),
        };

        if let Err(e) = connection
            .send(command)
            .await
            .and_then(|response| response.into_result())
        {
            connection.shutdown();
            return Err(e);
        }

        info!(%version, "Session requested from gateway");

        Ok(streams.into_handle(Arc::new(connection)))
    }
}

// ============================================================================
// SessionLink for Connection
// ============================================================================

#[async_trait]
impl SessionLink for Connection {
    async fn send_reaction(&self, target: &Jid, reaction: Reaction) -> Result<()> {
        let command = Command::SendMessage {
            jid: target.clone(),
            content: MessageContent::React(reaction),
        };

        self.send(command)
            .await
            .and_then(|response| response.into_result())
            .map(|_| ())
            .map_err(|e| match e {
                Error::Protocol { message } => Error::reaction(message),
                other => other,
            })
    }

    fn close(&self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    /// Spawns a one-connection gateway that answers every request with
    /// `result`, then pushes `events`.
    async fn spawn_gateway(result: Value, events: Vec<Value>) -> (Url, tokio::task::JoinHandle<Vec<Value>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            let mut received = Vec::new();

            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("json");
                let reply = json!({ "id": request["id"], "type": "success", "result": result });
                received.push(request);
                ws.send(Message::Text(reply.to_string().into()))
                    .await
                    .expect("reply");

                for event in &events {
                    ws.send(Message::Text(event.to_string().into()))
                        .await
                        .expect("event");
                }
                if !events.is_empty() {
                    break;
                }
            }

            received
        });

        (url, task)
    }

    #[tokio::test]
    async fn test_latest_version_round_trip() {
        let (url, gateway) = spawn_gateway(json!({ "version": [2, 3000, 99] }), Vec::new()).await;
        let transport = GatewayTransport::new(url);

        let version = transport.latest_version().await.expect("version");
        assert_eq!(version, ProtocolVersion::new(2, 3000, 99));

        let received = gateway.await.expect("gateway");
        assert_eq!(received[0]["method"], "session.latestVersion");
    }

    #[tokio::test]
    async fn test_open_session_streams_events() {
        let events = vec![json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "event",
            "method": "connection.update",
            "params": { "qr": "2@abc" }
        })];
        let (url, gateway) = spawn_gateway(json!({}), events).await;
        let transport = GatewayTransport::new(url);

        let mut handle = transport
            .open_session(None, ProtocolVersion::DEFAULT, &ClientIdentity::default())
            .await
            .expect("open");

        let update = handle.lifecycle.recv().await.expect("lifecycle");
        assert_eq!(update.qr.as_deref(), Some("2@abc"));

        let received = gateway.await.expect("gateway");
        assert_eq!(received[0]["method"], "session.open");
        assert!(received[0]["params"]["credentials"].is_null());
        assert_eq!(received[0]["params"]["browser"][0], "Status-Bot");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let transport =
            GatewayTransport::new(Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url"));
        let err = transport.latest_version().await.unwrap_err();
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }
}
