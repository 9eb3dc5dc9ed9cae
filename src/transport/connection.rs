//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to the gateway,
//! including request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages from the gateway (responses, events)
//! - Outgoing commands from the session manager and reactor
//! - Request/response correlation by UUID
//! - Routing events onto the session's [`EventSinks`]
//! - Replying to `creds.update` once the credentials were persisted

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::event::CREDS_UPDATE;
use crate::protocol::{Command, Event, EventReply, GatewayEvent, Request, Response};
use crate::store::SessionCredentials;

use super::EventSinks;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream to the gateway.
pub type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Write half of the gateway stream.
type GatewaySink = SplitSink<GatewayStream, Message>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the gateway.
///
/// Handles request/response correlation and event routing.
/// The connection spawns an internal event loop task; the loop ends (and
/// the session's streams with it) when the socket closes, on
/// [`Connection::shutdown`], or once every clone has been dropped.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
        }
    }
}

impl Connection {
    /// Creates a new connection from a WebSocket stream.
    ///
    /// Events are routed onto `sinks`; with `None` they are dropped.
    /// Spawns the event loop task internally.
    pub(crate) fn new(ws_stream: GatewayStream, sinks: Option<EventSinks>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            sinks,
        ));

        Self {
            command_tx,
            correlation,
        }
    }

    /// Sends a command and waits for the response with default timeout (30s).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send(&self, command: Command) -> Result<Response> {
        self.send_with_timeout(command, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends a command and waits for the response with custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send_with_timeout(
        &self,
        command: Command,
        request_timeout: Duration,
    ) -> Result<Response> {
        let request = Request::new(command);
        let request_id = request.id;

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Shuts down the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: GatewayStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        sinks: Option<EventSinks>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<EventReply>();

        loop {
            tokio::select! {
                // Incoming messages from gateway
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(
                                &text,
                                &correlation,
                                sinks.as_ref(),
                                &reply_tx,
                            );
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by gateway");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Acknowledgements for persisted credentials
                Some(reply) = reply_rx.recv() => {
                    match to_string(&reply) {
                        Ok(json) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to send event reply");
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize event reply"),
                    }
                }

                // Commands from the session
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_requests(&correlation);

        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the gateway.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        sinks: Option<&EventSinks>,
        reply_tx: &mpsc::UnboundedSender<EventReply>,
    ) {
        // Try to parse as Response first
        if let Ok(response) = from_str::<Response>(text) {
            let tx = correlation.lock().remove(&response.id);

            if let Some(tx) = tx {
                let _ = tx.send(Ok(response));
            } else {
                warn!(id = %response.id, "Response for unknown request");
            }

            return;
        }

        let event = match from_str::<Event>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to parse incoming message");
                return;
            }
        };

        let Some(sinks) = sinks else {
            trace!(method = %event.method, "Dropping event on control connection");
            return;
        };

        match event.parse() {
            GatewayEvent::ConnectionUpdate(update) => {
                trace!(?update, "connection.update");
                sinks.lifecycle(update);
            }

            GatewayEvent::MessagesUpsert(messages) => {
                trace!(count = messages.len(), "messages.upsert");
                for message in messages {
                    sinks.message(message);
                }
            }

            GatewayEvent::CredsUpdate(credentials) => {
                let ack = sinks.credentials(SessionCredentials::from_value(credentials));
                let reply_tx = reply_tx.clone();
                let id = event.id;

                // Reply only after the consumer persisted the snapshot.
                tokio::spawn(async move {
                    let reply = match ack.await {
                        Ok(Ok(())) => EventReply::ack(id, CREDS_UPDATE),
                        Ok(Err(e)) => EventReply::nack(id, CREDS_UPDATE, e.to_string()),
                        Err(_) => EventReply::nack(id, CREDS_UPDATE, "credential consumer gone"),
                    };
                    let _ = reply_tx.send(reply);
                });
            }

            GatewayEvent::Unknown { method, .. } => {
                trace!(%method, "Ignoring unknown event");
            }
        }
    }

    /// Handles a send command.
    async fn handle_send_command(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut GatewaySink,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        let request_id = request.id;

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(request_id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(tx) = correlation.lock().remove(&request_id)
        {
            let _ = tx.send(Err(Error::WebSocket(e)));
        }

        trace!(%request_id, "Request sent");
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
