//! Event message types.
//!
//! Events are notifications sent from the gateway to the local end
//! whenever the session changes or a message arrives.
//!
//! # Event Types
//!
//! | Method | Parsed as |
//! |--------|-----------|
//! | `connection.update` | [`LifecycleEvent`] |
//! | `messages.upsert` | one [`MessageEvent`] per message |
//! | `creds.update` | full credential snapshot (requires an [`EventReply`]) |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::identifiers::{Jid, MessageKey, RequestId};

// ============================================================================
// Constants
// ============================================================================

/// Lifecycle notification method.
pub const CONNECTION_UPDATE: &str = "connection.update";

/// Message batch notification method.
pub const MESSAGES_UPSERT: &str = "messages.upsert";

/// Credential rotation notification method.
pub const CREDS_UPDATE: &str = "creds.update";

// ============================================================================
// Event
// ============================================================================

/// An event notification from gateway to local end.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique identifier for EventReply correlation.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> GatewayEvent {
        match self.method.as_str() {
            CONNECTION_UPDATE => GatewayEvent::ConnectionUpdate(LifecycleEvent::from_params(
                &self.params,
            )),

            MESSAGES_UPSERT => GatewayEvent::MessagesUpsert(MessageEvent::batch_from_params(
                &self.params,
            )),

            CREDS_UPDATE => {
                let credentials = self
                    .params
                    .get("credentials")
                    .cloned()
                    .unwrap_or_else(|| self.params.clone());
                GatewayEvent::CredsUpdate(credentials)
            }

            _ => GatewayEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }
}

// ============================================================================
// EventReply
// ============================================================================

/// A reply from local end to gateway for events requiring acknowledgement.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "replyTo": "creds.update",
///   "result": { "saved": true }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EventReply {
    /// Matches the event's ID.
    pub id: RequestId,

    /// Event method being replied to.
    #[serde(rename = "replyTo")]
    pub reply_to: String,

    /// Outcome.
    pub result: Value,
}

impl EventReply {
    /// Creates a new event reply.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, reply_to: impl Into<String>, result: Value) -> Self {
        Self {
            id,
            reply_to: reply_to.into(),
            result,
        }
    }

    /// Creates a positive acknowledgement.
    #[inline]
    #[must_use]
    pub fn ack(id: RequestId, reply_to: impl Into<String>) -> Self {
        Self::new(id, reply_to, json!({ "saved": true }))
    }

    /// Creates a negative acknowledgement carrying the failure reason.
    #[inline]
    #[must_use]
    pub fn nack(id: RequestId, reply_to: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(id, reply_to, json!({ "saved": false, "error": error.into() }))
    }
}

// ============================================================================
// GatewayEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session lifecycle change.
    ConnectionUpdate(LifecycleEvent),

    /// New messages.
    MessagesUpsert(Vec<MessageEvent>),

    /// Rotated credentials (full snapshot).
    CredsUpdate(Value),

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// LifecycleEvent
// ============================================================================

/// Phase reported by a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    /// Handshake in progress.
    Connecting,
    /// Session is open.
    Open,
    /// Session closed.
    Close,
}

impl ConnectionPhase {
    /// Parses the wire form of a phase.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "connecting" => Some(Self::Connecting),
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Session lifecycle notification.
///
/// A single update may carry a pairing artifact and a phase change at
/// the same time.
///
/// # Format
///
/// ```json
/// {
///   "connection": "close",
///   "qr": "2@abc...",
///   "pairing": { "code": "12345678" },
///   "lastDisconnect": { "error": { "output": { "statusCode": 401 } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Connection phase, if the update changes it.
    pub phase: Option<ConnectionPhase>,
    /// QR payload to present for pairing.
    pub qr: Option<String>,
    /// Numeric pairing code to present for pairing.
    pub pairing_code: Option<String>,
    /// Status code attached to a close.
    pub close_status_code: Option<u16>,
}

impl LifecycleEvent {
    /// Creates an event carrying only a phase change.
    #[inline]
    #[must_use]
    pub fn phase(phase: ConnectionPhase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::default()
        }
    }

    /// Creates a session-open event.
    #[inline]
    #[must_use]
    pub fn open() -> Self {
        Self::phase(ConnectionPhase::Open)
    }

    /// Creates a close event with an optional status code.
    #[inline]
    #[must_use]
    pub fn close(status_code: Option<u16>) -> Self {
        Self {
            phase: Some(ConnectionPhase::Close),
            close_status_code: status_code,
            ..Self::default()
        }
    }

    /// Creates an event carrying a QR payload.
    #[inline]
    #[must_use]
    pub fn qr(payload: impl Into<String>) -> Self {
        Self {
            qr: Some(payload.into()),
            ..Self::default()
        }
    }

    /// Creates an event carrying a pairing code.
    #[inline]
    #[must_use]
    pub fn pairing_code(code: impl Into<String>) -> Self {
        Self {
            pairing_code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Parses `connection.update` params.
    #[must_use]
    pub fn from_params(params: &Value) -> Self {
        Self {
            phase: params
                .get("connection")
                .and_then(Value::as_str)
                .and_then(ConnectionPhase::from_wire),
            qr: non_empty_str(params.get("qr")),
            pairing_code: non_empty_str(params.pointer("/pairing/code")),
            close_status_code: params
                .pointer("/lastDisconnect/error/output/statusCode")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok()),
        }
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// A single inbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageEvent {
    /// Unique key; `key.remoteJid` is the target address.
    pub key: MessageKey,

    /// Content envelope, keyed by content type.
    #[serde(default)]
    pub message: Option<Value>,
}

impl MessageEvent {
    /// Creates a message event.
    #[inline]
    #[must_use]
    pub fn new(key: MessageKey, message: Option<Value>) -> Self {
        Self { key, message }
    }

    /// Returns the address the message was delivered to.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Jid {
        &self.key.remote_jid
    }

    /// Parses every message of a `messages.upsert` batch.
    ///
    /// Entries without a usable key are skipped.
    #[must_use]
    pub fn batch_from_params(params: &Value) -> Vec<Self> {
        let Some(messages) = params.get("messages").and_then(Value::as_array) else {
            return Vec::new();
        };

        messages
            .iter()
            .filter_map(|raw| match serde_json::from_value::<Self>(raw.clone()) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "Skipping message without a valid key");
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns the string value if present and non-empty.
#[inline]
fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, params: Value) -> Event {
        serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "event",
            "method": method,
            "params": params,
        }))
        .expect("parse event")
    }

    #[test]
    fn test_close_with_status_code() {
        let parsed = event(
            CONNECTION_UPDATE,
            json!({
                "connection": "close",
                "lastDisconnect": { "error": { "output": { "statusCode": 401 } } }
            }),
        )
        .parse();

        match parsed {
            GatewayEvent::ConnectionUpdate(update) => {
                assert_eq!(update, LifecycleEvent::close(Some(401)));
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_qr_and_pairing_code() {
        let update = LifecycleEvent::from_params(&json!({
            "qr": "2@payload",
            "pairing": { "code": "12345678" }
        }));

        assert_eq!(update.qr.as_deref(), Some("2@payload"));
        assert_eq!(update.pairing_code.as_deref(), Some("12345678"));
        assert!(update.phase.is_none());
    }

    #[test]
    fn test_empty_qr_ignored() {
        let update = LifecycleEvent::from_params(&json!({ "qr": "", "connection": "connecting" }));
        assert!(update.qr.is_none());
        assert_eq!(update.phase, Some(ConnectionPhase::Connecting));
    }

    #[test]
    fn test_messages_upsert_batch() {
        let parsed = event(
            MESSAGES_UPSERT,
            json!({
                "type": "notify",
                "messages": [
                    {
                        "key": { "remoteJid": "status@broadcast", "id": "A1", "participant": "1@s.whatsapp.net" },
                        "message": { "imageMessage": { "caption": "hi" } }
                    },
                    { "broken": true },
                    {
                        "key": { "remoteJid": "2@s.whatsapp.net", "id": "B2", "fromMe": true }
                    }
                ]
            }),
        )
        .parse();

        let GatewayEvent::MessagesUpsert(messages) = parsed else {
            panic!("expected MessagesUpsert");
        };
        assert_eq!(messages.len(), 2);
        assert!(messages[0].target().is_status_broadcast());
        assert!(messages[0].message.is_some());
        assert_eq!(messages[1].key.id, "B2");
        assert!(messages[1].key.from_me);
        assert!(messages[1].message.is_none());
    }

    #[test]
    fn test_creds_update_snapshot() {
        let parsed = event(CREDS_UPDATE, json!({ "credentials": { "me": "x" } })).parse();
        match parsed {
            GatewayEvent::CredsUpdate(value) => assert_eq!(value, json!({ "me": "x" })),
            _ => panic!("expected CredsUpdate"),
        }
    }

    #[test]
    fn test_unknown_event() {
        let parsed = event("presence.update", json!({ "foo": "bar" })).parse();
        match parsed {
            GatewayEvent::Unknown { method, .. } => assert_eq!(method, "presence.update"),
            _ => panic!("expected Unknown variant"),
        }
    }

    #[test]
    fn test_event_reply_ack_and_nack() {
        let id = RequestId::generate();
        let ack = serde_json::to_string(&EventReply::ack(id, CREDS_UPDATE)).expect("serialize");
        assert!(ack.contains("replyTo"));
        assert!(ack.contains("\"saved\":true"));

        let nack = serde_json::to_value(EventReply::nack(id, CREDS_UPDATE, "disk full"))
            .expect("serialize");
        assert_eq!(nack["result"]["saved"], false);
        assert_eq!(nack["result"]["error"], "disk full");
    }
}
