//! Type-safe identifiers.
//!
//! Newtype wrappers keep gateway request IDs, chat addresses and message
//! keys from being mixed up.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`RequestId`] | `Uuid` | Request/response correlation |
//! | [`Jid`] | `String` | Chat or broadcast address |
//! | [`MessageKey`] | struct | Unique message reference |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Address carrying every status update visible to the account.
pub const STATUS_BROADCAST: &str = "status@broadcast";

// ============================================================================
// RequestId
// ============================================================================

/// Identifier correlating a gateway request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Jid
// ============================================================================

/// Address of a chat, contact or broadcast list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jid(String);

impl Jid {
    /// Creates an address from its string form.
    #[inline]
    #[must_use]
    pub fn new(jid: impl Into<String>) -> Self {
        Self(jid.into())
    }

    /// Returns the status broadcast address.
    #[inline]
    #[must_use]
    pub fn status_broadcast() -> Self {
        Self(STATUS_BROADCAST.to_string())
    }

    /// Returns the address as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the status broadcast address.
    #[inline]
    #[must_use]
    pub fn is_status_broadcast(&self) -> bool {
        self.0 == STATUS_BROADCAST
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// MessageKey
// ============================================================================

/// Unique reference to a message, echoed back verbatim when reacting.
///
/// Fields this crate does not model (e.g. `participantAlt`,
/// `addressingMode`) are kept in [`MessageKey::extra`] and serialized back
/// unchanged.
///
/// # Format
///
/// ```json
/// {
///   "remoteJid": "status@broadcast",
///   "fromMe": false,
///   "id": "3EB0C767D26A1D5B",
///   "participant": "15550001111@s.whatsapp.net"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Chat the message was delivered to.
    pub remote_jid: Jid,

    /// Whether the account itself sent the message.
    #[serde(default)]
    pub from_me: bool,

    /// Message ID, unique within the chat.
    pub id: String,

    /// Original author for group and broadcast messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Jid>,

    /// Remaining key fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageKey {
    /// Creates a key for a message received from someone else.
    #[must_use]
    pub fn new(remote_jid: Jid, id: impl Into<String>) -> Self {
        Self {
            remote_jid,
            from_me: false,
            id: id.into(),
            participant: None,
            extra: Map::new(),
        }
    }

    /// Sets the participant (author) of the message.
    #[inline]
    #[must_use]
    pub fn with_participant(mut self, participant: Jid) -> Self {
        self.participant = Some(participant);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
