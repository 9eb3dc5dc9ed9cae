//! Gateway command definitions.
//!
//! Commands follow `module.methodName` format.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | `session.latestVersion` | Ask for the newest protocol version |
//! | `session.open` | Start a session with credentials + version |
//! | `message.send` | Send message content (reactions) to a chat |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{Jid, MessageKey};

// ============================================================================
// Command
// ============================================================================

/// All commands the local end sends to the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum Command {
    /// Query the newest protocol version supported by the network.
    #[serde(rename = "session.latestVersion")]
    LatestVersion,

    /// Open a session.
    #[serde(rename = "session.open")]
    OpenSession {
        /// Stored credentials, `null` to start a fresh pairing flow.
        credentials: Option<Value>,
        /// Protocol version to speak.
        version: ProtocolVersion,
        /// Browser identity announced to the network.
        browser: ClientIdentity,
    },

    /// Send message content to a chat.
    #[serde(rename = "message.send")]
    SendMessage {
        /// Destination chat.
        jid: Jid,
        /// Content to send.
        content: MessageContent,
    },
}

// ============================================================================
// MessageContent
// ============================================================================

/// Outgoing message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageContent {
    /// Reaction to an existing message.
    React(Reaction),
}

/// A reaction symbol attached to an existing message.
///
/// # Format
///
/// ```json
/// { "text": "🔥", "key": { "remoteJid": "status@broadcast", "id": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reaction {
    /// Reaction symbol.
    pub text: String,
    /// Key of the message being reacted to.
    pub key: MessageKey,
}

impl Reaction {
    /// Creates a reaction.
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>, key: MessageKey) -> Self {
        Self {
            text: text.into(),
            key,
        }
    }
}

// ============================================================================
// ProtocolVersion
// ============================================================================

/// Three-part protocol version, e.g. `2.3000.1023223821`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion([u32; 3]);

impl ProtocolVersion {
    /// Version used when the latest one cannot be discovered.
    pub const DEFAULT: Self = Self([2, 3000, 1_023_223_821]);

    /// Creates a version from its parts.
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self([major, minor, patch])
    }

    /// Extracts the version from a `session.latestVersion` result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the result carries no three-part version.
    pub fn from_result(result: &Value) -> Result<Self> {
        let version = result
            .get("version")
            .ok_or_else(|| Error::protocol("latestVersion result has no version"))?;

        serde_json::from_value(version.clone())
            .map_err(|e| Error::protocol(format!("Invalid protocol version: {e}")))
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch] = self.0;
        write!(f, "{major}.{minor}.{patch}")
    }
}

// ============================================================================
// ClientIdentity
// ============================================================================

/// Browser identity shown in the account's linked-devices list.
///
/// Serialized as `[name, browser, version]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "[String; 3]")]
pub struct ClientIdentity {
    /// Client name.
    pub name: String,
    /// Browser family.
    pub browser: String,
    /// Client version.
    pub version: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: "Status-Bot".to_string(),
            browser: "Chrome".to_string(),
            version: "1.0".to_string(),
        }
    }
}

impl From<ClientIdentity> for [String; 3] {
    fn from(identity: ClientIdentity) -> Self {
        [identity.name, identity.browser, identity.version]
    }
}

// ============================================================================
// Tests
// ============================================================================
