//! Content envelope inspection.
//!
//! A message envelope is a JSON object keyed by content type, e.g.
//! `{"imageMessage": {...}}`. Disappearing messages nest the real payload
//! one level down under `ephemeralMessage.message`.

use serde_json::Value;

/// Wrapper key for disappearing-message envelopes.
pub const EPHEMERAL_KEY: &str = "ephemeralMessage";

/// Keys carrying protocol metadata rather than content.
const METADATA_KEYS: &[&str] = &["senderKeyDistributionMessage", "messageContextInfo"];

/// Unwraps one ephemeral level, if present.
#[must_use]
pub fn unwrap_ephemeral(message: &Value) -> &Value {
    message
        .get(EPHEMERAL_KEY)
        .and_then(|wrapper| wrapper.get("message"))
        .filter(|inner| inner.is_object())
        .unwrap_or(message)
}

/// Returns the content type tag of an envelope.
#[must_use]
pub fn content_type(message: &Value) -> Option<&str> {
    message
        .as_object()?
        .keys()
        .map(String::as_str)
        .find(|key| !METADATA_KEYS.contains(key))
}
