//! Inbound event filter and reactor.
//!
//! Consumes the per-session message stream in arrival order, keeps only
//! events delivered to the status broadcast address, and reacts to each
//! one exactly once with a randomly chosen symbol.
//!
//! Reaction failures are logged and dropped. They never reach the session
//! state machine and are never retried.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `content` | Envelope unwrapping and content-type detection |
//! | `picker` | [`SymbolPicker`] implementations |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope inspection.
pub mod content;

/// Symbol selection.
pub mod picker;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{Jid, MessageKey};
use crate::protocol::{MessageEvent, Reaction};
use crate::transport::SessionLink;

// ============================================================================
// Re-exports
// ============================================================================

pub use picker::{FixedPicker, RandomPicker, RngPicker, SymbolPicker};

// ============================================================================
// Constants
// ============================================================================

/// Reaction symbols used when none are configured.
pub const DEFAULT_SYMBOLS: [&str; 5] = ["🔥", "💯", "💥", "😎", "❤️"];

// ============================================================================
// Types
// ============================================================================

/// A message event that passed the broadcast filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactableEvent {
    /// Key of the original (outer) message.
    pub key: MessageKey,
    /// Content type of the resolved payload.
    pub content_type: Option<String>,
    /// Resolved payload, one ephemeral level unwrapped.
    pub content: Option<Value>,
}

/// Terminal outcome for one message event.
#[derive(Debug)]
pub enum ReactionOutcome {
    /// Not delivered to the broadcast address.
    Ignored,
    /// Reaction sent.
    Reacted {
        /// Symbol used.
        symbol: String,
    },
    /// Reaction dispatch failed; dropped.
    Failed {
        /// Symbol attempted.
        symbol: String,
        /// Failure cause.
        error: Error,
    },
}

impl ReactionOutcome {
    /// Returns `true` if a reaction was attempted.
    #[inline]
    #[must_use]
    pub fn attempted(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

// ============================================================================
// Reactor
// ============================================================================

/// Filters message events and dispatches reactions.
pub struct Reactor {
    broadcast: Jid,
    symbols: Vec<String>,
    picker: Box<dyn SymbolPicker>,
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("broadcast", &self.broadcast)
            .field("symbols", &self.symbols)
            .finish_non_exhaustive()
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// Creates a reactor with the default symbols and a random picker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            broadcast: Jid::status_broadcast(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect(),
            picker: Box::new(RandomPicker),
        }
    }

    /// Replaces the symbol set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no non-blank symbol is given.
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: Vec<String> = symbols
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.trim().is_empty())
            .collect();

        if symbols.is_empty() {
            return Err(Error::config("Reaction symbol set must not be empty"));
        }

        self.symbols = symbols;
        Ok(self)
    }

    /// Replaces the random source.
    #[inline]
    #[must_use]
    pub fn with_picker(mut self, picker: impl SymbolPicker + 'static) -> Self {
        self.picker = Box::new(picker);
        self
    }

    /// Returns the symbol set.
    #[inline]
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Applies the broadcast filter and resolves the content payload.
    #[must_use]
    pub fn accept(&self, event: &MessageEvent) -> Option<ReactableEvent> {
        if event.target() != &self.broadcast {
            return None;
        }

        let content = event.message.as_ref().map(content::unwrap_ephemeral);

        Some(ReactableEvent {
            key: event.key.clone(),
            content_type: content
                .and_then(content::content_type)
                .map(str::to_string),
            content: content.cloned(),
        })
    }

    /// Picks the symbol for the next reaction.
    #[must_use]
    pub fn choose(&self) -> &str {
        let index = self.picker.pick(self.symbols.len());
        &self.symbols[index.min(self.symbols.len() - 1)]
    }

    /// Handles one message event.
    pub async fn react(&self, event: &MessageEvent, link: &dyn SessionLink) -> ReactionOutcome {
        let Some(reactable) = self.accept(event) else {
            trace!(target_jid = %event.target(), "Ignoring non-broadcast message");
            return ReactionOutcome::Ignored;
        };

        let symbol = self.choose().to_string();
        let reaction = Reaction::new(symbol.clone(), reactable.key);

        debug!(
            id = %reaction.key.id,
            content_type = reactable.content_type.as_deref().unwrap_or("unknown"),
            "Status update received"
        );

        match link.send_reaction(&self.broadcast, reaction).await {
            Ok(()) => {
                info!(id = %event.key.id, %symbol, "Reacted to status");
                ReactionOutcome::Reacted { symbol }
            }
            Err(error) => {
                warn!(id = %event.key.id, %symbol, error = %error, "Failed to react to status");
                ReactionOutcome::Failed { symbol, error }
            }
        }
    }

    /// Consumes a session's message stream until it ends.
    pub async fn run(
        self: Arc<Self>,
        mut messages: mpsc::UnboundedReceiver<MessageEvent>,
        link: Arc<dyn SessionLink>,
    ) {
        while let Some(event) = messages.recv().await {
            self.react(&event, link.as_ref()).await;
        }

        debug!("Message stream ended");
    }
}

// ============================================================================
// Tests
// ============================================================================
