//! Transport capability.
//!
//! The transport owns the network handshake, encryption and framing. The
//! session manager only drives it through the [`Transport`] trait and
//! consumes the three per-session streams it hands back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  SessionManager  │                              │  Gateway        │
//! │                  │         WebSocket            │  (network       │
//! │  GatewayTransport│◄────────────────────────────►│   protocol)     │
//! │  → Connection    │       ws://host:PORT         │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `Transport::open_session` - connect and open a session
//! 2. Consume `SessionHandle::lifecycle`, `messages`, `credentials`
//! 3. `SessionLink::send_reaction` - react to messages
//! 4. `SessionLink::close` - abandon the session (streams end)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `gateway` | [`Transport`] implementation over a gateway connection |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Gateway-backed transport.
pub mod gateway;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::identifiers::Jid;
use crate::protocol::{ClientIdentity, LifecycleEvent, MessageEvent, ProtocolVersion, Reaction};
use crate::store::SessionCredentials;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use gateway::GatewayTransport;

// ============================================================================
// Transport
// ============================================================================

/// Capability to open sessions on the messaging network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the newest protocol version supported by the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be discovered.
    async fn latest_version(&self) -> Result<ProtocolVersion>;

    /// Opens a new session.
    ///
    /// `credentials` is `None` when no usable credentials are stored; the
    /// transport then starts a pairing flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be requested.
    async fn open_session(
        &self,
        credentials: Option<SessionCredentials>,
        version: ProtocolVersion,
        identity: &ClientIdentity,
    ) -> Result<SessionHandle>;
}

/// Operations available on an open session.
#[async_trait]
pub trait SessionLink: Send + Sync {
    /// Reacts to a message in `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reaction was not delivered.
    async fn send_reaction(&self, target: &Jid, reaction: Reaction) -> Result<()>;

    /// Abandons the session. Its event streams end shortly after.
    fn close(&self);
}

// ============================================================================
// CredentialUpdate
// ============================================================================

/// Credential rotation notification awaiting acknowledgement.
///
/// The transport considers the rotation handled only once
/// [`CredentialUpdate::acknowledge`] has been called.
pub struct CredentialUpdate {
    /// Full credential snapshot.
    credentials: SessionCredentials,
    /// Acknowledgement back to the transport.
    ack: oneshot::Sender<Result<()>>,
}

impl CredentialUpdate {
    /// Returns the rotated credentials.
    #[inline]
    #[must_use]
    pub fn credentials(&self) -> &SessionCredentials {
        &self.credentials
    }

    /// Reports the persistence outcome to the transport.
    pub fn acknowledge(self, result: Result<()>) {
        let _ = self.ack.send(result);
    }
}

impl fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialUpdate").finish_non_exhaustive()
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// A freshly opened session: three ordered event streams and a link.
pub struct SessionHandle {
    /// Lifecycle events (pairing artifacts, open, close).
    pub lifecycle: mpsc::UnboundedReceiver<LifecycleEvent>,
    /// Inbound message events.
    pub messages: mpsc::UnboundedReceiver<MessageEvent>,
    /// Credential rotations.
    pub credentials: mpsc::UnboundedReceiver<CredentialUpdate>,
    /// Session operations.
    pub link: Arc<dyn SessionLink>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

// ============================================================================
// EventSinks
// ============================================================================

/// Producer side of a session's event streams.
///
/// Dropping the sinks ends all three streams.
#[derive(Clone)]
pub struct EventSinks {
    lifecycle: mpsc::UnboundedSender<LifecycleEvent>,
    messages: mpsc::UnboundedSender<MessageEvent>,
    credentials: mpsc::UnboundedSender<CredentialUpdate>,
}

/// Consumer side of a session's event streams, before a link is attached.
pub struct SessionStreams {
    lifecycle: mpsc::UnboundedReceiver<LifecycleEvent>,
    messages: mpsc::UnboundedReceiver<MessageEvent>,
    credentials: mpsc::UnboundedReceiver<CredentialUpdate>,
}

impl EventSinks {
    /// Creates a connected pair of sinks and streams.
    #[must_use]
    pub fn channel() -> (Self, SessionStreams) {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (credentials_tx, credentials_rx) = mpsc::unbounded_channel();

        let sinks = Self {
            lifecycle: lifecycle_tx,
            messages: messages_tx,
            credentials: credentials_tx,
        };
        let streams = SessionStreams {
            lifecycle: lifecycle_rx,
            messages: messages_rx,
            credentials: credentials_rx,
        };

        (sinks, streams)
    }

    /// Emits a lifecycle event. Returns `false` if nobody is listening.
    pub fn lifecycle(&self, event: LifecycleEvent) -> bool {
        self.lifecycle.send(event).is_ok()
    }

    /// Emits a message event. Returns `false` if nobody is listening.
    pub fn message(&self, event: MessageEvent) -> bool {
        self.messages.send(event).is_ok()
    }

    /// Emits a credential rotation.
    ///
    /// The returned receiver resolves once the rotation was persisted (or
    /// failed to be).
    pub fn credentials(&self, credentials: SessionCredentials) -> oneshot::Receiver<Result<()>> {
        let (ack, ack_rx) = oneshot::channel();
        let update = CredentialUpdate { credentials, ack };

        if let Err(mpsc::error::SendError(update)) = self.credentials.send(update) {
            update.acknowledge(Err(Error::ConnectionClosed));
        }

        ack_rx
    }
}

impl SessionStreams {
    /// Attaches the session link, producing a handle.
    #[must_use]
    pub fn into_handle(self, link: Arc<dyn SessionLink>) -> SessionHandle {
        SessionHandle {
            lifecycle: self.lifecycle,
            messages: self.messages,
            credentials: self.credentials,
            link,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
