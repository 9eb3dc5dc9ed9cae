//! Builder pattern for session manager configuration.
//!
//! # Example
//!
//! ```no_run
//! use status_reactor::{FileCredentialStore, GatewayTransport, SessionManager};
//!
//! # fn example() -> status_reactor::Result<()> {
//! let url = "ws://127.0.0.1:8765".parse().expect("url");
//! let manager = SessionManager::builder()
//!     .transport(GatewayTransport::new(url))
//!     .store(FileCredentialStore::open("./session")?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::protocol::ClientIdentity;
use crate::reactor::Reactor;
use crate::status::{PngDataUrlEncoder, QrEncoder};
use crate::store::CredentialStore;
use crate::transport::Transport;

use super::manager::{ManagerInner, SessionManager};
use super::policy::ReconnectPolicy;
use super::state::StatusBoard;

// ============================================================================
// SessionManagerBuilder
// ============================================================================

/// Builder for configuring a [`SessionManager`].
///
/// Use [`SessionManager::builder()`] to create a new builder. Transport and
/// store are required; everything else has a default.
#[derive(Default)]
pub struct SessionManagerBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    reactor: Option<Reactor>,
    encoder: Option<Arc<dyn QrEncoder>>,
    identity: ClientIdentity,
    policy: ReconnectPolicy,
}

impl fmt::Debug for SessionManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManagerBuilder")
            .field("transport", &self.transport.is_some())
            .field("store", &self.store.is_some())
            .field("reactor", &self.reactor)
            .field("identity", &self.identity)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionManagerBuilder Implementation
// ============================================================================

impl SessionManagerBuilder {
    /// Creates a new builder with no transport or store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport sessions are opened on.
    #[inline]
    #[must_use]
    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.transport_arc(Arc::new(transport))
    }

    /// Sets a shared transport.
    #[inline]
    #[must_use]
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the credential store.
    #[inline]
    #[must_use]
    pub fn store(self, store: impl CredentialStore + 'static) -> Self {
        self.store_arc(Arc::new(store))
    }

    /// Sets a shared credential store.
    #[inline]
    #[must_use]
    pub fn store_arc(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the message-stream reactor. Defaults to [`Reactor::new()`].
    #[inline]
    #[must_use]
    pub fn reactor(mut self, reactor: Reactor) -> Self {
        self.reactor = Some(reactor);
        self
    }

    /// Sets the QR renderer. Defaults to [`PngDataUrlEncoder`].
    #[inline]
    #[must_use]
    pub fn encoder(mut self, encoder: impl QrEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Sets the identity announced when opening sessions.
    #[inline]
    #[must_use]
    pub fn identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the manager with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if transport or store not set
    /// - [`Error::Config`] if the policy allows zero attempts
    pub fn build(self) -> Result<SessionManager> {
        let transport = self.transport.ok_or_else(|| {
            Error::config(
                "Transport is required. Use .transport() to set it.\n\
                 Example: SessionManager::builder().transport(GatewayTransport::new(url))",
            )
        })?;

        let store = self.store.ok_or_else(|| {
            Error::config(
                "Credential store is required. Use .store() to set it.\n\
                 Example: SessionManager::builder().store(FileCredentialStore::open(\"./session\")?)",
            )
        })?;

        if self.policy.max_attempts == Some(0) {
            return Err(Error::config("Reconnect policy must allow at least one attempt"));
        }

        let inner = ManagerInner {
            transport,
            store,
            reactor: Arc::new(self.reactor.unwrap_or_default()),
            encoder: self
                .encoder
                .unwrap_or_else(|| Arc::new(PngDataUrlEncoder::default())),
            identity: self.identity,
            policy: self.policy,
            board: StatusBoard::new(),
            started: AtomicBool::new(false),
            supervisor: Mutex::new(None),
            active: Mutex::new(None),
        };

        Ok(SessionManager {
            inner: Arc::new(inner),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::ConnectionState;
    use crate::store::MemoryCredentialStore;
    use crate::transport::fake::FakeTransport;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = SessionManagerBuilder::new();
        assert!(builder.transport.is_none());
        assert!(builder.store.is_none());
        assert_eq!(builder.policy, ReconnectPolicy::default());
        assert_eq!(builder.identity, ClientIdentity::default());
    }

    #[test]
    fn test_build_without_transport_fails() {
        let err = SessionManagerBuilder::new()
            .store(MemoryCredentialStore::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Transport is required"));
    }

    #[test]
    fn test_build_without_store_fails() {
        let err = SessionManagerBuilder::new()
            .transport(FakeTransport::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Credential store is required"));
    }

    #[test]
    fn test_zero_attempt_policy_rejected() {
        let err = SessionManagerBuilder::new()
            .transport(FakeTransport::new())
            .store(MemoryCredentialStore::default())
            .policy(ReconnectPolicy::default().with_max_attempts(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_starts_in_connecting() {
        let manager = SessionManagerBuilder::new()
            .transport(FakeTransport::new())
            .store(MemoryCredentialStore::default())
            .build()
            .expect("build");
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(manager.status().snapshot().artifact.is_none());
    }
}
