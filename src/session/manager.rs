//! Session connection manager.
//!
//! The [`SessionManager`] owns the connection state machine. It requests
//! transport sessions, consumes their lifecycle stream, publishes pairing
//! artifacts and decides between reconnecting and halting.
//!
//! # Session Loop
//!
//! ```text
//!  start() ──► open ──► lifecycle events ──► close(reason)
//!               ▲                                 │
//!               └──── Recoverable (backoff) ◄─────┤
//!                                                 └──► LoggedOut (halt)
//! ```
//!
//! Per session, two consumer tasks run beside the lifecycle loop:
//! credential persistence and the [`Reactor`]. Both are re-created on
//! every reconnect; the old reactor task is aborted without draining.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{ClientIdentity, ProtocolVersion};
use crate::reactor::Reactor;
use crate::status::QrEncoder;
use crate::store::CredentialStore;
use crate::transport::{CredentialUpdate, SessionHandle, SessionLink, Transport};

use super::builder::SessionManagerBuilder;
use super::policy::ReconnectPolicy;
use super::state::{
    ConnectionState, DisconnectReason, PairingArtifact, StatusBoard, StatusView, close_code_label,
};

// ============================================================================
// Constants
// ============================================================================

/// How long an abandoned session may take to flush pending credential saves.
const CREDENTIAL_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the manager.
pub(crate) struct ManagerInner {
    /// Session capability.
    pub transport: Arc<dyn Transport>,

    /// Durable credential storage.
    pub store: Arc<dyn CredentialStore>,

    /// Message-stream consumer.
    pub reactor: Arc<Reactor>,

    /// QR payload renderer.
    pub encoder: Arc<dyn QrEncoder>,

    /// Identity announced on every session.
    pub identity: ClientIdentity,

    /// Reconnect pacing.
    pub policy: ReconnectPolicy,

    /// Published status (single writer).
    pub board: StatusBoard,

    /// Set once `start()` has run.
    pub started: AtomicBool,

    /// Supervisor task driving the session loop.
    pub supervisor: Mutex<Option<JoinHandle<()>>>,

    /// Session currently consumed by the supervisor.
    pub(crate) active: Mutex<Option<ActiveSession>>,
}

/// Link and message consumer of the session being run.
///
/// The credential persister is not tracked: it ends on its own once the
/// link is closed and the transport drops the stream.
pub(crate) struct ActiveSession {
    link: Arc<dyn SessionLink>,
    reactor: AbortHandle,
}

impl ActiveSession {
    /// Stops reacting and abandons the session.
    fn close(self) {
        self.reactor.abort();
        self.link.close();
    }
}

// ============================================================================
// SessionManager
// ============================================================================

/// Session connection lifecycle manager.
///
/// # Example
///
/// ```ignore
/// let manager = SessionManager::builder()
///     .transport(GatewayTransport::new(url))
///     .store(FileCredentialStore::open("./session")?)
///     .build()?;
///
/// let status = manager.status();
/// manager.start().await;
/// ```
#[derive(Clone)]
pub struct SessionManager {
    /// Shared inner state.
    pub(crate) inner: Arc<ManagerInner>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.inner.board.snapshot().state)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionManager - Public API
// ============================================================================

impl SessionManager {
    /// Creates a configuration builder for the manager.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Returns a read-only view of the published status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusView {
        self.inner.board.view()
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.board.snapshot().state
    }

    /// Issues the first session attempt and hands the session loop to a
    /// background task.
    ///
    /// Returns once the first open request has completed, not once the
    /// session is connected. Failures never surface here; they become
    /// state transitions. Calling `start` again is a no-op.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Session manager already started");
            return;
        }

        info!("Starting session manager");

        let first = self.inner.open_session().await;
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.supervise(first).await });

        *self.inner.supervisor.lock() = Some(task);
    }

    /// Waits for the session loop to halt.
    ///
    /// The loop only halts after a logout or when the reconnect ceiling
    /// is reached. Returns immediately if `start` was never called.
    pub async fn join(&self) {
        let task = self.inner.supervisor.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
            && e.is_panic()
        {
            error!(error = %e, "Session loop panicked");
        }
    }

    /// Stops the session loop and closes the current session.
    ///
    /// Credential rotations already delivered are still persisted.
    pub fn shutdown(&self) {
        let task = self.inner.supervisor.lock().take();
        let Some(task) = task else {
            return;
        };

        task.abort();

        let active = self.inner.active.lock().take();
        if let Some(active) = active {
            active.close();
        }

        info!("Session manager stopped");
    }
}

// ============================================================================
// ManagerInner - Session Loop
// ============================================================================

impl ManagerInner {
    /// Drives sessions until logout or until the reconnect ceiling is hit.
    async fn supervise(self: Arc<Self>, first: Result<SessionHandle>) {
        let mut next = first;
        let mut attempt: u32 = 0;

        loop {
            let reason = match next {
                Ok(handle) => self.run_session(handle, &mut attempt).await,
                Err(e) => {
                    if e.is_connection_error() {
                        warn!(error = %e, "Gateway unreachable, session not opened");
                    } else {
                        warn!(error = %e, "Failed to open session");
                    }
                    self.board
                        .set_state(ConnectionState::Disconnected(DisconnectReason::Recoverable));
                    DisconnectReason::Recoverable
                }
            };

            if reason == DisconnectReason::LoggedOut {
                self.board.update(|snapshot| {
                    snapshot.state = ConnectionState::LoggedOut;
                    snapshot.artifact = PairingArtifact::None;
                });
                error!("Logged out. Clear the session directory and restart to pair again");
                return;
            }

            attempt = attempt.saturating_add(1);
            if !self.policy.allows(attempt) {
                error!(attempt, "Reconnect attempts exhausted, giving up");
                return;
            }

            let delay = self.policy.delay_for(attempt);

            if delay.is_zero() {
                info!(attempt, "Connection lost, reconnecting");
            } else {
                info!(attempt, delay_ms = delay.as_millis() as u64, "Connection lost, reconnecting after backoff");
                sleep(delay).await;
            }

            self.board.set_state(ConnectionState::Connecting);
            next = self.open_session().await;
        }
    }

    /// Requests a transport session with the persisted credentials.
    async fn open_session(&self) -> Result<SessionHandle> {
        let credentials = match self.store.load() {
            Ok(Some(credentials)) => Some(credentials),
            Ok(None) => {
                info!("No stored credentials, pairing required");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stored credentials unusable, pairing required");
                None
            }
        };

        let version = match self.transport.latest_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, fallback = %ProtocolVersion::DEFAULT, "Latest protocol version unavailable");
                ProtocolVersion::DEFAULT
            }
        };

        debug!(%version, paired = credentials.is_some(), "Opening session");

        self.transport
            .open_session(credentials, version, &self.identity)
            .await
    }

    /// Consumes one session until it closes, returning the close reason.
    async fn run_session(&self, handle: SessionHandle, attempt: &mut u32) -> DisconnectReason {
        let SessionHandle {
            mut lifecycle,
            messages,
            credentials,
            link,
        } = handle;

        let persister = tokio::spawn(persist_credentials(Arc::clone(&self.store), credentials));
        let reactor = tokio::spawn(Arc::clone(&self.reactor).run(messages, Arc::clone(&link)));

        *self.active.lock() = Some(ActiveSession {
            link: Arc::clone(&link),
            reactor: reactor.abort_handle(),
        });

        let reason = loop {
            let Some(event) = lifecycle.recv().await else {
                warn!("Lifecycle stream ended without a close");
                self.board
                    .set_state(ConnectionState::Disconnected(DisconnectReason::Recoverable));
                break DisconnectReason::Recoverable;
            };

            let previous = self.board.snapshot().state;
            let closed = self
                .board
                .update(|snapshot| snapshot.apply(&event, self.encoder.as_ref()));
            let current = self.board.snapshot();

            if current.state != previous {
                debug!(from = %previous, to = %current.state, "Connection state changed");
            }

            match (&current.state, &current.artifact) {
                (ConnectionState::Connected, _) if previous != ConnectionState::Connected => {
                    info!("Connected");
                    *attempt = 0;
                }
                (ConnectionState::AwaitingPairing, PairingArtifact::Qr(_)) if event.qr.is_some() => {
                    info!("QR code generated");
                }
                (ConnectionState::AwaitingPairing, PairingArtifact::Code(code))
                    if event.pairing_code.is_some() =>
                {
                    info!(%code, "Pairing code generated");
                }
                _ => {}
            }

            if let Some(reason) = closed {
                let code = event.close_status_code;
                match reason {
                    DisconnectReason::Recoverable => warn!(
                        status_code = ?code,
                        cause = close_code_label(code),
                        "Session closed"
                    ),
                    DisconnectReason::LoggedOut => error!(
                        status_code = ?code,
                        cause = close_code_label(code),
                        "Session logged out"
                    ),
                }
                break reason;
            }
        };

        self.active.lock().take();
        reactor.abort();
        link.close();

        if timeout(CREDENTIAL_DRAIN_TIMEOUT, persister).await.is_err() {
            warn!("Abandoned session still holds credential updates");
        }

        reason
    }
}

// ============================================================================
// Credential Persistence
// ============================================================================

/// Persists every credential rotation before acknowledging it.
async fn persist_credentials(
    store: Arc<dyn CredentialStore>,
    mut updates: mpsc::UnboundedReceiver<CredentialUpdate>,
) {
    while let Some(update) = updates.recv().await {
        let snapshot = update.credentials().clone();
        let store = Arc::clone(&store);

        let result = match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(result) => result,
            Err(e) => Err(Error::credential_store(format!("Save task failed: {e}"))),
        };

        match &result {
            Ok(()) => debug!("Credentials persisted"),
            Err(e) => error!(error = %e, "Failed to persist credentials"),
        }

        update.acknowledge(result);
    }
}

// ============================================================================
// Tests
// ============================================================================
