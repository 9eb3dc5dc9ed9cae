//! In-memory transport for unit testing the session manager and reactor.
//!
//! Every `open_session` call creates a [`FakeSession`] whose sinks the test
//! drives directly; reactions are recorded instead of sent.
//!
//! ```ignore
//! let transport = Arc::new(FakeTransport::new());
//! // ... start a manager on it ...
//! let session = transport.session(0).await;
//! session.emit(LifecycleEvent::qr("2@abc"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::identifiers::Jid;
use crate::protocol::{ClientIdentity, LifecycleEvent, MessageEvent, ProtocolVersion, Reaction};
use crate::store::SessionCredentials;

use super::{EventSinks, SessionHandle, SessionLink, Transport};

/// How long helpers wait before failing a test.
const WAIT: Duration = Duration::from_secs(5);

/// Transport recording every open request.
#[derive(Default)]
pub(crate) struct FakeTransport {
    opens: Mutex<Vec<Option<SessionCredentials>>>,
    sessions: Mutex<Vec<Arc<FakeSession>>>,
    failing_opens: AtomicUsize,
    version_unavailable: AtomicBool,
    notify: Notify,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` open requests fail.
    pub(crate) fn fail_next_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Makes version discovery fail.
    pub(crate) fn without_version(&self) {
        self.version_unavailable.store(true, Ordering::SeqCst);
    }

    /// Credentials passed to every open request so far.
    pub(crate) fn opens(&self) -> Vec<Option<SessionCredentials>> {
        self.opens.lock().clone()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    /// Waits until at least `count` open requests were made.
    pub(crate) async fn wait_for_opens(&self, count: usize) {
        timeout(WAIT, async {
            loop {
                let notified = self.notify.notified();
                if self.open_count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("open requests");
    }

    /// Waits for the `index`-th successfully opened session.
    pub(crate) async fn session(&self, index: usize) -> Arc<FakeSession> {
        timeout(WAIT, async {
            loop {
                let notified = self.notify.notified();
                if let Some(session) = self.sessions.lock().get(index) {
                    return Arc::clone(session);
                }
                notified.await;
            }
        })
        .await
        .expect("session opened")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn latest_version(&self) -> Result<ProtocolVersion> {
        if self.version_unavailable.load(Ordering::SeqCst) {
            return Err(Error::protocol("version endpoint down"));
        }
        Ok(ProtocolVersion::new(2, 3000, 1))
    }

    async fn open_session(
        &self,
        credentials: Option<SessionCredentials>,
        _version: ProtocolVersion,
        _identity: &ClientIdentity,
    ) -> Result<SessionHandle> {
        self.opens.lock().push(credentials);

        let failing = self.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_opens.store(failing - 1, Ordering::SeqCst);
            self.notify.notify_waiters();
            return Err(Error::connection_timeout(20_000));
        }

        let (sinks, streams) = EventSinks::channel();
        let session = Arc::new(FakeSession {
            sinks: Mutex::new(Some(sinks)),
            reactions: Mutex::new(Vec::new()),
            failing_reactions: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().push(Arc::clone(&session));
        self.notify.notify_waiters();

        Ok(streams.into_handle(session))
    }
}

/// One fake session: drives events in, records reactions out.
pub(crate) struct FakeSession {
    sinks: Mutex<Option<EventSinks>>,
    reactions: Mutex<Vec<(Jid, Reaction)>>,
    failing_reactions: AtomicUsize,
    closed: AtomicBool,
}

impl FakeSession {
    fn sinks(&self) -> Option<EventSinks> {
        self.sinks.lock().clone()
    }

    pub(crate) fn emit(&self, event: LifecycleEvent) {
        if let Some(sinks) = self.sinks() {
            sinks.lifecycle(event);
        }
    }

    pub(crate) fn deliver(&self, event: MessageEvent) {
        if let Some(sinks) = self.sinks() {
            sinks.message(event);
        }
    }

    /// Pushes a credential rotation, returning its acknowledgement.
    pub(crate) fn rotate(&self, credentials: SessionCredentials) -> oneshot::Receiver<Result<()>> {
        match self.sinks() {
            Some(sinks) => sinks.credentials(credentials),
            None => {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(Err(Error::ConnectionClosed));
                rx
            }
        }
    }

    /// Makes the next `count` reactions fail.
    pub(crate) fn fail_next_reactions(&self, count: usize) {
        self.failing_reactions.store(count, Ordering::SeqCst);
    }

    /// Every reaction attempt so far, failed ones included.
    pub(crate) fn reactions(&self) -> Vec<(Jid, Reaction)> {
        self.reactions.lock().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` reactions were attempted.
    pub(crate) async fn wait_for_reactions(&self, count: usize) -> Vec<(Jid, Reaction)> {
        timeout(WAIT, async {
            loop {
                let reactions = self.reactions();
                if reactions.len() >= count {
                    return reactions;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("reactions")
    }
}

#[async_trait]
impl SessionLink for FakeSession {
    async fn send_reaction(&self, target: &Jid, reaction: Reaction) -> Result<()> {
        self.reactions.lock().push((target.clone(), reaction));

        let failing = self.failing_reactions.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reactions.store(failing - 1, Ordering::SeqCst);
            return Err(Error::reaction("target no longer reactable"));
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.sinks.lock().take();
    }
}
