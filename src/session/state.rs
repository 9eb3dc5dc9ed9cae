//! Connection state, pairing artifacts and the published status snapshot.
//!
//! [`StatusSnapshot::apply`] is the whole lifecycle state machine: the
//! manager feeds it every lifecycle event and publishes the result through
//! a [`StatusBoard`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, warn};

use crate::protocol::{ConnectionPhase, LifecycleEvent};
use crate::status::QrEncoder;

// ============================================================================
// Constants
// ============================================================================

/// Close status code meaning the account revoked this session.
pub const LOGGED_OUT_STATUS: u16 = 401;

// ============================================================================
// DisconnectReason
// ============================================================================

/// Classification of a session close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisconnectReason {
    /// Transient loss; a new session is opened.
    Recoverable,
    /// Explicit logout; terminal.
    LoggedOut,
}

impl DisconnectReason {
    /// Classifies a close by its status code.
    ///
    /// Only [`LOGGED_OUT_STATUS`] is terminal; a missing code is recoverable.
    #[inline]
    #[must_use]
    pub fn from_status_code(code: Option<u16>) -> Self {
        match code {
            Some(LOGGED_OUT_STATUS) => Self::LoggedOut,
            _ => Self::Recoverable,
        }
    }
}

/// Human-readable name of a known close status code.
#[must_use]
pub fn close_code_label(code: Option<u16>) -> &'static str {
    match code {
        None => "unknown",
        Some(401) => "logged out",
        Some(403) => "forbidden",
        Some(408) => "connection lost",
        Some(411) => "multi-device mismatch",
        Some(428) => "connection closed",
        Some(440) => "connection replaced",
        Some(500) => "bad session",
        Some(503) => "service unavailable",
        Some(515) => "restart required",
        Some(_) => "unrecognized",
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Session connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum ConnectionState {
    /// A session has been requested.
    Connecting,
    /// A QR payload or pairing code is waiting to be used.
    AwaitingPairing,
    /// The session is open.
    Connected,
    /// The session closed.
    Disconnected(DisconnectReason),
    /// The account logged this session out; nothing more will happen.
    LoggedOut,
}

impl ConnectionState {
    /// Returns `true` once no further transition can happen.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::AwaitingPairing => f.write_str("awaiting pairing"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected(DisconnectReason::Recoverable) => f.write_str("disconnected"),
            Self::Disconnected(DisconnectReason::LoggedOut) => {
                f.write_str("disconnected (logged out)")
            }
            Self::LoggedOut => f.write_str("logged out"),
        }
    }
}

// ============================================================================
// PairingArtifact
// ============================================================================

/// A rendered QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrArtifact {
    /// Raw QR payload.
    pub payload: String,
    /// PNG `data:` URL, `None` if rendering failed.
    pub image: Option<String>,
}

/// Pairing material currently presented to the operator.
///
/// Being a single value, at most one kind is ever current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum PairingArtifact {
    /// Nothing to present.
    #[default]
    None,
    /// QR code to scan.
    Qr(QrArtifact),
    /// Numeric code to type in.
    Code(String),
}

impl PairingArtifact {
    /// Returns `true` if no artifact is current.
    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ============================================================================
// StatusSnapshot
// ============================================================================

/// Published pair of connection state and pairing artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Connection state.
    pub state: ConnectionState,
    /// Current pairing artifact.
    pub artifact: PairingArtifact,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            artifact: PairingArtifact::None,
        }
    }
}

impl StatusSnapshot {
    /// Applies a lifecycle event.
    ///
    /// A QR payload wins over a pairing code carried by the same event.
    /// The phase is applied after the artifact, so an event carrying both
    /// a payload and `open` ends `Connected` with no artifact.
    ///
    /// Returns the disconnect reason when the event closes the session.
    pub fn apply(
        &mut self,
        event: &LifecycleEvent,
        encoder: &dyn QrEncoder,
    ) -> Option<DisconnectReason> {
        if let Some(payload) = &event.qr {
            let image = match encoder.encode(payload) {
                Ok(image) => Some(image),
                Err(e) => {
                    error!(error = %e, "Failed to render QR code");
                    None
                }
            };
            self.artifact = PairingArtifact::Qr(QrArtifact {
                payload: payload.clone(),
                image,
            });
            self.enter_pairing();
        } else if let Some(code) = &event.pairing_code {
            self.artifact = PairingArtifact::Code(code.clone());
            self.enter_pairing();
        }

        match event.phase {
            Some(ConnectionPhase::Open) => {
                self.state = ConnectionState::Connected;
                self.artifact = PairingArtifact::None;
                None
            }
            Some(ConnectionPhase::Close) => {
                let reason = DisconnectReason::from_status_code(event.close_status_code);
                self.state = ConnectionState::Disconnected(reason);
                Some(reason)
            }
            Some(ConnectionPhase::Connecting) | None => None,
        }
    }

    fn enter_pairing(&mut self) {
        if self.state == ConnectionState::Connected {
            warn!("Pairing artifact received on an open session");
        }
        self.state = ConnectionState::AwaitingPairing;
    }
}

// ============================================================================
// StatusBoard
// ============================================================================

/// Single-writer side of the published status.
///
/// Readers obtain a [`StatusView`]; every update replaces the whole
/// snapshot, so readers never observe two artifacts at once.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusBoard {
    /// Creates a board holding the initial `Connecting` snapshot.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        Self { tx }
    }

    /// Returns a read-only view.
    #[inline]
    #[must_use]
    pub fn view(&self) -> StatusView {
        StatusView {
            rx: self.tx.subscribe(),
        }
    }

    /// Returns a copy of the current snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Mutates the snapshot and notifies readers.
    pub fn update<R>(&self, f: impl FnOnce(&mut StatusSnapshot) -> R) -> R {
        let mut snapshot = self.snapshot();
        let output = f(&mut snapshot);
        self.tx.send_replace(snapshot);
        output
    }

    /// Sets the connection state, leaving the artifact untouched.
    pub fn set_state(&self, state: ConnectionState) {
        self.tx.send_modify(|snapshot| snapshot.state = state);
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// StatusView
// ============================================================================

/// Read-only view of the published status.
#[derive(Debug, Clone)]
pub struct StatusView {
    rx: watch::Receiver<StatusSnapshot>,
}

impl StatusView {
    /// Returns a copy of the current snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits until the snapshot satisfies `predicate`, returning it.
    ///
    /// Returns `None` if the board was dropped first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&StatusSnapshot) -> bool,
    ) -> Option<StatusSnapshot> {
        self.rx
            .wait_for(predicate)
            .await
            .ok()
            .map(|snapshot| (*snapshot).clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::error::{Error, Result};

    /// Encoder producing a predictable fake data URL.
    struct StubEncoder;

    impl QrEncoder for StubEncoder {
        fn encode(&self, payload: &str) -> Result<String> {
            Ok(format!("data:stub,{payload}"))
        }
    }

    /// Encoder that always fails.
    struct BrokenEncoder;

    impl QrEncoder for BrokenEncoder {
        fn encode(&self, _payload: &str) -> Result<String> {
            Err(Error::qr_render("too long"))
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = StatusSnapshot::default();
        assert_eq!(snapshot.state, ConnectionState::Connecting);
        assert!(snapshot.artifact.is_none());
    }

    #[test]
    fn test_qr_enters_pairing() {
        let mut snapshot = StatusSnapshot::default();
        assert!(snapshot.apply(&LifecycleEvent::qr("2@a"), &StubEncoder).is_none());

        assert_eq!(snapshot.state, ConnectionState::AwaitingPairing);
        assert_eq!(
            snapshot.artifact,
            PairingArtifact::Qr(QrArtifact {
                payload: "2@a".into(),
                image: Some("data:stub,2@a".into()),
            })
        );
    }

    #[test]
    fn test_new_artifact_replaces_old() {
        let mut snapshot = StatusSnapshot::default();
        snapshot.apply(&LifecycleEvent::qr("2@a"), &StubEncoder);
        snapshot.apply(&LifecycleEvent::pairing_code("12345678"), &StubEncoder);
        assert_eq!(snapshot.artifact, PairingArtifact::Code("12345678".into()));

        snapshot.apply(&LifecycleEvent::qr("2@b"), &StubEncoder);
        assert!(matches!(&snapshot.artifact, PairingArtifact::Qr(qr) if qr.payload == "2@b"));
        assert_eq!(snapshot.state, ConnectionState::AwaitingPairing);
    }

    #[test]
    fn test_qr_wins_over_code_in_same_event() {
        let mut snapshot = StatusSnapshot::default();
        let event = LifecycleEvent {
            qr: Some("2@a".into()),
            pairing_code: Some("999".into()),
            ..LifecycleEvent::default()
        };
        snapshot.apply(&event, &StubEncoder);
        assert!(matches!(snapshot.artifact, PairingArtifact::Qr(_)));
    }

    #[test]
    fn test_open_clears_artifact() {
        let mut snapshot = StatusSnapshot::default();
        snapshot.apply(&LifecycleEvent::pairing_code("12345678"), &StubEncoder);
        snapshot.apply(&LifecycleEvent::open(), &StubEncoder);

        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert!(snapshot.artifact.is_none());
    }

    #[test]
    fn test_render_failure_keeps_payload() {
        let mut snapshot = StatusSnapshot::default();
        snapshot.apply(&LifecycleEvent::qr("2@a"), &BrokenEncoder);

        assert_eq!(
            snapshot.artifact,
            PairingArtifact::Qr(QrArtifact {
                payload: "2@a".into(),
                image: None,
            })
        );
    }

    #[test]
    fn test_close_classification() {
        let mut snapshot = StatusSnapshot::default();
        let reason = snapshot.apply(&LifecycleEvent::close(Some(401)), &StubEncoder);
        assert_eq!(reason, Some(DisconnectReason::LoggedOut));
        assert_eq!(
            snapshot.state,
            ConnectionState::Disconnected(DisconnectReason::LoggedOut)
        );

        let mut snapshot = StatusSnapshot::default();
        let reason = snapshot.apply(&LifecycleEvent::close(Some(515)), &StubEncoder);
        assert_eq!(reason, Some(DisconnectReason::Recoverable));

        let mut snapshot = StatusSnapshot::default();
        let reason = snapshot.apply(&LifecycleEvent::close(None), &StubEncoder);
        assert_eq!(reason, Some(DisconnectReason::Recoverable));
    }

    #[test]
    fn test_connecting_phase_is_not_a_transition() {
        let mut snapshot = StatusSnapshot::default();
        snapshot.apply(&LifecycleEvent::qr("2@a"), &StubEncoder);
        snapshot.apply(
            &LifecycleEvent::phase(ConnectionPhase::Connecting),
            &StubEncoder,
        );
        assert_eq!(snapshot.state, ConnectionState::AwaitingPairing);
    }

    #[test]
    fn test_close_code_labels() {
        assert_eq!(close_code_label(Some(401)), "logged out");
        assert_eq!(close_code_label(Some(515)), "restart required");
        assert_eq!(close_code_label(Some(999)), "unrecognized");
        assert_eq!(close_code_label(None), "unknown");
    }

    #[tokio::test]
    async fn test_board_publishes_to_views() {
        let board = StatusBoard::new();
        let mut view = board.view();

        board.update(|s| s.apply(&LifecycleEvent::pairing_code("42"), &StubEncoder));

        let seen = view
            .wait_for(|s| s.state == ConnectionState::AwaitingPairing)
            .await
            .expect("board alive");
        assert_eq!(seen.artifact, PairingArtifact::Code("42".into()));
        assert_eq!(board.snapshot(), view.snapshot());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = StatusSnapshot {
            state: ConnectionState::Disconnected(DisconnectReason::Recoverable),
            artifact: PairingArtifact::Code("123".into()),
        };
        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(json["state"]["state"], "disconnected");
        assert_eq!(json["state"]["reason"], "recoverable");
        assert_eq!(json["artifact"]["kind"], "code");
        assert_eq!(json["artifact"]["value"], "123");
    }

    fn lifecycle_event() -> impl Strategy<Value = LifecycleEvent> {
        (
            prop::option::of(prop_oneof![
                Just(ConnectionPhase::Connecting),
                Just(ConnectionPhase::Open),
                Just(ConnectionPhase::Close),
            ]),
            prop::option::of("[a-z0-9@]{1,12}"),
            prop::option::of("[0-9]{8}"),
            prop::option::of(prop_oneof![Just(401u16), Just(408u16), Just(515u16), any::<u16>()]),
        )
            .prop_map(|(phase, qr, pairing_code, close_status_code)| LifecycleEvent {
                phase,
                qr,
                pairing_code,
                close_status_code,
            })
    }

    proptest! {
        #[test]
        fn prop_transitions_hold_invariants(events in prop::collection::vec(lifecycle_event(), 1..40)) {
            let mut snapshot = StatusSnapshot::default();

            for event in &events {
                let reason = snapshot.apply(event, &StubEncoder);

                match event.phase {
                    Some(ConnectionPhase::Open) => {
                        prop_assert_eq!(snapshot.state, ConnectionState::Connected);
                        prop_assert!(snapshot.artifact.is_none());
                    }
                    Some(ConnectionPhase::Close) => {
                        let expected = if event.close_status_code == Some(LOGGED_OUT_STATUS) {
                            DisconnectReason::LoggedOut
                        } else {
                            DisconnectReason::Recoverable
                        };
                        prop_assert_eq!(reason, Some(expected));
                        prop_assert_eq!(snapshot.state, ConnectionState::Disconnected(expected));
                    }
                    _ => {
                        prop_assert!(reason.is_none());
                        if let Some(qr) = &event.qr {
                            prop_assert!(
                                matches!(&snapshot.artifact, PairingArtifact::Qr(a) if &a.payload == qr)
                            );
                        } else if let Some(code) = &event.pairing_code {
                            prop_assert_eq!(&snapshot.artifact, &PairingArtifact::Code(code.clone()));
                        }
                    }
                }

                if snapshot.state == ConnectionState::Connected {
                    prop_assert!(snapshot.artifact.is_none());
                }
            }
        }
    }
}
