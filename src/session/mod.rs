//! Session connection lifecycle.
//!
//! This module owns the connection state machine and the state it
//! publishes to the status page.
//!
//! # State Machine
//!
//! ```text
//!                 qr / code          open
//!  Connecting ───────────────► AwaitingPairing ──────► Connected
//!      │  ▲                          │  ▲ qr / code        │
//!      │  │                          └──┘                  │
//!      │  │ Recoverable                                    │
//!      ▼  │                    close(code)                 │
//!  Disconnected(reason) ◄─────────────────────────────────┘
//!      │
//!      └── LoggedOut (401) ──► LoggedOut (terminal)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SessionManagerBuilder`] |
//! | `manager` | [`SessionManager`] and its session loop |
//! | `policy` | [`ReconnectPolicy`] backoff schedule |
//! | `state` | Connection state, pairing artifacts, published status |

// ============================================================================
// Submodules
// ============================================================================

/// Builder for the session manager.
pub mod builder;

/// Session manager and supervisor loop.
pub mod manager;

/// Reconnect backoff.
pub mod policy;

/// Connection state and published status.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionManagerBuilder;
pub use manager::SessionManager;
pub use policy::ReconnectPolicy;
pub use state::{
    ConnectionState, DisconnectReason, LOGGED_OUT_STATUS, PairingArtifact, QrArtifact,
    StatusBoard, StatusSnapshot, StatusView, close_code_label,
};
