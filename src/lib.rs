//! Status Reactor - single-account session keeper with status auto-reactions.
//!
//! This library keeps one messaging-network session alive on behalf of a
//! single account, reacts to every status broadcast it receives and
//! publishes the pairing state for an operator page.
//!
//! # Architecture
//!
//! The service drives an external transport through a WebSocket gateway:
//!
//! - **Session manager**: owns the connection state machine, persists
//!   credential rotations, decides between reconnecting and halting
//! - **Reactor**: filters the message stream down to status broadcasts and
//!   reacts to each one exactly once
//! - **Status page**: read-only view over the published state
//!
//! Key design principles:
//!
//! - Each transport session hands back its own lifecycle, message and
//!   credential streams; a reconnect abandons them all
//! - Published state has one writer (the manager) and lock-free readers
//! - A logout (close code 401) is terminal; every other close reconnects
//! - Credential rotations are durable before the transport is acknowledged
//!
//! # Quick Start
//!
//! ```no_run
//! use status_reactor::{FileCredentialStore, GatewayTransport, Result, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let url = "ws://127.0.0.1:8765".parse().expect("url");
//!     let manager = SessionManager::builder()
//!         .transport(GatewayTransport::new(url))
//!         .store(FileCredentialStore::open("./session")?)
//!         .build()?;
//!
//!     manager.start().await;
//!     println!("State: {}", manager.state());
//!
//!     manager.join().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Environment configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Request IDs, addresses and message keys |
//! | [`protocol`] | Gateway message types (internal) |
//! | [`reactor`] | Status broadcast filter and reactions |
//! | [`session`] | Connection state machine and published status |
//! | [`status`] | QR rendering and status page |
//! | [`store`] | Credential persistence |
//! | [`transport`] | Transport capability and gateway client |

// ============================================================================
// Modules
// ============================================================================

/// Environment configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Gateway protocol message types.
///
/// Internal module defining request/response/event structures.
pub mod protocol;

/// Inbound event filter and reactor.
pub mod reactor;

/// Session connection lifecycle.
///
/// Use [`SessionManager::builder()`] to create a configured manager.
pub mod session;

/// Status page and QR rendering.
pub mod status;

/// Credential persistence.
pub mod store;

/// Transport capability.
///
/// Internal module handling the gateway connection and event routing.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::Config;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{Jid, MessageKey, RequestId};

// Reactor types
pub use reactor::{ReactionOutcome, Reactor, SymbolPicker};

// Session types
pub use session::{
    ConnectionState, DisconnectReason, PairingArtifact, ReconnectPolicy, SessionManager,
    SessionManagerBuilder, StatusSnapshot, StatusView,
};

// Status page
pub use status::{PngDataUrlEncoder, QrEncoder, StatusServer};

// Storage
pub use store::{CredentialStore, FileCredentialStore, SessionCredentials};

// Transport
pub use transport::{GatewayTransport, SessionLink, Transport};
