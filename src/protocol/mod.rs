//! Gateway protocol message types.
//!
//! This module defines the JSON message format spoken between the local
//! end (this crate) and the transport gateway that owns the network
//! handshake, encryption and framing.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Gateway | Command request |
//! | `Response` | Gateway → Local | Command response |
//! | `Event` | Gateway → Local | Lifecycle, message, credential notification |
//! | `EventReply` | Local → Gateway | Credential persistence acknowledgement |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions and their parameter types |
//! | `event` | Event, EventReply and typed lifecycle/message events |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ClientIdentity, Command, MessageContent, ProtocolVersion, Reaction};
pub use event::{
    ConnectionPhase, Event, EventReply, GatewayEvent, LifecycleEvent, MessageEvent,
};
pub use request::{Request, Response, ResponseType};
