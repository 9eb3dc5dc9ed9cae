//! Operator-facing status page.
//!
//! A read-only view over the [`StatusView`](crate::session::StatusView)
//! published by the session manager, plus the QR renderer used to turn
//! pairing payloads into images.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `page` | HTML rendering |
//! | `qr` | [`QrEncoder`] and the PNG data URL encoder |
//! | `server` | axum server for `/` and `/status` |

// ============================================================================
// Submodules
// ============================================================================

/// HTML rendering.
pub mod page;

/// QR rendering.
pub mod qr;

/// HTTP server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use page::render_html;
pub use qr::{PNG_DATA_URL_PREFIX, PngDataUrlEncoder, QrEncoder};
pub use server::StatusServer;
