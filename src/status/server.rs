//! HTTP status page server.
//!
//! # Routes
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | HTML view of the current status |
//! | `GET /status` | The same snapshot as JSON |

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};

use axum::Router;
use axum::extract::State;
use axum::response::{Html, Json};
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::{StatusSnapshot, StatusView};

use super::page::render_html;

// ============================================================================
// StatusServer
// ============================================================================

/// A status page server that is bound but not yet serving.
///
/// Binding happens at startup so a taken port is reported before any
/// session is opened.
///
/// # Example
///
/// ```ignore
/// let server = StatusServer::bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000).await?;
/// server.serve(manager.status()).await?;
/// ```
#[derive(Debug)]
pub struct StatusServer {
    /// TCP listener for incoming requests.
    listener: TcpListener,
    /// Bound address.
    addr: SocketAddr,
}

impl StatusServer {
    /// Binds the status page to `ip:port`.
    ///
    /// Use port 0 to let the OS pick one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Status page bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves the page until the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the server fails.
    pub async fn serve(self, status: StatusView) -> Result<()> {
        info!(port = self.port(), "Status page available at http://localhost:{}", self.port());

        axum::serve(self.listener, router(status))
            .await
            .map_err(Error::from)
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn router(status: StatusView) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(snapshot))
        .with_state(status)
}

async fn index(State(status): State<StatusView>) -> Html<String> {
    Html(render_html(&status.snapshot()))
}

async fn snapshot(State(status): State<StatusView>) -> Json<StatusSnapshot> {
    Json(status.snapshot())
}

// ============================================================================
// Tests
// ============================================================================
