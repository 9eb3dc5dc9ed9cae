//! Status reactor service.
//!
//! Keeps one messaging session alive, reacts to every status update and
//! serves the pairing page on `PORT`.

use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;

use status_reactor::{
    Config, FileCredentialStore, GatewayTransport, Reactor, SessionManager, StatusServer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Installs the log subscriber. `RUST_LOG` wins over `debug`.
fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            "status_reactor=debug"
        } else {
            "status_reactor=info"
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();
    init_logging(config.as_ref().is_ok_and(|c| c.debug));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = match FileCredentialStore::open(&config.session_dir) {
        Ok(store) => store,
        Err(e) => {
            error!(dir = %config.session_dir.display(), error = %e, "Cannot use session directory");
            return ExitCode::FAILURE;
        }
    };

    let server = match StatusServer::bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port).await {
        Ok(server) => server,
        Err(e) => {
            error!(port = config.port, error = %e, "Cannot bind status page port");
            return ExitCode::FAILURE;
        }
    };

    let reactor = match Reactor::new().with_symbols(config.reaction_symbols.clone()) {
        Ok(reactor) => reactor,
        Err(e) => {
            error!(error = %e, "Invalid reaction symbols");
            return ExitCode::FAILURE;
        }
    };

    let manager = match SessionManager::builder()
        .transport(GatewayTransport::new(config.gateway_url.clone()))
        .store(store)
        .reactor(reactor)
        .build()
    {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "Cannot build session manager");
            return ExitCode::FAILURE;
        }
    };

    info!(
        gateway = %config.gateway_url,
        session_dir = %config.session_dir.display(),
        "Status reactor starting"
    );

    manager.start().await;

    let page = tokio::spawn(server.serve(manager.status()));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutting down");
        }
        result = page => {
            match result {
                Ok(Err(e)) => error!(error = %e, "Status page stopped"),
                Err(e) => error!(error = %e, "Status page task failed"),
                Ok(Ok(())) => {}
            }
            manager.shutdown();
            return ExitCode::FAILURE;
        }
    }

    manager.shutdown();
    ExitCode::SUCCESS
}
