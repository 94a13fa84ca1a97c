use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::signal;

use presence::errors::Report;
use presence::log;

mod clock;
mod config;
mod handlers;
mod network;
mod routes;
mod services;

use clock::{Clock, SystemClock};
use config::Config;
use network::SystemNetwork;
use services::SessionServiceInMemory;

/// Shared state handed to every handler.
pub struct AppState {
    pub sessions: SessionServiceInMemory,
    pub clock: Arc<dyn Clock>,
    pub started_at: DateTime<Utc>,
    pub author: String,
}

impl AppState {
    pub fn new(sessions: SessionServiceInMemory, clock: Arc<dyn Clock>, author: String) -> Self {
        Self {
            sessions,
            started_at: clock.now(),
            clock,
            author,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    // Setup logging
    presence::log::setup()?;

    let config = Config::from_env()?;
    log::debug!("Loaded configuration: {:?}", config);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sessions = SessionServiceInMemory::with_collaborators(
        config.timezone,
        clock.clone(),
        Arc::new(SystemNetwork),
    );
    let state = Arc::new(AppState::new(sessions, clock, config.author.clone()));
    let app = routes::setup_routes(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("Starting server on http://{}", listener.local_addr()?);
    log::info!("Session timestamps use the {} time zone", config.timezone);
    log::info!("Press Ctrl+C to stop the server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    log::info!("Shutting down server");

    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Signal received, starting graceful shutdown");
}
