//! Observer HTTP server lifecycle management.
//!
//! Provides [`start_server`], which binds a TCP port and runs the Axum
//! server until the process ends, and [`spawn_observer`], which binds
//! eagerly (so bind failures surface at startup) and serves on a
//! background task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the Observer server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Errors that can occur when starting or running the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Start the Observer HTTP server and serve until the process ends.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state).await
}

/// Bind the Observer server and serve it on a background task.
///
/// Binding happens before this returns, so configuration mistakes fail
/// fast; the serve loop itself runs detached for the process lifetime.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the TCP listener cannot bind.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<Result<(), ServerError>>, ServerError> {
    let listener = bind(config).await?;
    Ok(tokio::spawn(serve(listener, state)))
}

/// Bind the configured address.
async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Observer server listening");
    Ok(listener)
}

/// Run the Axum serve loop on an already-bound listener.
async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;
    Ok(())
}
