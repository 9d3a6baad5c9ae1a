//! HTTP server
//!
//! Serves the access check, reload and change-notification endpoints.

pub mod routes;

pub use routes::router;

use crate::config::ServerConfig;
use crate::service::{AccessGuard, ReloadHandle, RuleService};
use crate::stats::GuardStats;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<AccessGuard>,
    pub service: Arc<RuleService>,
    pub reloader: ReloadHandle,
    pub stats: Arc<GuardStats>,
}

/// Resolve the bind address from host and port
pub fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, std::net::AddrParseError> {
    format!("{}:{}", config.host, config.port).parse()
}

/// Run the HTTP server until Ctrl+C or `ct` is cancelled
///
/// The configured port is bound as is, with no fallback port.
pub async fn run_server(
    config: &ServerConfig,
    state: AppState,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let addr = bind_addr(config)?;
    let listener = TcpListener::bind(addr).await?;
    info!("Access check API listening on http://{}", listener.local_addr()?);

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
            _ = ct.cancelled() => {
                info!("Server cancelled");
            }
        }
    };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
