//! Serve command - web front-end.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use super::predict::load_service;
use crate::api::{self, AppState};
use crate::config::Config;
use crate::telemetry;

/// Runs the web server until Ctrl+C / SIGTERM.
///
/// Fails before binding when the model cannot be loaded.
pub async fn run(cfg: &Config) -> Result<()> {
    let service = load_service(&cfg.model.artifact_path, cfg.limits)?;
    let state = AppState::new(Arc::new(service));
    let app = api::router(state, &cfg.server);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - the predictor will be accessible from the network. \
            Bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    info!(%addr, model = %cfg.model.artifact_path.display(), "starting solar power predictor");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
