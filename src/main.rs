use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use report_services::{config, logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting {} v{}", config.app_name, env!("CARGO_PKG_VERSION"));
    tracing::info!("Templates directory: {}", config.templates_dir.display());

    let addr = SocketAddr::new(config.host.parse()?, config.port);

    // Build application state and router
    let state = Arc::new(AppState::new(config));
    let app = routes::app(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
