use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;

use archstor_api::{AppState, router};

use crate::config::AppConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on, overriding `server.bind`
    #[arg(long)]
    bind: Option<String>,
}

pub async fn run(args: ServeArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let backend = config.open_backend().await?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let app = router(AppState::new(backend.clone(), config.api_settings()));
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(
        address = %listener.local_addr()?,
        backend = backend.name(),
        "Serving object storage API"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
