//! Run the dashboard until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::{
    config::Config,
    download::build_client,
    http::{create_router, AppState},
};

pub async fn serve(config: Config, bind: &str) -> Result<()> {
    let client = build_client(config.http_timeout())?;
    let state = Arc::new(AppState::new(config, client));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("could not bind `{bind}`"))?;
    tracing::info!(addr = %listener.local_addr()?, "dashboard listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
