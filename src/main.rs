use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use htmlshot::config::ServiceConfig;
use htmlshot::http::{self, AppState};
use htmlshot::ChromeRenderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::parse();

    let renderer = Arc::new(ChromeRenderer::new(config.chrome_path.clone()));
    let state = AppState::new(renderer, &config);
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    log::info!(
        "listening on {} (scratch dir {}, {} render slots)",
        config.bind_addr,
        config.scratch_dir().display(),
        config.render_slots()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("shutting down");
    }
}
