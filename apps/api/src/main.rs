mod blocks;
mod config;
mod errors;
mod export;
mod layout;
mod models;
mod preview;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::MetricLayoutBackend;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pager API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the layout backend shared by all preview sessions
    let backend = Arc::new(MetricLayoutBackend::new(config.frame_interval));
    let settings = config.session_settings();
    info!(
        usable_width_px = settings.geometry.usable_width_px(),
        usable_height_px = settings.geometry.usable_height_px(),
        settle_ms = settings.settle_delay.as_millis() as u64,
        "Page geometry: A4, {}mm margins",
        settings.geometry.margin_mm
    );

    // Build app state
    let state = AppState::new(config.clone(), backend);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
