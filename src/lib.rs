//! logdash -- operator dashboard for a log-analysis service.
//!
//! This crate provides the REST client for the upstream API, the event
//! aggregation pipeline, SVG chart rendering, and a small local dashboard
//! server that keeps a periodically refreshed snapshot on screen.

pub mod analysis;
pub mod api;
pub mod client;
pub mod config;
pub mod model;
pub mod poller;
pub mod render;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::client::ApiClient;
use crate::config::DashboardConfig;
use crate::poller::SnapshotPoller;
use crate::session::{AuthenticatedSource, Session};

/// Build an API client from configuration.
pub fn connect(config: &DashboardConfig) -> Result<ApiClient> {
    ApiClient::new(&config.api.base_url, config.api.timeout())
        .with_context(|| format!("failed to build API client for {}", config.api.base_url))
}

/// Start the dashboard: snapshot poller plus HTTP server. Runs until the
/// process receives Ctrl-C.
pub async fn serve(config: DashboardConfig) -> Result<()> {
    let addr: std::net::SocketAddr = config
        .dashboard
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.dashboard.bind))?;
    let client = connect(&config)?;
    let session = Session::new();

    if session.init(&client).await.is_none() && config.auth.credentials().is_none() {
        tracing::warn!("no service credentials configured; charts stay empty until someone logs in");
    }

    let source = AuthenticatedSource::new(client.clone(), session.clone(), config.auth.credentials());
    let poller = Arc::new(SnapshotPoller::new(
        source,
        session.clone(),
        config.params(),
        config.dashboard.per_page,
        config.dashboard.poll_interval(),
    ));
    let snapshot = poller.subscribe();
    let handle = poller.spawn();

    let upstream = config.api.base_url.clone();
    let app = api::router(api::state::AppState::new(snapshot, client, session, config));

    tracing::info!(%addr, %upstream, "logdash listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    handle.stop().await;
    served.context("dashboard server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
