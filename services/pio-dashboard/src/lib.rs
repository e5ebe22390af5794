//! Pio Dashboard - web dashboard for a bioreactor cluster
//!
//! Talks to the cluster leader's REST backend and serves server-rendered
//! pages for experiment logs, calibrations and experiment profiles.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod ini;
pub mod io;
pub mod models;
pub mod pages;
pub mod profile;
pub mod scope;
pub mod sessions;
pub mod settings;
pub mod task;
pub mod template;
pub mod views;

pub use config::{load_config, Config};
pub use error::{DashboardError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::BackendClient;
use crate::dashboard::DashboardState;
use crate::io::ReqwestHttpClient;
use crate::settings::SettingsStore;

/// Backend client for the configured leader
pub fn backend_client(config: &Config) -> Result<BackendClient> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(
        config.backend.request_timeout(),
    )?);
    Ok(BackendClient::new(config.backend.base_url.clone(), http))
}

/// Run the dashboard server with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let client = backend_client(&config)?;
    let settings = settings::new_settings_handle(SettingsStore::open(&config.settings.path));
    let cancel = CancellationToken::new();

    let state = DashboardState::new(client, settings, &config, cancel.clone());

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let router = dashboard::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.dashboard.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Dashboard listening on http://{} (backend {})",
        addr,
        config.backend.base_url
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!("Dashboard stopped");
    Ok(())
}
