//! seventeentrack-sensors - 17track.net package summary sensors
//!
//! Polls the 17track account summary for every configured account and
//! exposes per-status package counts over a small HTTP API.

mod api;
mod config;
mod coordinator;
mod entries;
mod error;
mod flow;
mod integration;
mod issues;
mod models;
mod notify;
mod sensor;
mod seventeentrack;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::entries::ConfigEntries;
use crate::integration::AppState;
use crate::issues::IssueRegistry;
use crate::notify::DiscordNotifier;
use crate::seventeentrack::{ClientFactory, SeventeenTrackClient, SeventeenTrackError, TrackingApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seventeentrack_sensors=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting seventeentrack-sensors...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Configuration loaded (scan interval: {}s)",
        config.polling.scan_interval_secs
    );

    let entries = if config.storage.entries_path.is_empty() {
        tracing::warn!("storage.entries_path is empty, entries will not survive a restart");
        Arc::new(ConfigEntries::in_memory())
    } else {
        Arc::new(ConfigEntries::load(&config.storage.entries_path).await?)
    };
    tracing::info!(
        "Loaded {} config entries from {}",
        entries.list().await.len(),
        config.storage.entries_path
    );

    let notifier = config
        .discord
        .as_ref()
        .map(|d| Arc::new(DiscordNotifier::new(Some(d.webhook_url.clone()))));
    let issues = Arc::new(IssueRegistry::new(notifier));

    let api_config = config.api.clone();
    let client_factory: ClientFactory = Arc::new(move || {
        let client: Arc<dyn TrackingApi> = Arc::new(SeventeenTrackClient::new(&api_config)?);
        Ok::<_, SeventeenTrackError>(client)
    });

    let state = AppState::new(entries, issues, client_factory, config.scan_interval());

    // Bring up stored entries, then the legacy config block (once)
    let loaded = state.setup_all().await;
    tracing::info!("{} entries loaded", loaded);

    if let Some(legacy) = &config.seventeentrack {
        tracing::warn!("Static `seventeentrack` config block is deprecated, importing it");
        if let Err(e) = state.import_legacy(legacy).await {
            tracing::error!("Legacy config import failed: {}", e);
        }
    }

    // Build application router
    let app = api::routes().with_state(state.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
