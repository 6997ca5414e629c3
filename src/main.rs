use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use juryhub::{app, config::HubConfig, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "juryhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting jury hub...");

    let config = HubConfig::from_env();
    let addr = app::listen_addr(config.port);
    let state = Arc::new(AppState::new(config));

    // Failing to bind is the only fatal error
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("Server started on http://{} (LAN safe)", addr);

    if let Err(e) = app::serve(listener, state).await {
        tracing::error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
