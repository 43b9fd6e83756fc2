use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use propsearch_api::{router, AppState};
use propsearch_common::config::Credentials;
use propsearch_engine::config;
use propsearch_engine::extract::CriteriaExtractor;
use propsearch_engine::listing::ListingClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("PropSearch API starting");

    let config_dir = std::env::var("PROPSEARCH_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let engine_config = match config::load_config(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus metrics recorder");
            std::process::exit(1);
        }
    };

    let listing = match ListingClient::new(&engine_config.system, Credentials::from_env()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build listing client");
            std::process::exit(1);
        }
    };

    let extractor = CriteriaExtractor::from_config(&engine_config);
    tracing::info!(enabled = extractor.is_enabled(), "Natural-language extraction");

    let state = Arc::new(AppState {
        listing,
        extractor,
        metrics_handle: Some(metrics_handle),
    });

    let port: u16 = std::env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, port, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!(port, "PropSearch API listening");

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(error = %e, "HTTP server error");
        std::process::exit(1);
    }
}
