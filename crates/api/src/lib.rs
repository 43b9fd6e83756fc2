//! HTTP surface for property search.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use propsearch_engine::extract::CriteriaExtractor;
use propsearch_engine::listing::ListingClient;

/// Shared application state accessible from axum handlers.
pub struct AppState {
    pub listing: ListingClient,
    pub extractor: CriteriaExtractor,
    /// None when no Prometheus recorder is installed (tests).
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route(
            "/properties",
            get(routes::get_properties).post(routes::post_properties),
        )
        .route("/properties/{id}", get(routes::get_property))
        .with_state(state)
}
