use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use propsearch_common::api::properties::{
    PropertiesQuery, PropertiesRequest, PropertiesResponse, PropertyLookupQuery,
};
use propsearch_common::types::{ListingRecord, NumericArg, SearchCriteria};
use propsearch_common::PropSearchError;

use crate::error::{ApiError, Result};
use crate::AppState;

const NOT_SEARCH_MESSAGE: &str = "That doesn't look like a property search. \
Tell me a city and state, plus any price, bedroom or bathroom requirements.";

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "healthy" })),
    )
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// GET /properties: search from query-string criteria or a free-text `query`.
pub async fn get_properties(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<PropertiesQuery>, QueryRejection>,
) -> Result<Json<PropertiesResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (criteria, text) = query.into_parts();
    search(&state, criteria, text, "get").await
}

/// POST /properties: same as GET with a JSON body.
pub async fn post_properties(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<PropertiesRequest>, JsonRejection>,
) -> Result<Json<PropertiesResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text = request.query.filter(|q| !q.trim().is_empty());
    search(&state, request.criteria, text, "post").await
}

/// GET /properties/{id}: find one listing among a city's current results.
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<PropertyLookupQuery>, QueryRejection>,
) -> Result<Json<ListingRecord>> {
    let Query(lookup) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    metrics::counter!("api.requests", "route" => "property").increment(1);

    let criteria = SearchCriteria {
        size: lookup.size.map(NumericArg::Text),
        ..SearchCriteria::new(
            lookup.city.unwrap_or_default(),
            lookup.state.unwrap_or_default(),
        )
    };

    let result = state.listing.search(&criteria).await?;

    result
        .data
        .into_iter()
        .find(|record| record.id().as_deref() == Some(id.as_str()))
        .map(Json)
        .ok_or_else(|| {
            ApiError::from(PropSearchError::NotFound(format!(
                "listing '{}' in {}, {}",
                id,
                criteria.city.trim(),
                criteria.state.trim()
            )))
        })
}

/// Resolve the criteria to search, then search.
///
/// A free-text query is only interpreted when the caller did not give a full
/// location; explicit fields always win over extracted ones.
async fn search(
    state: &AppState,
    explicit: SearchCriteria,
    text: Option<String>,
    route: &'static str,
) -> Result<Json<PropertiesResponse>> {
    let start = Instant::now();
    metrics::counter!("api.requests", "route" => route).increment(1);

    // A server without listing credentials cannot serve any search, so the
    // extraction call is skipped too.
    state.listing.ensure_credentials()?;

    let (criteria, interpreted) = match text {
        Some(text) if !explicit.has_location() => {
            let extracted = state.extractor.extract(&text).await;
            if !extracted.is_search_request {
                tracing::info!(route, "Query is not a property search");
                return Ok(Json(PropertiesResponse::not_search(NOT_SEARCH_MESSAGE)));
            }
            let merged = explicit.overriding(extracted.criteria);
            (merged.clone(), Some(merged))
        }
        _ => (explicit, None),
    };

    let result = state.listing.search(&criteria).await?;

    metrics::histogram!("api.request.latency", "route" => route)
        .record(start.elapsed().as_secs_f64());
    tracing::info!(
        route,
        city = %criteria.city,
        state = %criteria.state,
        count = result.count,
        "Property search served"
    );

    let mut response = PropertiesResponse::success(result);
    response.interpreted = interpreted;
    Ok(Json(response))
}
