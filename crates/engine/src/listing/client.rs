use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;

use propsearch_common::config::{Credentials, SearchDefaults, SystemConfig, UpstreamConfig};
use propsearch_common::types::{ListingRecord, SearchCriteria, SearchResult, UpstreamPayload};
use propsearch_common::{PropSearchError, Result};

use super::normalize::normalize;

/// Listing API response body. Both fields may be missing or null.
#[derive(Deserialize)]
struct UpstreamResponse {
    #[serde(default)]
    data: Option<Vec<ListingRecord>>,
    #[serde(default)]
    cursor: Option<Value>,
}

/// Client for the listing API.
///
/// Each search is a single POST with no retry, backoff, or caching. The
/// client is cheap to share: configuration is immutable after construction.
#[derive(Clone)]
pub struct ListingClient {
    http: reqwest::Client,
    upstream: UpstreamConfig,
    defaults: SearchDefaults,
    credentials: Credentials,
}

impl ListingClient {
    pub fn new(system: &SystemConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("propsearch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PropSearchError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            upstream: system.upstream.clone(),
            defaults: system.search.clone(),
            credentials,
        })
    }

    /// The listing API key, or a configuration error when the server has none.
    pub fn ensure_credentials(&self) -> Result<&str> {
        self.credentials.api_key.as_deref().ok_or_else(|| {
            PropSearchError::Configuration("API_KEY environment variable not set on the server.".into())
        })
    }

    /// Normalize then fetch. Missing credentials are reported before any
    /// criteria validation, and invalid criteria never reach the network.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult> {
        self.ensure_credentials()?;
        let payload = normalize(criteria, &self.defaults)?;
        self.fetch(&payload, criteria.city.trim(), criteria.state.trim())
            .await
    }

    /// Issue one listing API call for an already-normalized payload.
    pub async fn fetch(
        &self,
        payload: &UpstreamPayload,
        city: &str,
        state: &str,
    ) -> Result<SearchResult> {
        let api_key = self.ensure_credentials()?;

        let url = search_url(&self.upstream.base_url, &self.credentials.tenant, city, state)?;
        let start = Instant::now();

        tracing::debug!(url = %url, size = payload.size, "Listing search started");

        let response = self
            .http
            .post(url)
            .header("apikey", api_key)
            .header("authorization", "")
            .header("company", &self.upstream.company)
            .header("tenant", &self.credentials.tenant)
            .header("user", &self.upstream.user)
            .timeout(Duration::from_secs(self.upstream.timeout_seconds))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("listing.api.errors", "kind" => "transport").increment(1);
                tracing::warn!(error = %e, city, state, "Listing API request failed");
                PropSearchError::Transport(e.to_string())
            })?;

        let status = response.status();
        metrics::histogram!("listing.api.latency").record(start.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                metrics::counter!("listing.api.errors", "kind" => "transport").increment(1);
                tracing::warn!(status = status.as_u16(), error = %e, "Listing API error body unreadable");
                PropSearchError::Transport(format!(
                    "listing API returned {} with an unreadable body: {}",
                    status.as_u16(),
                    e
                ))
            })?;
            metrics::counter!("listing.api.errors", "kind" => "status").increment(1);
            tracing::warn!(status = status.as_u16(), body = %body, "Listing API returned an error");
            return Err(PropSearchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            metrics::counter!("listing.api.errors", "kind" => "transport").increment(1);
            PropSearchError::Transport(e.to_string())
        })?;

        let parsed: UpstreamResponse = serde_json::from_slice(&bytes).map_err(|e| {
            metrics::counter!("listing.api.errors", "kind" => "parse").increment(1);
            PropSearchError::Transport(format!("malformed listing API response: {}", e))
        })?;

        let data = parsed.data.unwrap_or_default();

        if self.upstream.strict_records {
            for (index, record) in data.iter().enumerate() {
                record.validate_required().map_err(|e| {
                    metrics::counter!("listing.api.errors", "kind" => "parse").increment(1);
                    PropSearchError::Transport(format!("record {}: {}", index, e))
                })?;
            }
        }

        let result = SearchResult::new(data, parsed.cursor);

        metrics::counter!("listing.api.requests").increment(1);
        tracing::info!(
            city,
            state,
            count = result.count,
            has_more = result.cursor.is_some(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Listing search completed"
        );

        Ok(result)
    }
}

/// `{base}/tenant/{tenant}/city/{city}/state/{state}` with city and state
/// lower-cased and every segment percent-encoded.
pub fn search_url(base_url: &str, tenant: &str, city: &str, state: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| {
        PropSearchError::Configuration(format!("invalid upstream.base_url {:?}: {}", base_url, e))
    })?;

    let city = city.to_lowercase();
    let state = state.to_lowercase();

    url.path_segments_mut()
        .map_err(|_| {
            PropSearchError::Configuration(format!(
                "upstream.base_url {:?} cannot carry a path",
                base_url
            ))
        })?
        .pop_if_empty()
        .extend(["tenant", tenant, "city", city.as_str(), "state", state.as_str()]);

    Ok(url)
}
