use serde::{Deserialize, Serialize};

/// Tenant used when `TENANT` is not set.
pub const DEFAULT_TENANT: &str = "shopprop";

/// Top-level system configuration, deserialized from system.toml.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub search: SearchDefaults,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retry: RetryDefaults,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Connection settings for the listing API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL; the `/tenant/{tenant}/city/{city}/state/{state}` path is appended.
    pub base_url: String,
    /// Value of the `company` header.
    #[serde(default = "default_company")]
    pub company: String,
    /// Value of the `user` header.
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Reject responses whose records lack an address or price.
    #[serde(default)]
    pub strict_records: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mz5wkrw9e4.execute-api.us-east-1.amazonaws.com/property_listing_service/prod/public".into(),
            company: default_company(),
            user: default_user(),
            timeout_seconds: default_timeout_seconds(),
            strict_records: false,
        }
    }
}

fn default_company() -> String {
    DEFAULT_TENANT.into()
}

fn default_user() -> String {
    "test".into()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Constant parts of every upstream search payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchDefaults {
    /// Page size sent when the caller does not provide one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default)]
    pub image_count: u32,
    /// Fields requested from the listing API.
    #[serde(default = "default_output_fields")]
    pub output_fields: Vec<String>,
    /// Data-source (MLS) identifiers the listing API may return records from.
    #[serde(default = "default_allowed_mls")]
    pub allowed_mls: Vec<String>,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            image_count: 0,
            output_fields: default_output_fields(),
            allowed_mls: default_allowed_mls(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_output_fields() -> Vec<String> {
    [
        "area",
        "price",
        "bedroom",
        "bathroom",
        "property_descriptor",
        "location",
        "has_open_house",
        "virtual_url",
        "address",
        "status",
        "openhouse_latest_value",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_mls() -> Vec<String> {
    [
        "ARMLS",
        "ACTRISMLS",
        "BAREISMLS",
        "CRMLS",
        "CENTRALMLS",
        "MLSLISTINGS",
        "NWMLS",
        "NTREISMLS",
        "shopprop",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// LLM configuration for natural-language criteria extraction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// None disables extraction; queries then fall back to default criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<LlmRoleConfig>,
}

/// Configuration for a single LLM role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRoleConfig {
    /// Provider name ("anthropic" or "openai").
    pub provider: String,
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Max tokens in the response.
    pub max_tokens: u32,
    /// Temperature (0.0 to 2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default = "default_llm_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_llm_timeout_seconds() -> u64 {
    20
}

/// Retry parameters. The listing API is never retried; only LLM calls are.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryDefaults {
    pub llm_api: RetryConfig,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            llm_api: RetryConfig {
                max_attempts: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 4_000,
                backoff_multiplier: 2.0,
            },
        }
    }
}

/// Retry configuration for a specific target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

/// Tool-calling surface settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub output: ToolOutputMode,
}

/// How `search_properties` renders its result for the agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutputMode {
    /// Human-readable listing summary.
    #[default]
    Text,
    /// JSON-encoded SearchResult.
    Json,
}

/// Secrets and tenant identity, read from the environment once at startup.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Listing API key. Absence is reported on every search, never defaulted.
    pub api_key: Option<String>,
    pub tenant: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            tenant: tenant.into(),
        }
    }

    /// Read `API_KEY` and `TENANT`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("API_KEY not set, property searches will fail until it is provided");
        }

        let tenant = std::env::var("TENANT")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TENANT.to_string());

        Self { api_key, tenant }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_output_mode_parses_lowercase() {
        let cfg: ToolsConfig = serde_json::from_str(r#"{"output": "json"}"#).unwrap();
        assert_eq!(cfg.output, ToolOutputMode::Json);

        let cfg: ToolsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.output, ToolOutputMode::Text);
    }

    #[test]
    fn test_upstream_defaults_fill_missing_fields() {
        let cfg: UpstreamConfig =
            serde_json::from_str(r#"{"base_url": "http://localhost:9000"}"#).unwrap();
        assert_eq!(cfg.company, "shopprop");
        assert_eq!(cfg.user, "test");
        assert_eq!(cfg.timeout_seconds, 30);
        assert!(!cfg.strict_records);
    }

    #[test]
    fn test_search_defaults_match_reference_payload() {
        let d = SearchDefaults::default();
        assert_eq!(d.default_page_size, 10);
        assert_eq!(d.image_count, 0);
        assert_eq!(d.output_fields.len(), 11);
        assert!(d.allowed_mls.contains(&"NWMLS".to_string()));
        assert!(d.allowed_mls.contains(&"shopprop".to_string()));
    }

    #[test]
    fn test_partial_search_section_keeps_other_defaults() {
        let cfg: SearchDefaults = serde_json::from_str(r#"{"default_page_size": 25}"#).unwrap();
        assert_eq!(cfg.default_page_size, 25);
        assert_eq!(cfg.image_count, 0);
        assert_eq!(cfg.output_fields, SearchDefaults::default().output_fields);
        assert_eq!(cfg.allowed_mls.len(), 9);
    }
}
