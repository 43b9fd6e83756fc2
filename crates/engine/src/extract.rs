//! Natural-language search criteria extraction.
//!
//! Best effort only: any failure degrades to the fallback criteria and a
//! non-search intent instead of surfacing an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use propsearch_common::types::{NumericArg, SearchCriteria};

use crate::config::EngineConfig;
use crate::llm::{LlmCaller, LlmClient, ToolDefinition};

/// Name of the forced tool the model answers through.
pub const EXTRACTION_TOOL: &str = "record_search_criteria";

/// Prompt file stem under `config/prompts/`.
pub const EXTRACTION_PROMPT: &str = "extract_criteria";

const DEFAULT_SYSTEM_PROMPT: &str = "You turn real-estate requests into search criteria. \
Always call record_search_criteria. Use two-letter US state codes and whole-dollar prices. \
Set is_search_request to false when the message is not asking to find properties.";

/// Criteria read from a free-text query, plus whether it was a search at all.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedQuery {
    pub criteria: SearchCriteria,
    pub is_search_request: bool,
}

impl ExtractedQuery {
    pub fn fallback() -> Self {
        Self {
            criteria: SearchCriteria::fallback(),
            is_search_request: false,
        }
    }
}

#[derive(Deserialize)]
struct ExtractionArgs {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    min_price: Option<NumericArg>,
    #[serde(default)]
    max_price: Option<NumericArg>,
    #[serde(default)]
    bedrooms: Option<NumericArg>,
    #[serde(default)]
    bathrooms: Option<NumericArg>,
    #[serde(default)]
    is_search_request: bool,
}

/// Turns free text into [`SearchCriteria`] via a hosted LLM.
pub struct CriteriaExtractor {
    llm: Option<Arc<dyn LlmCaller>>,
    system_prompt: String,
    tool: ToolDefinition,
}

impl CriteriaExtractor {
    pub fn new(llm: Option<Arc<dyn LlmCaller>>, system_prompt: Option<&str>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
            tool: extraction_tool(),
        }
    }

    /// Build from configuration. Extraction is disabled when no LLM role is
    /// configured or its API key is missing.
    pub fn from_config(config: &EngineConfig) -> Self {
        let llm = config.system.llm.extraction.as_ref().and_then(|role| {
            LlmClient::new(role, config.system.retry.llm_api.clone())
                .map(|client| Arc::new(client) as Arc<dyn LlmCaller>)
        });

        Self::new(llm, config.prompt(EXTRACTION_PROMPT))
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Extract criteria from `query`, falling back on any failure.
    pub async fn extract(&self, query: &str) -> ExtractedQuery {
        let Some(llm) = &self.llm else {
            tracing::warn!("No LLM configured for extraction, using fallback criteria");
            return ExtractedQuery::fallback();
        };

        let output = match llm.call_tool(&self.system_prompt, query, &self.tool).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Criteria extraction failed, using fallback criteria");
                metrics::counter!("extract.fallbacks", "reason" => "llm").increment(1);
                return ExtractedQuery::fallback();
            }
        };

        match interpret(output.input) {
            Ok(extracted) => {
                tracing::info!(
                    city = %extracted.criteria.city,
                    state = %extracted.criteria.state,
                    is_search_request = extracted.is_search_request,
                    "Extracted search criteria"
                );
                extracted
            }
            Err(reason) => {
                tracing::warn!(reason = %reason, "Malformed extraction output, using fallback criteria");
                metrics::counter!("extract.fallbacks", "reason" => "malformed").increment(1);
                ExtractedQuery::fallback()
            }
        }
    }
}

/// Validate the model's arguments; anything unusable is an error.
fn interpret(input: Value) -> Result<ExtractedQuery, String> {
    let args: ExtractionArgs =
        serde_json::from_value(input).map_err(|e| format!("invalid arguments: {}", e))?;

    let numbers = [
        (&args.min_price, "min_price"),
        (&args.max_price, "max_price"),
        (&args.bedrooms, "bedrooms"),
        (&args.bathrooms, "bathrooms"),
    ];
    for (value, field) in numbers {
        if let Some(v) = value {
            v.to_u64(field).map_err(|e| e.to_string())?;
        }
    }

    let criteria = SearchCriteria {
        city: args.city.unwrap_or_default().trim().to_string(),
        state: args.state.unwrap_or_default().trim().to_string(),
        country: args.country,
        min_price: args.min_price,
        max_price: args.max_price,
        bedrooms: args.bedrooms,
        bathrooms: args.bathrooms,
        size: None,
        cursor: None,
    };

    if !criteria.has_location() {
        return Err("missing city or state".into());
    }

    Ok(ExtractedQuery {
        criteria,
        is_search_request: args.is_search_request,
    })
}

fn extraction_tool() -> ToolDefinition {
    ToolDefinition {
        name: EXTRACTION_TOOL.into(),
        description: "Record the property search criteria found in the user's message.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name, e.g. Seattle"},
                "state": {"type": "string", "description": "Two-letter US state code, e.g. WA"},
                "country": {"type": "string", "description": "Country, always USA"},
                "min_price": {"type": "integer", "description": "Minimum price in dollars"},
                "max_price": {"type": "integer", "description": "Maximum price in dollars"},
                "bedrooms": {"type": "integer", "description": "Number of bedrooms"},
                "bathrooms": {"type": "integer", "description": "Number of bathrooms"},
                "is_search_request": {
                    "type": "boolean",
                    "description": "True when the user is asking to find properties"
                }
            },
            "required": ["city", "state", "is_search_request"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, StructuredOutput, TokenUsage};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Replays a canned answer and records the tool it was asked to call.
    struct MockLlm {
        answer: Mutex<Option<Result<Value, LlmError>>>,
        seen_tool: Mutex<Option<String>>,
    }

    impl MockLlm {
        fn new(answer: Result<Value, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(Some(answer)),
                seen_tool: Mutex::new(None),
            })
        }
    }

    impl LlmCaller for MockLlm {
        fn call_tool<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
            tool: &'a ToolDefinition,
        ) -> Pin<Box<dyn Future<Output = Result<StructuredOutput, LlmError>> + Send + 'a>> {
            *self.seen_tool.lock().unwrap() = Some(tool.name.clone());
            let answer = self
                .answer
                .lock()
                .unwrap()
                .take()
                .expect("mock called twice");
            Box::pin(async move {
                answer.map(|input| StructuredOutput {
                    input,
                    usage: TokenUsage::default(),
                })
            })
        }
    }

    fn extractor(mock: &Arc<MockLlm>) -> CriteriaExtractor {
        CriteriaExtractor::new(Some(Arc::clone(mock) as Arc<dyn LlmCaller>), None)
    }

    #[tokio::test]
    async fn test_extracts_criteria() {
        let mock = MockLlm::new(Ok(json!({
            "city": "Austin",
            "state": "TX",
            "max_price": 500000,
            "bedrooms": "3",
            "is_search_request": true
        })));

        let out = extractor(&mock).extract("3 bed homes in Austin under 500k").await;
        assert!(out.is_search_request);
        assert_eq!(out.criteria.city, "Austin");
        assert_eq!(out.criteria.max_price, Some(NumericArg::from(500000u64)));
        assert_eq!(out.criteria.bedrooms, Some(NumericArg::from("3")));
        assert_eq!(mock.seen_tool.lock().unwrap().as_deref(), Some(EXTRACTION_TOOL));
    }

    #[tokio::test]
    async fn test_non_search_intent_is_kept() {
        let mock = MockLlm::new(Ok(json!({
            "city": "",
            "state": "",
            "is_search_request": false
        })));

        let out = extractor(&mock).extract("hello there").await;
        assert_eq!(out, ExtractedQuery::fallback());

        let mock = MockLlm::new(Ok(json!({
            "city": "Denver",
            "state": "CO",
            "is_search_request": false
        })));
        let out = extractor(&mock).extract("is Denver nice?").await;
        assert!(!out.is_search_request);
        assert_eq!(out.criteria.city, "Denver");
    }

    #[tokio::test]
    async fn test_llm_error_falls_back() {
        let mock = MockLlm::new(Err(LlmError::Http("connection refused".into())));
        let out = extractor(&mock).extract("homes in Denver").await;
        assert_eq!(out, ExtractedQuery::fallback());
        assert_eq!(out.criteria.city, "Seattle");
        assert_eq!(out.criteria.state, "WA");
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let mock = MockLlm::new(Ok(json!({
            "city": "Denver",
            "state": "CO",
            "min_price": "cheap",
            "is_search_request": true
        })));
        assert_eq!(extractor(&mock).extract("cheap homes in Denver").await, ExtractedQuery::fallback());

        let mock = MockLlm::new(Ok(json!({"city": 12, "is_search_request": true})));
        assert_eq!(extractor(&mock).extract("?").await, ExtractedQuery::fallback());
    }

    #[tokio::test]
    async fn test_search_without_location_falls_back() {
        let mock = MockLlm::new(Ok(json!({"city": "Denver", "state": " ", "is_search_request": true})));
        assert_eq!(extractor(&mock).extract("homes in Denver").await, ExtractedQuery::fallback());
    }

    #[tokio::test]
    async fn test_disabled_extractor_falls_back() {
        let extractor = CriteriaExtractor::new(None, None);
        assert!(!extractor.is_enabled());
        assert_eq!(extractor.extract("anything").await, ExtractedQuery::fallback());
    }
}
