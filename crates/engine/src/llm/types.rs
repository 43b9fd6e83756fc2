use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition, as sent to an LLM or listed to a tool-calling client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Parse a `{name, description, input_schema}` schema document.
    pub fn from_schema(schema: &Value) -> Result<Self, String> {
        let field = |name: &str| {
            schema
                .get(name)
                .ok_or_else(|| format!("Tool schema missing '{}' field", name))
        };

        Ok(Self {
            name: field("name")?
                .as_str()
                .ok_or("Tool schema 'name' must be a string")?
                .to_string(),
            description: field("description")?
                .as_str()
                .ok_or("Tool schema 'description' must be a string")?
                .to_string(),
            input_schema: field("input_schema")?.clone(),
        })
    }
}

/// Arguments the model produced for a forced tool call.
#[derive(Clone, Debug)]
pub struct StructuredOutput {
    pub input: Value,
    pub usage: TokenUsage,
}

/// Token usage from a single API call.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
