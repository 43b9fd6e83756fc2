use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use propsearch_common::config::ToolOutputMode;

use crate::listing::ListingClient;
use crate::llm::ToolDefinition;

/// Shared context available to all tool handlers.
pub struct ToolHandlerContext {
    pub listing: ListingClient,
    pub output: ToolOutputMode,
}

/// Outcome of a tool call as reported back to the calling client.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolExecutionResult {
    pub content: String,
    pub is_error: bool,
}

/// Handler function signature: takes args and context, returns JSON or an error string.
pub type ToolHandler = Arc<
    dyn Fn(
            Value,
            Arc<ToolHandlerContext>,
        ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>
        + Send
        + Sync,
>;

/// Registry of tool handlers with their schema definitions.
pub struct ToolRegistry {
    handlers: HashMap<String, ToolHandler>,
    definitions: Vec<ToolDefinition>,
    context: Arc<ToolHandlerContext>,
}

impl ToolRegistry {
    pub fn new(context: ToolHandlerContext) -> Self {
        Self {
            handlers: HashMap::new(),
            definitions: Vec::new(),
            context: Arc::new(context),
        }
    }

    /// Register a tool handler by name.
    pub fn register(&mut self, name: &str, handler: ToolHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Load tool definitions from the config-loaded schemas.
    /// Only schemas with a registered handler are advertised.
    pub fn load_definitions(&mut self, tool_schemas: &HashMap<String, Value>) -> Result<(), String> {
        let mut keys: Vec<&String> = tool_schemas.keys().collect();
        keys.sort();

        for key in keys {
            let definition = ToolDefinition::from_schema(&tool_schemas[key])
                .map_err(|e| format!("{} ({})", e, key))?;

            if !self.handlers.contains_key(&definition.name) {
                tracing::warn!(tool = %definition.name, "Tool schema has no handler, skipping");
                continue;
            }
            self.definitions.push(definition);
        }

        tracing::info!(tools = self.definitions.len(), "Loaded tool definitions");

        Ok(())
    }

    /// Tool definitions as advertised to clients.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute a tool call by name.
    pub async fn execute(&self, tool_name: &str, args: Value) -> ToolExecutionResult {
        let start = std::time::Instant::now();

        let Some(handler) = self.handlers.get(tool_name) else {
            tracing::warn!(tool = %tool_name, "Unknown tool called");
            metrics::counter!("tools.execution.errors", "tool" => tool_name.to_string())
                .increment(1);
            let mut available: Vec<&String> = self.handlers.keys().collect();
            available.sort();
            return ToolExecutionResult {
                content: format!(
                    "Unknown tool: '{}'. Available tools: {:?}",
                    tool_name, available
                ),
                is_error: true,
            };
        };

        tracing::info!(tool = %tool_name, "Tool call started");
        let result = handler(args, Arc::clone(&self.context)).await;

        let latency = start.elapsed().as_secs_f64();
        metrics::histogram!("tools.execution.latency", "tool" => tool_name.to_string())
            .record(latency);
        metrics::counter!("tools.execution.count", "tool" => tool_name.to_string()).increment(1);

        match result {
            Ok(value) => {
                let content = match value {
                    Value::String(text) => text,
                    other => serde_json::to_string_pretty(&other).unwrap_or_else(|e| {
                        format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
                    }),
                };
                tracing::info!(
                    tool = %tool_name,
                    latency_s = latency,
                    result_len = content.len(),
                    "Tool call succeeded"
                );
                ToolExecutionResult {
                    content,
                    is_error: false,
                }
            }
            Err(msg) => {
                tracing::warn!(tool = %tool_name, latency_s = latency, error = %msg, "Tool call failed");
                metrics::counter!("tools.execution.errors", "tool" => tool_name.to_string())
                    .increment(1);
                ToolExecutionResult {
                    content: msg,
                    is_error: true,
                }
            }
        }
    }
}
