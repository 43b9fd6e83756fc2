use std::sync::Arc;

use serde_json::Value;

use propsearch_common::config::ToolOutputMode;
use propsearch_common::types::SearchCriteria;

use crate::listing::format_text;
use crate::tools::registry::{ToolHandler, ToolHandlerContext};

pub fn handler() -> ToolHandler {
    Arc::new(|args: Value, ctx: Arc<ToolHandlerContext>| {
        Box::pin(async move {
            let criteria: SearchCriteria =
                serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

            let result = ctx
                .listing
                .search(&criteria)
                .await
                .map_err(|e| format!("Failed to fetch properties: {}", e))?;

            match ctx.output {
                ToolOutputMode::Text => Ok(Value::String(format_text(
                    &result,
                    criteria.city.trim(),
                    criteria.state.trim(),
                ))),
                ToolOutputMode::Json => serde_json::to_value(&result)
                    .map_err(|e| format!("Failed to serialize result: {}", e)),
            }
        })
    })
}
