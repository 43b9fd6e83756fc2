use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::{StructuredOutput, TokenUsage, ToolDefinition};
use super::{CallSettings, LlmError};

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    tools: [&'a ToolDefinition; 1],
    tool_choice: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

fn build_request<'a>(
    settings: &'a CallSettings,
    system: &'a str,
    user: &'a str,
    tool: &'a ToolDefinition,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model: &settings.model,
        max_tokens: settings.max_tokens,
        system,
        messages: [UserMessage {
            role: "user",
            content: user,
        }],
        tools: [tool],
        tool_choice: json!({"type": "tool", "name": tool.name}),
        temperature: settings.temperature,
    }
}

fn extract_input(resp: MessagesResponse, tool_name: &str) -> Result<StructuredOutput, LlmError> {
    let input = resp
        .content
        .into_iter()
        .find_map(|block| match block {
            ResponseBlock::ToolUse { name, input } if name == tool_name => Some(input),
            _ => None,
        })
        .ok_or_else(|| LlmError::Parse(format!("No '{}' tool_use block in response", tool_name)))?;

    Ok(StructuredOutput {
        input,
        usage: TokenUsage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
        },
    })
}

/// Ask an Anthropic model to answer by calling `tool`.
pub async fn call_tool(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    settings: &CallSettings,
    system: &str,
    user: &str,
    tool: &ToolDefinition,
) -> Result<StructuredOutput, LlmError> {
    let start = std::time::Instant::now();

    let response = http
        .post(url)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .timeout(settings.timeout)
        .json(&build_request(settings, system, user, tool))
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    let status = response.status();
    metrics::histogram!("llm.api.latency", "provider" => "anthropic", "model" => settings.model.clone())
        .record(start.elapsed().as_secs_f64());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Auth(format!("{}: {}", status, body)));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(LlmError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let msg = serde_json::from_str::<AnthropicError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(LlmError::Api(format!("{}: {}", status, msg)));
    }

    let body: MessagesResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse Anthropic response: {}", e)))?;

    let output = extract_input(body, &tool.name)?;

    metrics::counter!("llm.api.input_tokens", "provider" => "anthropic")
        .increment(output.usage.input_tokens);
    metrics::counter!("llm.api.output_tokens", "provider" => "anthropic")
        .increment(output.usage.output_tokens);

    Ok(output)
}
