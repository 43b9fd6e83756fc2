use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::{StructuredOutput, TokenUsage, ToolDefinition};
use super::{CallSettings, LlmError};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

// ---------------------------------------------------------------------------
// Request wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
    tools: [ChatTool<'a>; 1],
    tool_choice: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatTool<'a> {
    r#type: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

// ---------------------------------------------------------------------------
// Response wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    function: ChatToolCallFunction,
}

#[derive(Deserialize)]
struct ChatToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn build_request<'a>(
    settings: &'a CallSettings,
    system: &'a str,
    user: &'a str,
    tool: &'a ToolDefinition,
) -> ChatRequest<'a> {
    ChatRequest {
        model: &settings.model,
        max_tokens: settings.max_tokens,
        messages: [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
        tools: [ChatTool {
            r#type: "function",
            function: ChatFunction {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.input_schema,
            },
        }],
        tool_choice: json!({"type": "function", "function": {"name": tool.name}}),
        temperature: settings.temperature,
    }
}

/// Pull the forced function call's arguments out of a chat completion.
fn extract_arguments(resp: ChatResponse, tool_name: &str) -> Result<StructuredOutput, LlmError> {
    let usage = resp
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let call = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("Empty choices array".into()))?
        .message
        .tool_calls
        .into_iter()
        .find(|tc| tc.function.name == tool_name)
        .ok_or_else(|| LlmError::Parse(format!("No '{}' tool call in response", tool_name)))?;

    let input: Value = serde_json::from_str(&call.function.arguments)
        .map_err(|e| LlmError::Parse(format!("Tool arguments are not JSON: {}", e)))?;

    Ok(StructuredOutput { input, usage })
}

/// Ask an OpenAI chat model to answer by calling `tool`.
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
        .bearer_auth(api_key)
        .timeout(settings.timeout)
        .json(&build_request(settings, system, user, tool))
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    let status = response.status();
    metrics::histogram!("llm.api.latency", "provider" => "openai", "model" => settings.model.clone())
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
        let msg = serde_json::from_str::<OpenAiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(LlmError::Api(format!("{}: {}", status, msg)));
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse OpenAI response: {}", e)))?;

    let output = extract_arguments(body, &tool.name)?;

    metrics::counter!("llm.api.input_tokens", "provider" => "openai")
        .increment(output.usage.input_tokens);
    metrics::counter!("llm.api.output_tokens", "provider" => "openai")
        .increment(output.usage.output_tokens);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> CallSettings {
        CallSettings {
            model: "gpt-4o-mini".into(),
            max_tokens: 256,
            temperature: Some(0.0),
            timeout: Duration::from_secs(5),
        }
    }

    fn tool() -> ToolDefinition {
        ToolDefinition {
            name: "record_search_criteria".into(),
            description: "Record criteria".into(),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_request_forces_tool_choice() {
        let settings = settings();
        let tool = tool();
        let body = serde_json::to_value(build_request(&settings, "sys", "find homes", &tool)).unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], "record_search_criteria");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "find homes");
        assert_eq!(body["tools"][0]["type"], "function");
    }

    #[test]
    fn test_extracts_tool_arguments() {
        let json = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc123",
                        "type": "function",
                        "function": {
                            "name": "record_search_criteria",
                            "arguments": "{\"city\": \"Austin\", \"state\": \"TX\"}"
                        }
                    }]
                },
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20}
        }"#;

        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        let out = extract_arguments(resp, "record_search_criteria").unwrap();
        assert_eq!(out.input["city"], "Austin");
        assert_eq!(out.usage.input_tokens, 100);
    }

    #[test]
    fn test_text_only_answer_is_parse_error() {
        let json = r#"{
            "choices": [{"message": {"content": "Hello!"}, "finish_reason": "stop"}]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_arguments(resp, "record_search_criteria"),
            Err(LlmError::Parse(_))
        ));
    }
}
