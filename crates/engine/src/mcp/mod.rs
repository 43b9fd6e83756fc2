//! Tool server speaking newline-delimited JSON-RPC 2.0.
//!
//! stdout carries protocol messages only; logs belong on stderr.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::tools::ToolRegistry;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Exposes a [`ToolRegistry`] to tool-calling clients.
pub struct ToolServer {
    registry: ToolRegistry,
    name: String,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
        }
    }

    /// Serve until the reader reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        tracing::info!(server = %self.name, "Tool server started");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        tracing::info!(server = %self.name, "Tool server stopped");
        Ok(())
    }

    /// Handle one JSON-RPC message. Notifications yield no response.
    pub async fn handle_message(&self, line: &str) -> Option<String> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                return Some(error_response(Value::Null, PARSE_ERROR, &format!("Parse error: {}", e)));
            }
        };

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            let id = request.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(id, INVALID_REQUEST, "Invalid request: missing method"));
        };

        let Some(id) = request.get("id").cloned() else {
            tracing::debug!(method, "Notification received");
            return None;
        };

        let params = request.get("params");
        metrics::counter!("mcp.requests", "method" => method.to_string()).increment(1);

        let response = match method {
            "initialize" => success_response(id, self.initialize_result()),
            "ping" => success_response(id, json!({})),
            "tools/list" => success_response(id, self.tools_list_result()),
            "tools/call" => self.handle_tools_call(id, params).await,
            other => error_response(id, METHOD_NOT_FOUND, &format!("Method not found: {}", other)),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": self.name,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list_result(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .definitions()
            .iter()
            .map(|def| {
                json!({
                    "name": def.name,
                    "description": def.description,
                    "inputSchema": def.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, id: Value, params: Option<&Value>) -> String {
        let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "Invalid params: 'name' is required");
        };
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let result = self.registry.execute(name, arguments).await;

        success_response(
            id,
            json!({
                "content": [{"type": "text", "text": result.content}],
                "isError": result.is_error,
            }),
        )
    }
}

fn success_response(id: Value, result: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
}

fn error_response(id: Value, code: i64, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message}
    })
    .to_string()
}
