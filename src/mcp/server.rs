//! MCP server: exposes the tool registry over line-delimited JSON-RPC on
//! stdin/stdout.

use crate::mcp::protocol::*;
use crate::tools::ToolRegistry;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2024-11-05";

pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let mut reader = BufReader::new(stdin);
        let mut writer = BufWriter::new(stdout);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    let response =
                        JsonRpcResponse::error(None, -32700, &format!("Parse error: {}", e));
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let response = self.handle_request(&request).await;
            write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            "resources/list" => {
                JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "resources": [] }))
            }
            "prompts/list" => {
                JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "prompts": [] }))
            }
            _ => JsonRpcResponse::error(
                request.id.clone(),
                -32601,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let result = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": { "subscribe": false },
                "prompts": {}
            },
            "serverInfo": {
                "name": "ragline",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(request.id.clone(), result)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = self
            .tools
            .list_names()
            .into_iter()
            .filter_map(|name| self.tools.get(&name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters(),
            })
            .collect();

        JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let name = request
            .params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let arguments = request
            .params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        let result = match self.tools.get(name) {
            Some(tool) => tool.call(arguments).await,
            None => Err(anyhow::anyhow!("Unknown tool: {}", name)),
        };

        let tool_result = match result {
            Ok(output) => ToolResult::text(output),
            Err(e) => ToolResult::error(format!("Error: {}", e)),
        };

        JsonRpcResponse::success(
            request.id.clone(),
            serde_json::to_value(tool_result).unwrap_or(serde_json::Value::Null),
        )
    }
}

async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{query_arg, query_schema, Tool};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase the query."
        }

        fn parameters(&self) -> Value {
            query_schema("Text to uppercase")
        }

        async fn call(&self, args: Value) -> anyhow::Result<String> {
            Ok(query_arg(&args).unwrap_or_default().to_uppercase())
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        McpServer::new(registry)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = server().handle_request(&request("initialize", json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "ragline");
    }

    #[tokio::test]
    async fn tools_list_exposes_registered_tools() {
        let response = server().handle_request(&request("tools/list", json!({}))).await;
        let result = response.result.unwrap();
        assert_eq!(result["tools"][0]["name"], "upper");
        assert_eq!(
            result["tools"][0]["inputSchema"]["required"][0],
            "query"
        );
    }

    #[tokio::test]
    async fn tools_call_runs_the_tool() {
        let response = server()
            .handle_request(&request(
                "tools/call",
                json!({"name": "upper", "arguments": {"query": "hi"}}),
            ))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "HI");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let response = server()
            .handle_request(&request("tools/call", json!({"name": "nope", "arguments": {}})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn unknown_method_is_a_jsonrpc_error() {
        let response = server().handle_request(&request("frobnicate", json!({}))).await;
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
