use clap::{Args, Subcommand};
use pagerduty_mcp_core::envelope::{DEFAULT_MAX_BYTES, DEFAULT_MAX_CHARS};
use pagerduty_mcp_core::{
    EnvelopeBuilder, PagerDuty, PagerDutyApi, PrincipalProvider, ResponseLimits, ScopeResolver,
};
use serde_json::{Map, Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use uuid::Uuid;

mod rest;
mod tools;
mod util;

#[cfg(test)]
mod testing;

pub use rest::RestClient;
pub use util::{StartupError, config_path, resolve_token};

use tools::{DOCS_URI, tool_definitions, tool_documentation};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "pagerduty-mcp";

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the PagerDuty MCP server over stdio
    Serve(McpServeArgs),
    /// Resolve the current user's teams, services and escalation policies and print them
    Scope(McpScopeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpServeArgs {
    /// PagerDuty REST API token (otherwise read from the config file)
    #[arg(long, env = "PAGERDUTY_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Largest serialized record list, in characters, returned by a tool
    #[arg(long, env = "PAGERDUTY_MCP_RESPONSE_CHAR_LIMIT", default_value_t = DEFAULT_MAX_CHARS)]
    pub response_char_limit: usize,
    /// Largest serialized record list, in bytes, returned by a tool
    #[arg(long, env = "PAGERDUTY_MCP_RESPONSE_BYTE_LIMIT", default_value_t = DEFAULT_MAX_BYTES)]
    pub response_byte_limit: usize,
}

#[derive(Args, Clone, Debug)]
pub struct McpScopeArgs {
    /// PagerDuty REST API token (otherwise read from the config file)
    #[arg(long, env = "PAGERDUTY_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

pub async fn run(api_url: &str, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let limits = ResponseLimits {
                max_chars: args.response_char_limit,
                max_bytes: args.response_byte_limit,
            };
            let server = match connect(api_url, args.token.as_deref()) {
                Ok(client) => McpServer::new(PagerDuty::new(client, EnvelopeBuilder::new(limits))),
                Err(err) => return startup_failure(&err),
            };
            tracing::info!(
                api_url,
                session_id = %server.session_id,
                max_chars = limits.max_chars,
                max_bytes = limits.max_bytes,
                "starting MCP server on stdio"
            );
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Scope(args) => {
            let client = match connect(api_url, args.token.as_deref()) {
                Ok(client) => client,
                Err(err) => return startup_failure(&err),
            };
            let resolution = ScopeResolver::new(&client).resolve().await;
            let payload = serde_json::to_value(&resolution).unwrap_or_default();
            println!("{}", to_pretty_json(&payload));
            if resolution.is_complete() { 0 } else { 2 }
        }
    }
}

fn connect(api_url: &str, token: Option<&str>) -> Result<RestClient, StartupError> {
    let token = resolve_token(token)?;
    RestClient::new(api_url, token)
}

fn startup_failure(err: &StartupError) -> i32 {
    let payload = json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    eprintln!("{}", to_pretty_json(&payload));
    1
}

struct McpServer<C> {
    pagerduty: PagerDuty<C>,
    session_id: String,
}

impl<C> McpServer<C>
where
    C: PagerDutyApi + PrincipalProvider,
{
    fn new(pagerduty: PagerDuty<C>) -> Self {
        Self {
            pagerduty,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    async fn serve_stdio(&self) -> Result<(), String> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(&mut reader, &mut stdout).await
    }

    async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let incoming = read_framed_json(reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(incoming) = incoming else {
                break;
            };

            let responses = self.handle_incoming_message(incoming).await;
            for response in responses {
                write_framed_json(writer, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        tracing::info!(session_id = %self.session_id, "client closed stdin, shutting down");
        Ok(())
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A response to nothing we sent; the server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            tracing::debug!(method, "ignoring notification");
            None
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(self.resources_list_payload()),
            "resources/read" => self.handle_resources_read(params),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        let instructions = format!(
            "PagerDuty MCP server v{}. Read the `{DOCS_URI}` resource before calling any tool: \
it documents the argument rules each tool enforces. Tools with `current_user_context` default \
to the caller's own teams, services and escalation policies; pass `current_user_context: false` \
with explicit IDs to look elsewhere. Results over the size limit come back as LIMIT_EXCEEDED; \
narrow the filters and retry.",
            env!("CARGO_PKG_VERSION")
        );
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "resources": {
                    "listChanged": false
                },
                "prompts": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": instructions
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = tool_definitions()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call field 'arguments' must be an object",
                ));
            }
        };

        tracing::info!(session_id = %self.session_id, tool = name, "tool call");
        match tools::call_tool(&self.pagerduty, name, &args).await {
            Ok(envelope) => Ok(build_tool_call_response(envelope, false)),
            Err(err) => {
                tracing::warn!(tool = name, error = err.code(), "tool call failed");
                Ok(build_tool_call_response(err.to_value(), true))
            }
        }
    }

    fn resources_list_payload(&self) -> Value {
        json!({
            "resources": [
                {
                    "uri": DOCS_URI,
                    "name": "Tool documentation",
                    "description": "Arguments and argument rules for every PagerDuty tool.",
                    "mimeType": "text/markdown"
                }
            ]
        })
    }

    fn handle_resources_read(&self, params: Value) -> Result<Value, RpcError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("resources/read requires string field 'uri'"))?;

        if uri != DOCS_URI {
            return Err(RpcError::invalid_params(format!("Unknown resource: {uri}"))
                .with_data(json!({ "available": [DOCS_URI] })));
        }
        Ok(json!({
            "contents": [
                {
                    "uri": DOCS_URI,
                    "mimeType": "text/markdown",
                    "text": tool_documentation()
                }
            ]
        }))
    }
}

fn build_tool_call_response(envelope: Value, is_error: bool) -> Value {
    let mut payload = json!({
        "content": [
            {
                "type": "text",
                "text": to_pretty_json(&envelope)
            }
        ],
        "structuredContent": envelope
    });
    if is_error {
        payload["isError"] = Value::Bool(true);
    }
    payload
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, err: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": err.code,
            "message": err.message
        }
    });
    if let Some(data) = err.data {
        payload["error"]["data"] = data;
    }
    payload
}

async fn read_framed_json<R>(reader: &mut R) -> Result<Option<Value>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        if line == "\r\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let json: Value = serde_json::from_slice(&payload).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Invalid JSON payload: {e}"),
        )
    })?;
    Ok(Some(json))
}

async fn write_framed_json<W>(writer: &mut W, value: &Value) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
