//! JSON-RPC 2.0 transport for the game tools.
//!
//! One request per line in, at most one response per line out.
//! Notifications never get a response; tool failures come back as a
//! successful JSON-RPC result flagged with `isError`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::{handle_tool_call, SharedState};
use crate::error::McpResult;

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes returned by the server.
pub mod codes {
    /// The line was not a JSON-RPC request.
    pub const PARSE_ERROR: i32 = -32700;
    /// No such method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// `tools/call` params missing or malformed.
    pub const INVALID_PARAMS: i32 = -32602;
    /// A response could not be encoded.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Incoming request or notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, "2.0".
    pub jsonrpc: String,
    /// Absent for notifications.
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method params, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing response. Exactly one of `result` or `error` is serialized.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// Echo of the request id.
    pub id: Value,
    /// Result or error.
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

/// Body of a response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcOutcome {
    /// Method succeeded.
    Result(Value),
    /// Method failed.
    Error(RpcError),
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct RpcError {
    /// One of [`codes`].
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl JsonRpcResponse {
    /// Successful response; a missing id is answered with `null`.
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or_default(),
            outcome: RpcOutcome::Result(result),
        }
    }

    /// Error response; a missing id is answered with `null`.
    pub fn fail(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or_default(),
            outcome: RpcOutcome::Error(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// The result value, if the call succeeded.
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            RpcOutcome::Result(value) => Some(value),
            RpcOutcome::Error(_) => None,
        }
    }

    /// The error object, if the call failed.
    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            RpcOutcome::Error(error) => Some(error),
            RpcOutcome::Result(_) => None,
        }
    }
}

/// Methods the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Initialize,
    Initialized,
    Cancelled,
    ListTools,
    CallTool,
    Ping,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "initialized" | "notifications/initialized" => Some(Self::Initialized),
            "notifications/cancelled" => Some(Self::Cancelled),
            "tools/list" => Some(Self::ListTools),
            "tools/call" => Some(Self::CallTool),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: &'static str,
    capabilities: Value,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

/// Params of a `tools/call` request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Text block inside a tool result.
#[derive(Debug, Serialize)]
pub struct TextContent {
    /// Always "text".
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The text.
    pub text: String,
}

/// Result of a `tools/call`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content blocks.
    pub content: Vec<TextContent>,
    /// Set when the tool failed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Successful result carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Failed result; the message is shown to the client as-is.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// Render a handler outcome, pretty-printing successful payloads.
    pub fn from_outcome(outcome: McpResult<Value>) -> Self {
        match outcome.map(|value| serde_json::to_string_pretty(&value)) {
            Ok(Ok(text)) => Self::text(text),
            Ok(Err(e)) => Self::failure(format!("Error: could not encode result: {}", e)),
            Err(e) => Self::failure(format!("Error: {}", e)),
        }
    }
}

/// MCP server speaking newline-delimited JSON-RPC.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a server over shared state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve on stdin/stdout until the client closes stdin.
    pub async fn run(&self) -> std::io::Result<()> {
        info!(
            games = self.state.registry.count(),
            "finquest MCP server listening on stdio"
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read from `reader`, writing responses to `writer`,
    /// until end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.respond(&line).await else {
                continue;
            };

            let encoded = serde_json::to_string(&response)?;
            debug!(response = %encoded, "Sending response");
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    async fn respond(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        debug!(request = %line, "Received request");

        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "Unparseable request line");
                Some(JsonRpcResponse::fail(
                    None,
                    codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Dispatch one request. Returns `None` when no response is owed.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(method) = Method::parse(&request.method) else {
            if request.is_notification() {
                debug!(method = %request.method, "Ignoring unknown notification");
                return None;
            }
            warn!(method = %request.method, "Unknown method");
            let message = format!("Method not found: {}", request.method);
            return Some(JsonRpcResponse::fail(
                request.id,
                codes::METHOD_NOT_FOUND,
                message,
            ));
        };

        match method {
            Method::Initialized | Method::Cancelled => {
                debug!(method = %request.method, "Notification received");
                None
            }
            Method::Initialize => Some(self.initialize(request.id)),
            Method::ListTools => Some(JsonRpcResponse::ok(
                request.id,
                json!({ "tools": tool_definitions() }),
            )),
            Method::Ping => Some(JsonRpcResponse::ok(request.id, json!({}))),
            Method::CallTool => Some(self.call_tool(request.id, request.params).await),
        }
    }

    fn initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!(protocol = PROTOCOL_VERSION, "Client initializing");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: ServerInfo {
                name: "finquest",
                version: env!("CARGO_PKG_VERSION"),
            },
        };
        encode(id, &result)
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::fail(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                )
            }
            None => return JsonRpcResponse::fail(id, codes::INVALID_PARAMS, "Missing params"),
        };

        debug!(tool = %params.name, "Calling tool");
        let outcome = handle_tool_call(&self.state, &params.name, params.arguments).await;
        if let Err(e) = &outcome {
            warn!(tool = %params.name, error = %e, "Tool call failed");
        }

        encode(id, &ToolCallResult::from_outcome(outcome))
    }
}

fn encode<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::ok(id, value),
        Err(e) => {
            warn!(error = %e, "Failed to encode result");
            JsonRpcResponse::fail(id, codes::INTERNAL_ERROR, format!("Internal error: {}", e))
        }
    }
}

/// Tool exposed through `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Name used in `tools/call`.
    pub name: &'static str,
    /// What the tool does.
    pub description: &'static str,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

/// One property of a tool's input object.
struct Field {
    name: &'static str,
    kind: &'static str,
    description: &'static str,
    required: bool,
}

impl Field {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: "string",
            description,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

const SESSION_ID: Field = Field::required("session_id", "Session ID returned by game_start");

impl Tool {
    fn new(name: &'static str, description: &'static str, fields: &[Field]) -> Self {
        let properties: Map<String, Value> = fields
            .iter()
            .map(|f| {
                (
                    f.name.to_string(),
                    json!({ "type": f.kind, "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();

        let mut input_schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false
        });
        if !required.is_empty() {
            input_schema["required"] = json!(required);
        }

        Self {
            name,
            description,
            input_schema,
        }
    }
}

/// All tools, in listing order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            "game_list",
            "List the registered financial-literacy games with their scenario counts.",
            &[],
        ),
        Tool::new(
            "game_validate",
            "Validate a game's scenario graph: unknown start, duplicate ids, choice counts and \
             dangling next-scenario references. Unreachable scenarios are reported as warnings.",
            &[
                Field::optional(
                    "game_id",
                    "string",
                    "Registered game to validate (all games when omitted)",
                ),
                Field::optional(
                    "definition",
                    "object",
                    "Inline game definition to validate instead of a registered game",
                ),
            ],
        ),
        Tool::new(
            "game_start",
            "Start a new persisted play session and return the first scenario.",
            &[Field::optional(
                "game_id",
                "string",
                "Game to play (the configured default when omitted)",
            )],
        ),
        Tool::new(
            "game_select",
            "Pick a choice in the current scenario. Returns the choice's score, trait impact \
             and time-horizon feedback.",
            &[
                SESSION_ID,
                Field::required("choice_id", "ID of a choice in the current scenario"),
            ],
        ),
        Tool::new(
            "game_advance",
            "Continue past the feedback. Returns the next scenario, or the end-of-game summary \
             when the last choice was terminal.",
            &[SESSION_ID],
        ),
        Tool::new(
            "game_undo",
            "Take back the most recent choice of an unfinished session.",
            &[SESSION_ID],
        ),
        Tool::new(
            "game_state",
            "Get the derived state of a session: path, choices, score and traits.",
            &[SESSION_ID],
        ),
        Tool::new(
            "game_resume",
            "Rebuild a session from its stored choice log and continue where it left off.",
            &[SESSION_ID],
        ),
    ]
}
