//! MCP protocol server.
//!
//! One [`McpServer`] is created per session by a [`ServerFactory`] and
//! connected to that session's transport. It answers the MCP lifecycle and
//! tool methods and knows nothing about HTTP or session routing.
//!
//! # Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | Negotiated version, capabilities, server info |
//! | `ping` | `{}` |
//! | `tools/list` | Registered tools in registration order |
//! | `tools/call` | Tool output, errors reported in-band |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::transport::StreamableHttpTransport;

use super::message::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, error_codes,
};

// ============================================================================
// Constants
// ============================================================================

/// Protocol versions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Version answered when the client asks for one we do not support.
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

// ============================================================================
// ServerFactory
// ============================================================================

/// Produces a fresh protocol server for every new session.
///
/// Receives the headers of the request that opened the session.
pub trait ServerFactory: Send + Sync + 'static {
    /// Builds the server, registering its tools.
    fn make_server(&self, headers: &HeaderMap) -> McpServer;
}

impl<F> ServerFactory for F
where
    F: Fn(&HeaderMap) -> McpServer + Send + Sync + 'static,
{
    fn make_server(&self, headers: &HeaderMap) -> McpServer {
        self(headers)
    }
}

// ============================================================================
// Tools
// ============================================================================

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

impl Content {
    /// Creates a text block.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Output blocks.
    pub content: Vec<Content>,
    /// Set when the tool failed; the content then describes the failure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful output with a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Failed output carrying the error text.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }
}

/// Context handed to a tool on every call.
#[derive(Clone)]
pub struct ToolContext {
    session_id: Option<SessionId>,
    peer: Option<Weak<StreamableHttpTransport>>,
}

impl ToolContext {
    /// Context with no session, for calling tools outside a transport.
    #[must_use]
    pub fn detached(session_id: Option<SessionId>) -> Self {
        Self {
            session_id,
            peer: None,
        }
    }

    /// Session the call belongs to.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Sends a `notifications/message` log entry to the client's standalone
    /// stream.
    ///
    /// Returns `false` if no stream is open.
    pub fn log(&self, level: &str, data: impl Into<Value>) -> bool {
        let Some(transport) = self.peer.as_ref().and_then(Weak::upgrade) else {
            return false;
        };
        transport.send_notification(JsonRpcNotification::new(
            "notifications/message",
            Some(json!({ "level": level, "data": data.into() })),
        ))
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Implementation behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool.
    ///
    /// Errors are reported to the client as an `isError` result, not as a
    /// JSON-RPC error.
    async fn call(&self, ctx: ToolContext, arguments: Value) -> Result<ToolOutput>;
}

/// A tool definition and its handler.
#[derive(Clone)]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub input_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    /// Creates a tool.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Handler invoked by `tools/call`.
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    fn descriptor(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// McpServer
// ============================================================================

/// Per-session MCP server.
pub struct McpServer {
    name: String,
    version: String,
    instructions: Option<String>,
    tools: Vec<Tool>,
    peer: OnceLock<Weak<StreamableHttpTransport>>,
}

impl fmt::Debug for McpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl McpServer {
    /// Creates a server with no tools.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
            tools: Vec::new(),
            peer: OnceLock::new(),
        }
    }

    /// Sets the instructions returned from `initialize`.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Registers a tool. A later tool with the same name replaces the earlier.
    #[must_use]
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.retain(|existing| existing.name != tool.name);
        self.tools.push(tool);
        self
    }

    /// Returns the registered tool names in order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Binds this server to its transport.
    ///
    /// Only the first call has an effect.
    pub(crate) fn connect(&self, transport: &Arc<StreamableHttpTransport>) {
        let _ = self.peer.set(Arc::downgrade(transport));
    }

    fn context(&self) -> ToolContext {
        let peer = self.peer.get().cloned();
        let session_id = peer
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|t| t.session_id());
        ToolContext { session_id, peer }
    }
}

// ============================================================================
// McpServer - Dispatch
// ============================================================================

impl McpServer {
    /// Answers one request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        trace!(method = %request.method, id = %request.id, "Dispatching request");

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let outcome = match method.as_str() {
            "initialize" => Ok(self.initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(Some(id), error),
        }
    }

    /// Accepts a notification.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => debug!(server = %self.name, "Client initialized"),
            "notifications/cancelled" => trace!("Cancellation ignored"),
            other => trace!(method = %other, "Unhandled notification"),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);

        let protocol_version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(LATEST_PROTOCOL_VERSION);

        let mut result = json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false },
                "logging": {},
            },
            "serverInfo": {
                "name": self.name,
                "version": self.version,
            },
        });

        if let Some(instructions) = &self.instructions {
            result["instructions"] = Value::String(instructions.clone());
        }

        result
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(Tool::descriptor).collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(error_codes::INVALID_PARAMS, "Missing tool name"))?;

        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| {
                JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Unknown tool: {name}"))
            })?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let output = match tool.handler.call(self.context(), arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                ToolOutput::error(e.to_string())
            }
        };

        serde_json::to_value(output)
            .map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
