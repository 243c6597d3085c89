//! MCP protocol layer.
//!
//! This module defines the JSON-RPC 2.0 envelope and the per-session MCP
//! server that answers it.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `JsonRpcRequest` | Client → Server | Method call expecting a reply |
//! | `JsonRpcNotification` | Both | One-way message |
//! | `JsonRpcResponse` | Server → Client | Reply or error envelope |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | JSON-RPC message and payload types |
//! | `server` | MCP server, tools and server factory |

// ============================================================================
// Submodules
// ============================================================================

/// JSON-RPC message types.
pub mod message;

/// MCP server and tool registration.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    INITIALIZE_METHOD, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcVersion, Payload, PayloadError, RequestId, error_codes,
    is_initialize_body,
};
pub use server::{
    Content, LATEST_PROTOCOL_VERSION, McpServer, SUPPORTED_PROTOCOL_VERSIONS, ServerFactory,
    Tool, ToolContext, ToolHandler, ToolOutput,
};
