//! Streamable HTTP transport layer.
//!
//! This module turns HTTP exchanges into per-session MCP message streams
//! and keeps the registry of live sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   mcp-session-id   ┌──────────────────────────────┐
//! │  MCP client     │ ─────────────────► │ SessionRegistry              │
//! │                 │   POST/GET/DELETE  │   id → StreamableHttpTransport│
//! │                 │ ◄───────────────── │           │                  │
//! └─────────────────┘   JSON / SSE       │           ▼                  │
//!                                        │       McpServer              │
//!                                        └──────────────────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `TransportManager::create_transport` - Build transport, wire callbacks
//! 2. `initialize` (or explicit ID) - Transport enters the registry
//! 3. Requests carrying the ID - Routed to the same transport
//! 4. DELETE or client disconnect - `close`, registry entry removed
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `headers` | Session header extraction |
//! | `manager` | Transport construction and lifecycle wiring |
//! | `registry` | Session ID → transport map |
//! | `rejection` | HTTP error responses |
//! | `stream` | SSE stream with disconnect detection |
//! | `streamable` | Per-session transport |

// ============================================================================
// Submodules
// ============================================================================

/// Session header extraction.
pub mod headers;

/// Transport construction and lifecycle wiring.
pub mod manager;

/// Live session registry.
pub mod registry;

/// HTTP-level rejections.
pub mod rejection;

/// SSE stream with disconnect detection.
mod stream;

/// Per-session Streamable HTTP transport.
pub mod streamable;

// ============================================================================
// Re-exports
// ============================================================================

pub use headers::{HeaderField, Headers, SESSION_ID_HEADER, collect_headers, extract_session_id};
pub use manager::TransportManager;
pub use registry::SessionRegistry;
pub use rejection::{HttpError, NO_VALID_SESSION_MESSAGE};
pub use streamable::StreamableHttpTransport;
