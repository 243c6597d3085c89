//! Chess MCP Server - Session-routed chess over MCP Streamable HTTP.
//!
//! This library hosts a chess game per MCP session behind a single HTTP
//! endpoint, routing each request to the transport that owns its session.
//!
//! # Architecture
//!
//! The server follows a router/transport model:
//!
//! - **Router**: Classifies each request by method, `mcp-session-id` header
//!   and body, then picks or creates a transport
//! - **Transport**: One per session; speaks Streamable HTTP (JSON or SSE)
//!   to the client and JSON-RPC to its protocol server
//!
//! Key design principles:
//!
//! - The session registry is owned by the router instance, not global state
//! - Generated session IDs are registered by a one-shot callback fired when
//!   the transport processes `initialize`
//! - Sessions leave the registry only when their transport closes
//! - Saved games and live sessions share an ID but no transaction
//!
//! # Quick Start
//!
//! ```no_run
//! use chess_mcp_server::{McpHttpServer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = McpHttpServer::builder()
//!         .port(3000)
//!         .data_dir("./games")
//!         .build()?;
//!
//!     let server = McpHttpServer::bind(config).await?;
//!     println!("MCP endpoint: {}", server.endpoint_url()?);
//!
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chess`] | Rules engine: [`Position`], [`Move`], FEN |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session ID type and validator |
//! | [`protocol`] | JSON-RPC messages and MCP server |
//! | [`server`] | HTTP server, configuration, session router |
//! | [`store`] | Per-session position persistence |
//! | [`tools`] | Chess tools and server factory |
//! | [`transport`] | Streamable HTTP transport and session registry |

// ============================================================================
// Modules
// ============================================================================

/// Chess rules engine.
pub mod chess;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Session identifiers.
pub mod identifiers;

/// JSON-RPC protocol and MCP server.
pub mod protocol;

/// HTTP server and session routing.
///
/// Use [`McpHttpServer::builder()`] to configure a server.
pub mod server;

/// Position persistence.
pub mod store;

/// Chess tools.
pub mod tools;

/// Streamable HTTP transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Chess types
pub use chess::{Color, GameStatus, Move, Position};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SessionId, is_valid_session_id};

// Protocol types
pub use protocol::{McpServer, ServerFactory, Tool, ToolContext, ToolHandler, ToolOutput};

// Server types
pub use server::{McpHttpServer, ServerBuilder, ServerConfig, SessionRouter, Storage};

// Store types
pub use store::{FilePositionStore, MemoryPositionStore, PositionStore};

// Tool types
pub use tools::ChessServerFactory;

// Transport types
pub use transport::{SessionRegistry, StreamableHttpTransport};
