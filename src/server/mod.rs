//! HTTP server and session routing.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Server configuration builder |
//! | `core` | Bound server, axum application, graceful shutdown |
//! | `router` | Per-request session routing decision |

// ============================================================================
// Submodules
// ============================================================================

/// Server configuration builder.
pub mod builder;

/// Bound server and axum application.
pub mod core;

/// Session request router.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DEFAULT_DATA_DIR, DEFAULT_PATH, DEFAULT_PORT, ServerBuilder, ServerConfig, Storage};
pub use self::core::{McpHttpServer, app};
pub use router::{Route, SessionRouter};
