//! Per-session position persistence.
//!
//! The store is keyed by the same [`SessionId`] as the transport registry,
//! but the two are otherwise independent: closing a session does not delete
//! its saved position, so a client that resumes with the same ID continues
//! the same game.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `file` | One FEN file per session in a data directory |
//! | `memory` | In-process map |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::chess::Position;
use crate::error::Result;
use crate::identifiers::SessionId;

// ============================================================================
// Submodules
// ============================================================================

/// Directory-backed store.
pub mod file;

/// In-memory store.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FilePositionStore;
pub use memory::MemoryPositionStore;

// ============================================================================
// PositionStore
// ============================================================================

/// Loads and saves the current position of each session's game.
#[async_trait]
pub trait PositionStore: Send + Sync + 'static {
    /// Returns the saved position, or `None` if the session has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage fails or holds an unreadable
    /// position.
    async fn load(&self, session_id: &SessionId) -> Result<Option<Position>>;

    /// Saves the position, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage fails.
    async fn save(&self, session_id: &SessionId, position: &Position) -> Result<()>;
}
