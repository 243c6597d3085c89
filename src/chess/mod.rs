//! Chess rules engine.
//!
//! A compact mailbox board with full legal move generation: castling,
//! en passant, promotion and check detection.
//!
//! # Example
//!
//! ```
//! use chess_mcp_server::chess::{GameStatus, Position};
//!
//! let position = Position::starting()
//!     .apply_uci("f2f3")?
//!     .apply_uci("e7e5")?
//!     .apply_uci("g2g4")?
//!     .apply_uci("d8h4")?;
//!
//! assert!(matches!(position.status(), GameStatus::Checkmate { .. }));
//! # Ok::<(), chess_mcp_server::Error>(())
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `types` | Colors, pieces, squares, moves |
//! | `position` | Position, FEN and move generation |
//! | `render` | ASCII and HTML diagrams |

// ============================================================================
// Submodules
// ============================================================================

/// Position, FEN codec and move generation.
pub mod position;

/// Board rendering.
mod render;

/// Board primitives.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use position::{Position, STARTING_FEN};
pub use types::{CastlingRights, Color, GameStatus, Move, Piece, Role, Square};
