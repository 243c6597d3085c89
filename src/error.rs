//! Error types for the chess MCP server.
//!
//! This module defines all library error types used throughout the crate.
//! HTTP-level rejections (status codes and JSON-RPC envelopes) live in
//! [`crate::transport::HttpError`]; this enum covers everything below that layer.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chess_mcp_server::{Result, Position};
//!
//! fn opening() -> Result<Position> {
//!     Position::starting().apply_uci("e2e4")
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Session | [`Error::InvalidSessionId`] |
//! | Protocol | [`Error::Protocol`] |
//! | Chess | [`Error::InvalidFen`], [`Error::InvalidMove`], [`Error::IllegalMove`] |
//! | Storage | [`Error::Store`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// String is not a canonical session identifier.
    #[error("Invalid session ID: {value}")]
    InvalidSessionId {
        /// The rejected value.
        value: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or malformed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Chess Errors
    // ========================================================================
    /// FEN string could not be parsed into a position.
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen {
        /// The rejected FEN.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Move text is not valid UCI notation.
    #[error("Invalid move notation: {notation}")]
    InvalidMove {
        /// The rejected move text.
        notation: String,
    },

    /// Move is well-formed but not legal in the position.
    #[error("Illegal move {notation}: {reason}")]
    IllegalMove {
        /// The rejected move.
        notation: String,
        /// Why it was rejected.
        reason: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Position store failure.
    #[error("Store error: {message}")]
    Store {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid session ID error.
    #[inline]
    pub fn invalid_session_id(value: impl Into<String>) -> Self {
        Self::InvalidSessionId {
            value: value.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid FEN error.
    #[inline]
    pub fn invalid_fen(fen: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFen {
            fen: fen.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid move notation error.
    #[inline]
    pub fn invalid_move(notation: impl Into<String>) -> Self {
        Self::InvalidMove {
            notation: notation.into(),
        }
    }

    /// Creates an illegal move error.
    #[inline]
    pub fn illegal_move(notation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalMove {
            notation: notation.into(),
            reason: reason.into(),
        }
    }

    /// Creates a store error.
    #[inline]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error is about the chess position or move
    /// rather than the server itself.
    #[inline]
    #[must_use]
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFen { .. } | Self::InvalidMove { .. } | Self::IllegalMove { .. }
        )
    }

    /// Returns `true` if this error is about a session identifier.
    #[inline]
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(self, Self::InvalidSessionId { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
