//! Board primitives: colors, pieces, squares and moves.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Color
// ============================================================================

/// Side to move or owner of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Moves first.
    White,
    /// Moves second.
    Black,
}

impl Color {
    /// Returns the opponent.
    #[inline]
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Rank direction pawns of this color advance in.
    #[inline]
    #[must_use]
    pub(crate) const fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    /// Rank index (0-based) of this color's back rank.
    #[inline]
    #[must_use]
    pub(crate) const fn back_rank(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// FEN side-to-move character.
    #[inline]
    #[must_use]
    pub const fn fen_char(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

// ============================================================================
// Role
// ============================================================================

/// Kind of piece, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    /// Roles a pawn may promote to, strongest first.
    pub const PROMOTIONS: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

    /// Parses a lowercase or uppercase piece letter.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }

    /// Lowercase piece letter.
    #[inline]
    #[must_use]
    pub const fn char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

// ============================================================================
// Piece
// ============================================================================

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    /// Owner.
    pub color: Color,
    /// Kind.
    pub role: Role,
}

impl Piece {
    /// Creates a piece.
    #[inline]
    #[must_use]
    pub const fn new(color: Color, role: Role) -> Self {
        Self { color, role }
    }

    /// Parses a FEN piece letter (uppercase is white).
    #[must_use]
    pub fn from_fen_char(c: char) -> Option<Self> {
        let role = Role::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { color, role })
    }

    /// FEN piece letter (uppercase is white).
    #[must_use]
    pub fn fen_char(self) -> char {
        match self.color {
            Color::White => self.role.char().to_ascii_uppercase(),
            Color::Black => self.role.char(),
        }
    }

    /// Unicode chess symbol.
    #[must_use]
    pub const fn symbol(self) -> char {
        match (self.color, self.role) {
            (Color::White, Role::King) => '♔',
            (Color::White, Role::Queen) => '♕',
            (Color::White, Role::Rook) => '♖',
            (Color::White, Role::Bishop) => '♗',
            (Color::White, Role::Knight) => '♘',
            (Color::White, Role::Pawn) => '♙',
            (Color::Black, Role::King) => '♚',
            (Color::Black, Role::Queen) => '♛',
            (Color::Black, Role::Rook) => '♜',
            (Color::Black, Role::Bishop) => '♝',
            (Color::Black, Role::Knight) => '♞',
            (Color::Black, Role::Pawn) => '♟',
        }
    }
}

// ============================================================================
// Square
// ============================================================================

/// Board square, `a1 = 0` through `h8 = 63`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// All 64 squares, `a1` first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }

    /// Creates a square from 0-based file and rank.
    #[inline]
    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self(rank * 8 + file))
        } else {
            None
        }
    }

    /// Parses an algebraic square name such as `e4`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank)
        {
            return None;
        }
        Self::new(file as u8 - b'a', rank as u8 - b'1')
    }

    /// 0-based file (`a = 0`).
    #[inline]
    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// 0-based rank (`1 = 0`).
    #[inline]
    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Index into a 64-element board array.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Square displaced by `(df, dr)`, or `None` off the board.
    #[must_use]
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        let file = self.file() as i8 + df;
        let rank = self.rank() as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Self::new(file as u8, rank as u8)
        } else {
            None
        }
    }

    /// Returns `true` for dark squares (`a1` is dark).
    #[inline]
    #[must_use]
    pub const fn is_dark(self) -> bool {
        (self.file() + self.rank()) % 2 == 0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

// ============================================================================
// Move
// ============================================================================

/// A move in coordinate form.
///
/// Castling is expressed as the king's two-square move (`e1g1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Promotion piece for pawns reaching the last rank.
    pub promotion: Option<Role>,
}

impl Move {
    /// Creates a non-promoting move.
    #[inline]
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Parses UCI notation: `e2e4`, `e7e8q`.
    ///
    /// Surrounding whitespace is ignored and letters are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMove`] if the text is not UCI notation.
    pub fn from_uci(notation: &str) -> Result<Self> {
        let text = notation.trim().to_ascii_lowercase();
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(Error::invalid_move(notation));
        }

        let from = Square::from_name(&text[0..2]);
        let to = Square::from_name(&text[2..4]);
        let promotion = match text[4..].chars().next() {
            None => None,
            Some(c) => match Role::from_char(c) {
                Some(role) if Role::PROMOTIONS.contains(&role) => Some(role),
                _ => return Err(Error::invalid_move(notation)),
            },
        };

        match (from, to) {
            (Some(from), Some(to)) if from != to => Ok(Self {
                from,
                to,
                promotion,
            }),
            _ => Err(Error::invalid_move(notation)),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

// ============================================================================
// Castling Rights
// ============================================================================

/// Remaining castling rights for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights {
    pub white_king: bool,
    pub white_queen: bool,
    pub black_king: bool,
    pub black_queen: bool,
}

impl CastlingRights {
    /// All four rights.
    pub const ALL: Self = Self {
        white_king: true,
        white_queen: true,
        black_king: true,
        black_queen: true,
    };

    /// Kingside right of `color`.
    #[inline]
    #[must_use]
    pub const fn king_side(self, color: Color) -> bool {
        match color {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    /// Queenside right of `color`.
    #[inline]
    #[must_use]
    pub const fn queen_side(self, color: Color) -> bool {
        match color {
            Color::White => self.white_queen,
            Color::Black => self.black_queen,
        }
    }

    /// Drops both rights of `color`.
    pub fn clear(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king = false;
                self.white_queen = false;
            }
            Color::Black => {
                self.black_king = false;
                self.black_queen = false;
            }
        }
    }

    /// Drops the right tied to a rook starting on `square`, if any.
    pub fn clear_rook_square(&mut self, square: Square) {
        match (square.file(), square.rank()) {
            (0, 0) => self.white_queen = false,
            (7, 0) => self.white_king = false,
            (0, 7) => self.black_queen = false,
            (7, 7) => self.black_king = false,
            _ => {}
        }
    }

    /// Returns `true` if no side can castle.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.white_king || self.white_queen || self.black_king || self.black_queen)
    }
}

// ============================================================================
// Game Status
// ============================================================================

/// Outcome summary of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameStatus {
    /// Game continues, side to move is not in check.
    InProgress,
    /// Game continues, side to move is in check.
    Check,
    /// Side to move is mated.
    Checkmate {
        /// The side that delivered mate.
        winner: Color,
    },
    /// Side to move has no legal move and is not in check.
    Stalemate,
    /// A hundred half-moves without a capture or pawn move.
    FiftyMoveRule,
}

impl GameStatus {
    /// Returns `true` if no further moves can be played.
    #[inline]
    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(
            self,
            Self::Checkmate { .. } | Self::Stalemate | Self::FiftyMoveRule
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("in progress"),
            Self::Check => f.write_str("check"),
            Self::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Self::Stalemate => f.write_str("stalemate"),
            Self::FiftyMoveRule => f.write_str("draw by fifty-move rule"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_names() {
        let e4 = Square::from_name("e4").expect("valid");
        assert_eq!(e4.file(), 4);
        assert_eq!(e4.rank(), 3);
        assert_eq!(e4.to_string(), "e4");
        assert_eq!(Square::from_name("a1").map(Square::index), Some(0));
        assert_eq!(Square::from_name("h8").map(Square::index), Some(63));
    }

    #[test]
    fn test_square_rejects_bad_names() {
        for name in ["", "e", "i1", "a9", "a0", "e44", "E4"] {
            assert!(Square::from_name(name).is_none(), "{name}");
        }
    }

    #[test]
    fn test_square_offset_edges() {
        let a1 = Square::from_name("a1").expect("valid");
        assert!(a1.offset(-1, 0).is_none());
        assert!(a1.offset(0, -1).is_none());
        assert_eq!(a1.offset(1, 2).map(|s| s.to_string()), Some("b3".into()));
    }

    #[test]
    fn test_move_from_uci() {
        let mv = Move::from_uci("e2e4").expect("valid");
        assert_eq!(mv.to_string(), "e2e4");
        assert!(mv.promotion.is_none());

        let promo = Move::from_uci(" E7E8Q ").expect("valid");
        assert_eq!(promo.promotion, Some(Role::Queen));
        assert_eq!(promo.to_string(), "e7e8q");
    }

    #[test]
    fn test_move_from_uci_rejects() {
        for text in ["", "e2", "e2e9", "e2e2", "e7e8k", "e7e8x", "e2e4e5", "é2e4"] {
            let err = Move::from_uci(text).unwrap_err();
            assert!(matches!(err, Error::InvalidMove { .. }), "{text}");
        }
    }

    #[test]
    fn test_piece_chars() {
        let knight = Piece::from_fen_char('N').expect("valid");
        assert_eq!(knight, Piece::new(Color::White, Role::Knight));
        assert_eq!(knight.fen_char(), 'N');
        assert_eq!(Piece::new(Color::Black, Role::Queen).symbol(), '♛');
        assert!(Piece::from_fen_char('x').is_none());
    }

    #[test]
    fn test_castling_rights_clear_rook_square() {
        let mut rights = CastlingRights::ALL;
        rights.clear_rook_square(Square::from_name("h1").expect("valid"));
        assert!(!rights.white_king);
        assert!(rights.white_queen);
        rights.clear(Color::Black);
        assert!(!rights.king_side(Color::Black));
        assert!(!rights.queen_side(Color::Black));
        assert!(!rights.is_empty());
    }

    #[test]
    fn test_game_status_serialization() {
        let status = GameStatus::Checkmate {
            winner: Color::Black,
        };
        let json = serde_json::to_value(status).expect("serialize");
        assert_eq!(json, serde_json::json!({"state": "checkmate", "winner": "black"}));
        assert!(status.is_over());
        assert_eq!(status.to_string(), "checkmate, black wins");
    }
}
