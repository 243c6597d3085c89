//! Chess position, FEN codec and legal move generation.
//!
//! Moves are generated pseudo-legally, then filtered by playing each one
//! and checking that the mover's king is not attacked. Castling through or
//! out of check is rejected during generation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

use super::types::{CastlingRights, Color, GameStatus, Move, Piece, Role, Square};

// ============================================================================
// Constants
// ============================================================================

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

// ============================================================================
// Position
// ============================================================================

/// Complete game state: placement, side to move, rights and clocks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    board: [Option<Piece>; 64],
    turn: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Position").field(&self.fen()).finish()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

// ============================================================================
// Position - Construction & FEN
// ============================================================================

impl Position {
    /// Returns the standard starting position.
    #[must_use]
    pub fn starting() -> Self {
        const BACK_RANK: [Role; 8] = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];

        let mut board = [None; 64];
        for (file, role) in BACK_RANK.into_iter().enumerate() {
            board[file] = Some(Piece::new(Color::White, role));
            board[8 + file] = Some(Piece::new(Color::White, Role::Pawn));
            board[48 + file] = Some(Piece::new(Color::Black, Role::Pawn));
            board[56 + file] = Some(Piece::new(Color::Black, role));
        }

        Self {
            board,
            turn: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parses a FEN string.
    ///
    /// The halfmove clock and fullmove number may be omitted and default to
    /// `0` and `1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFen`] if the string is malformed or describes
    /// an impossible position: missing or extra kings, pawns on the first or
    /// last rank, castling rights without king and rook on their home
    /// squares, or the side not to move being in check.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::invalid_fen(fen, reason);

        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(invalid("expected 4 to 6 space-separated fields"));
        }

        let board = parse_placement(fields[0]).map_err(|reason| invalid(&reason))?;

        let turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(invalid("side to move must be 'w' or 'b'")),
        };

        let castling = parse_castling(fields[2]).ok_or_else(|| invalid("bad castling field"))?;

        let en_passant = match fields[3] {
            "-" => None,
            name => {
                let square = Square::from_name(name)
                    .ok_or_else(|| invalid("bad en passant square"))?;
                let expected_rank = match turn {
                    Color::White => 5,
                    Color::Black => 2,
                };
                if square.rank() != expected_rank {
                    return Err(invalid("en passant square on the wrong rank"));
                }
                Some(square)
            }
        };

        let halfmove_clock = match fields.get(4) {
            Some(text) => text
                .parse::<u32>()
                .map_err(|_| invalid("halfmove clock is not a number"))?,
            None => 0,
        };

        let fullmove_number = match fields.get(5) {
            Some(text) => match text.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid("fullmove number must be a positive number")),
            },
            None => 1,
        };

        let position = Self {
            board,
            turn,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };

        position.validate().map_err(invalid)?;
        Ok(position)
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        for color in [Color::White, Color::Black] {
            let kings = self
                .board
                .iter()
                .flatten()
                .filter(|p| **p == Piece::new(color, Role::King))
                .count();
            if kings != 1 {
                return Err("each side needs exactly one king");
            }
        }

        let pawn_on_edge = Square::all().any(|sq| {
            matches!(self.piece_at(sq), Some(Piece { role: Role::Pawn, .. }))
                && (sq.rank() == 0 || sq.rank() == 7)
        });
        if pawn_on_edge {
            return Err("pawns cannot stand on the first or last rank");
        }

        for color in [Color::White, Color::Black] {
            let rank = color.back_rank();
            let king_home = self.piece_at_coords(4, rank) == Some(Piece::new(color, Role::King));
            let rook = |file| self.piece_at_coords(file, rank) == Some(Piece::new(color, Role::Rook));
            if self.castling.king_side(color) && !(king_home && rook(7)) {
                return Err("kingside castling right without king and rook at home");
            }
            if self.castling.queen_side(color) && !(king_home && rook(0)) {
                return Err("queenside castling right without king and rook at home");
            }
        }

        if self.is_king_attacked(self.turn.other()) {
            return Err("side not to move is in check");
        }

        Ok(())
    }

    /// Serializes the position as FEN.
    #[must_use]
    pub fn fen(&self) -> String {
        let mut out = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at_coords(file, rank) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(self.turn.fen_char());
        out.push(' ');

        if self.castling.is_empty() {
            out.push('-');
        } else {
            for (has, c) in [
                (self.castling.white_king, 'K'),
                (self.castling.white_queen, 'Q'),
                (self.castling.black_king, 'k'),
                (self.castling.black_queen, 'q'),
            ] {
                if has {
                    out.push(c);
                }
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(square) => out.push_str(&square.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }
}

fn parse_placement(field: &str) -> std::result::Result<[Option<Piece>; 64], String> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(format!("expected 8 ranks, found {}", ranks.len()));
    }

    let mut board = [None; 64];
    for (i, text) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file: u8 = 0;
        for c in text.chars() {
            if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                file += skip as u8;
            } else {
                let piece = Piece::from_fen_char(c)
                    .ok_or_else(|| format!("unexpected character '{c}'"))?;
                let square = Square::new(file, rank)
                    .ok_or_else(|| format!("rank {} has more than 8 squares", rank + 1))?;
                board[square.index()] = Some(piece);
                file += 1;
            }
            if file > 8 {
                return Err(format!("rank {} has more than 8 squares", rank + 1));
            }
        }
        if file != 8 {
            return Err(format!("rank {} has {file} squares", rank + 1));
        }
    }

    Ok(board)
}

fn parse_castling(field: &str) -> Option<CastlingRights> {
    let mut rights = CastlingRights::default();
    if field == "-" {
        return Some(rights);
    }

    for c in field.chars() {
        let slot = match c {
            'K' => &mut rights.white_king,
            'Q' => &mut rights.white_queen,
            'k' => &mut rights.black_king,
            'q' => &mut rights.black_queen,
            _ => return None,
        };
        if *slot {
            return None;
        }
        *slot = true;
    }

    Some(rights)
}

// ============================================================================
// Position - Accessors
// ============================================================================

impl Position {
    /// Piece on `square`, if any.
    #[inline]
    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }

    fn piece_at_coords(&self, file: u8, rank: u8) -> Option<Piece> {
        Square::new(file, rank).and_then(|sq| self.piece_at(sq))
    }

    /// Side to move.
    #[inline]
    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Remaining castling rights.
    #[inline]
    #[must_use]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    /// Square a pawn may capture onto en passant.
    #[inline]
    #[must_use]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Half-moves since the last capture or pawn move.
    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Move number, starting at 1 and incremented after Black moves.
    #[inline]
    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }
}

// ============================================================================
// Position - Attacks
// ============================================================================

impl Position {
    /// Returns `true` if `square` is attacked by any piece of `by`.
    #[must_use]
    pub fn is_attacked(&self, square: Square, by: Color) -> bool {
        // A pawn attacks diagonally forward, so look one rank behind `square`
        // from the attacker's point of view.
        let pawn = Piece::new(by, Role::Pawn);
        for df in [-1, 1] {
            if square
                .offset(df, -by.forward())
                .is_some_and(|sq| self.piece_at(sq) == Some(pawn))
            {
                return true;
            }
        }

        let knight = Piece::new(by, Role::Knight);
        if KNIGHT_OFFSETS.iter().any(|&(df, dr)| {
            square
                .offset(df, dr)
                .is_some_and(|sq| self.piece_at(sq) == Some(knight))
        }) {
            return true;
        }

        let king = Piece::new(by, Role::King);
        if KING_OFFSETS.iter().any(|&(df, dr)| {
            square
                .offset(df, dr)
                .is_some_and(|sq| self.piece_at(sq) == Some(king))
        }) {
            return true;
        }

        let slides = |directions: &[(i8, i8)], role: Role| {
            directions.iter().any(|&(df, dr)| {
                let mut current = square;
                while let Some(next) = current.offset(df, dr) {
                    match self.piece_at(next) {
                        Some(piece) => {
                            return piece.color == by
                                && (piece.role == role || piece.role == Role::Queen);
                        }
                        None => current = next,
                    }
                }
                false
            })
        };

        slides(&ROOK_DIRECTIONS, Role::Rook) || slides(&BISHOP_DIRECTIONS, Role::Bishop)
    }

    fn king_square(&self, color: Color) -> Option<Square> {
        let king = Piece::new(color, Role::King);
        Square::all().find(|&sq| self.piece_at(sq) == Some(king))
    }

    fn is_king_attacked(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|sq| self.is_attacked(sq, color.other()))
    }

    /// Returns `true` if the side to move is in check.
    #[inline]
    #[must_use]
    pub fn is_check(&self) -> bool {
        self.is_king_attacked(self.turn)
    }
}

// ============================================================================
// Position - Move Generation
// ============================================================================

impl Position {
    /// All legal moves for the side to move.
    ///
    /// Promotions appear once per promotion piece.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        let mover = self.turn;
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|mv| !self.play_unchecked(mv).is_king_attacked(mover))
            .collect()
    }

    fn pseudo_legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);

        for from in Square::all() {
            let Some(piece) = self.piece_at(from) else {
                continue;
            };
            if piece.color != self.turn {
                continue;
            }

            match piece.role {
                Role::Pawn => self.pawn_moves(from, &mut moves),
                Role::Knight => self.step_moves(from, &KNIGHT_OFFSETS, &mut moves),
                Role::Bishop => self.slide_moves(from, &BISHOP_DIRECTIONS, &mut moves),
                Role::Rook => self.slide_moves(from, &ROOK_DIRECTIONS, &mut moves),
                Role::Queen => {
                    self.slide_moves(from, &ROOK_DIRECTIONS, &mut moves);
                    self.slide_moves(from, &BISHOP_DIRECTIONS, &mut moves);
                }
                Role::King => {
                    self.step_moves(from, &KING_OFFSETS, &mut moves);
                    self.castling_moves(from, &mut moves);
                }
            }
        }

        moves
    }

    fn can_land(&self, square: Square) -> bool {
        self.piece_at(square).is_none_or(|p| p.color != self.turn)
    }

    fn step_moves(&self, from: Square, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in offsets {
            if let Some(to) = from.offset(df, dr).filter(|&sq| self.can_land(sq)) {
                moves.push(Move::new(from, to));
            }
        }
    }

    fn slide_moves(&self, from: Square, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(df, dr) {
                match self.piece_at(to) {
                    None => moves.push(Move::new(from, to)),
                    Some(piece) => {
                        if piece.color != self.turn {
                            moves.push(Move::new(from, to));
                        }
                        break;
                    }
                }
                current = to;
            }
        }
    }

    fn pawn_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let forward = self.turn.forward();
        let last_rank = self.turn.other().back_rank();
        let start_rank = match self.turn {
            Color::White => 1,
            Color::Black => 6,
        };

        let mut push = |to: Square| {
            if to.rank() == last_rank {
                for role in Role::PROMOTIONS {
                    moves.push(Move {
                        from,
                        to,
                        promotion: Some(role),
                    });
                }
            } else {
                moves.push(Move::new(from, to));
            }
        };

        if let Some(one) = from.offset(0, forward).filter(|&sq| self.piece_at(sq).is_none()) {
            push(one);
            if from.rank() == start_rank
                && let Some(two) = one
                    .offset(0, forward)
                    .filter(|&sq| self.piece_at(sq).is_none())
            {
                push(two);
            }
        }

        for df in [-1, 1] {
            let Some(to) = from.offset(df, forward) else {
                continue;
            };
            let captures = self.piece_at(to).is_some_and(|p| p.color != self.turn);
            if captures || self.en_passant == Some(to) {
                push(to);
            }
        }
    }

    fn castling_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let color = self.turn;
        let rank = color.back_rank();
        if from.rank() != rank || from.file() != 4 {
            return;
        }
        let enemy = color.other();
        let empty = |file| self.piece_at_coords(file, rank).is_none();
        let safe = |file| Square::new(file, rank).is_some_and(|sq| !self.is_attacked(sq, enemy));
        let rook = Some(Piece::new(color, Role::Rook));

        if !safe(4) {
            return;
        }

        if self.castling.king_side(color)
            && self.piece_at_coords(7, rank) == rook
            && empty(5)
            && empty(6)
            && safe(5)
            && safe(6)
            && let Some(to) = Square::new(6, rank)
        {
            moves.push(Move::new(from, to));
        }

        if self.castling.queen_side(color)
            && self.piece_at_coords(0, rank) == rook
            && empty(1)
            && empty(2)
            && empty(3)
            && safe(3)
            && safe(2)
            && let Some(to) = Square::new(2, rank)
        {
            moves.push(Move::new(from, to));
        }
    }
}

// ============================================================================
// Position - Playing Moves
// ============================================================================

impl Position {
    /// Plays a legal move and returns the resulting position.
    ///
    /// A pawn move to the last rank without a promotion piece promotes to
    /// a queen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalMove`] if the move is not legal here.
    pub fn apply_move(&self, mv: &Move) -> Result<Self> {
        let legal = self.legal_moves();
        let matched = legal.iter().find(|candidate| {
            candidate.from == mv.from
                && candidate.to == mv.to
                && (candidate.promotion == mv.promotion
                    || (mv.promotion.is_none() && candidate.promotion == Some(Role::Queen)))
        });

        match matched {
            Some(candidate) => Ok(self.play_unchecked(candidate)),
            None => Err(Error::illegal_move(mv.to_string(), self.explain_illegal(mv))),
        }
    }

    /// Parses UCI notation and plays the move.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMove`] for malformed notation and
    /// [`Error::IllegalMove`] for moves not legal here.
    pub fn apply_uci(&self, notation: &str) -> Result<Self> {
        self.apply_move(&Move::from_uci(notation)?)
    }

    fn explain_illegal(&self, mv: &Move) -> String {
        match self.piece_at(mv.from) {
            None => format!("no piece on {}", mv.from),
            Some(piece) if piece.color != self.turn => {
                format!("piece on {} belongs to {}, {} to move", mv.from, piece.color, self.turn)
            }
            Some(_) if self.status().is_over() => format!("game is over ({})", self.status()),
            Some(_) if self.is_check() => "move does not resolve check".to_string(),
            Some(_) => "no legal move matches".to_string(),
        }
    }

    /// Plays a pseudo-legal move without checking legality.
    fn play_unchecked(&self, mv: &Move) -> Self {
        let mut next = self.clone();
        let Some(piece) = self.piece_at(mv.from) else {
            return next;
        };
        let mut captured = self.piece_at(mv.to).is_some();

        next.board[mv.from.index()] = None;

        if piece.role == Role::Pawn
            && self.en_passant == Some(mv.to)
            && mv.from.file() != mv.to.file()
            && !captured
            && let Some(victim) = Square::new(mv.to.file(), mv.from.rank())
        {
            next.board[victim.index()] = None;
            captured = true;
        }

        let placed = match (piece.role, mv.promotion) {
            (Role::Pawn, Some(role)) => Piece::new(piece.color, role),
            (Role::Pawn, None) if mv.to.rank() == piece.color.other().back_rank() => {
                Piece::new(piece.color, Role::Queen)
            }
            _ => piece,
        };
        next.board[mv.to.index()] = Some(placed);

        if piece.role == Role::King {
            next.castling.clear(piece.color);
            let rank = mv.from.rank();
            let rook_files = match i16::from(mv.to.file()) - i16::from(mv.from.file()) {
                2 => Some((7, 5)),
                -2 => Some((0, 3)),
                _ => None,
            };
            if let Some((rook_from, rook_to)) = rook_files
                && let (Some(rf), Some(rt)) = (Square::new(rook_from, rank), Square::new(rook_to, rank))
            {
                next.board[rt.index()] = next.board[rf.index()].take();
            }
        }
        next.castling.clear_rook_square(mv.from);
        next.castling.clear_rook_square(mv.to);

        next.en_passant = if piece.role == Role::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            mv.from.offset(0, piece.color.forward())
        } else {
            None
        };

        next.halfmove_clock = if piece.role == Role::Pawn || captured {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        if self.turn == Color::Black {
            next.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        next.turn = self.turn.other();

        next
    }

    /// Summarizes the state of the game for the side to move.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        let check = self.is_check();
        if self.legal_moves().is_empty() {
            return if check {
                GameStatus::Checkmate {
                    winner: self.turn.other(),
                }
            } else {
                GameStatus::Stalemate
            };
        }
        if self.halfmove_clock >= 100 {
            GameStatus::FiftyMoveRule
        } else if check {
            GameStatus::Check
        } else {
            GameStatus::InProgress
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
