//! Value types shared by every layer of the rules core.
//!
//! Squares, colours, piece kinds and pieces are small `Copy` values compared
//! and hashed by value. Castling rights keep the compact bitmask layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chess_errors::ChessErrors;
use crate::utils::algebraic::{algebraic_to_square, square_to_algebraic};

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank index of this colour's first rank.
    #[inline]
    pub const fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Rank index a pawn of this colour promotes on.
    #[inline]
    pub const fn promotion_rank(self) -> u8 {
        self.opposite().back_rank()
    }

    #[inline]
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    #[inline]
    pub const fn fen_letter(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn from_fen_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    /// Applies this colour's letter case: upper for white, lower for black.
    #[inline]
    pub const fn apply_case(self, letter: char) -> char {
        match self {
            Color::White => letter.to_ascii_uppercase(),
            Color::Black => letter.to_ascii_lowercase(),
        }
    }
}

/// Piece kind (colour is carried separately by [`Piece`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::King,
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Pawn,
    ];

    /// Kinds a pawn may promote to, strongest first.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceKind::King => 0,
            PieceKind::Queen => 1,
            PieceKind::Rook => 2,
            PieceKind::Bishop => 3,
            PieceKind::Knight => 4,
            PieceKind::Pawn => 5,
        }
    }

    /// Uppercase FEN/SAN letter.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }

    /// Case-insensitive inverse of [`PieceKind::letter`].
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'Q' => Some(PieceKind::Queen),
            'R' => Some(PieceKind::Rook),
            'B' => Some(PieceKind::Bishop),
            'N' => Some(PieceKind::Knight),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    #[inline]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    #[inline]
    pub const fn fen_letter(self) -> char {
        self.color.apply_case(self.kind.letter())
    }

    /// Parses a FEN piece letter; the case selects the colour.
    pub fn from_letter(letter: char) -> Option<Self> {
        let kind = PieceKind::from_letter(letter)?;
        let color = if letter.is_ascii_lowercase() {
            Color::Black
        } else {
            Color::White
        };
        Some(Self { color, kind })
    }
}

/// A board coordinate. File 0 is `a`, rank 0 is white's back rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Returns `None` unless both indices are in `0..=7`.
    #[inline]
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    /// Builds a square from indices already known to be on the board.
    #[inline]
    pub(crate) const fn from_coords(file: u8, rank: u8) -> Self {
        Self {
            file: file & 7,
            rank: rank & 7,
        }
    }

    /// Square index in `0..64`, rank-major (`a1 == 0`, `h1 == 7`, `h8 == 63`).
    #[inline]
    pub const fn index(self) -> usize {
        (self.rank as usize) * 8 + self.file as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Self::from_coords((index % 8) as u8, (index / 8) as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn file(self) -> u8 {
        self.file
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// The square displaced by `(d_file, d_rank)`, if it stays on the board.
    pub fn offset(self, d_file: i8, d_rank: i8) -> Option<Self> {
        let file = i16::from(self.file) + i16::from(d_file);
        let rank = i16::from(self.rank) + i16::from(d_rank);
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Self::from_coords(file as u8, rank as u8))
        } else {
            None
        }
    }

    /// All 64 squares in index order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).filter_map(Square::from_index)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&square_to_algebraic(*self))
    }
}

impl FromStr for Square {
    type Err = ChessErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        algebraic_to_square(s)
    }
}

/// Compact castling rights bitmask.
pub type CastlingRights = u8;

pub const CASTLE_WHITE_KINGSIDE: CastlingRights = 1 << 0;
pub const CASTLE_WHITE_QUEENSIDE: CastlingRights = 1 << 1;
pub const CASTLE_BLACK_KINGSIDE: CastlingRights = 1 << 2;
pub const CASTLE_BLACK_QUEENSIDE: CastlingRights = 1 << 3;
pub const CASTLE_ALL: CastlingRights =
    CASTLE_WHITE_KINGSIDE | CASTLE_WHITE_QUEENSIDE | CASTLE_BLACK_KINGSIDE | CASTLE_BLACK_QUEENSIDE;

/// The single right for `color` on the given wing.
#[inline]
pub const fn castle_flag(color: Color, queenside: bool) -> CastlingRights {
    match (color, queenside) {
        (Color::White, false) => CASTLE_WHITE_KINGSIDE,
        (Color::White, true) => CASTLE_WHITE_QUEENSIDE,
        (Color::Black, false) => CASTLE_BLACK_KINGSIDE,
        (Color::Black, true) => CASTLE_BLACK_QUEENSIDE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_geometry() {
        assert_eq!(Color::White.back_rank(), 0);
        assert_eq!(Color::Black.back_rank(), 7);
        assert_eq!(Color::White.promotion_rank(), 7);
        assert_eq!(Color::Black.pawn_direction(), -1);
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::from_fen_letter('b'), Some(Color::Black));
        assert_eq!(Color::from_fen_letter('x'), None);
    }

    #[test]
    fn piece_letters_follow_colour_case() {
        let knight = Piece::new(Color::Black, PieceKind::Knight);
        assert_eq!(knight.fen_letter(), 'n');
        assert_eq!(Piece::from_letter('n'), Some(knight));
        assert_eq!(
            Piece::from_letter('Q'),
            Some(Piece::new(Color::White, PieceKind::Queen))
        );
        assert_eq!(Piece::from_letter('x'), None);
    }

    #[test]
    fn square_bounds_and_offsets() {
        assert!(Square::new(8, 0).is_none());
        let e4: Square = "e4".parse().expect("e4 should parse");
        assert_eq!((e4.file(), e4.rank()), (4, 3));
        assert_eq!(e4.offset(1, 1).map(|s| s.to_string()), Some("f5".to_owned()));
        assert!(e4.offset(4, 0).is_none());
        assert_eq!(Square::all().count(), 64);
        assert_eq!(Square::from_index(e4.index()), Some(e4));
    }

    #[test]
    fn castle_flags_are_distinct() {
        let mut seen = 0;
        for color in Color::ALL {
            for queenside in [false, true] {
                let flag = castle_flag(color, queenside);
                assert_eq!(seen & flag, 0);
                seen |= flag;
            }
        }
        assert_eq!(seen, CASTLE_ALL);
    }
}
