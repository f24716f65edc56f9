//! The closed set of move kinds and everything a move can do by itself.
//!
//! A [`Move`] carries enough information to render UCI LAN and SAN without
//! looking back at the position it came from. Parsing needs a position for
//! context and lives in `utils::long_algebraic` and `utils::san`; the
//! constructors here are thin entry points into those.

use std::fmt;

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_rules::{
    KINGSIDE_CASTLE_FILES, KINGSIDE_ROOK_FILE, KING_START_FILE, QUEENSIDE_CASTLE_FILES,
    QUEENSIDE_ROOK_FILE,
};
use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::utils::long_algebraic::{long_algebraic_to_move, long_algebraic_to_move_checked};
use crate::utils::san::san_to_move;

/// Check annotation carried by [`Move::Checked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Check,
    Checkmate,
}

impl CheckStatus {
    #[inline]
    pub const fn suffix(self) -> char {
        match self {
            CheckStatus::Check => '+',
            CheckStatus::Checkmate => '#',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Move {
    Normal {
        kind: PieceKind,
        from: Square,
        to: Square,
        capture: bool,
    },
    /// Always a pawn move.
    Promotion {
        from: Square,
        to: Square,
        capture: bool,
        promoted_to: PieceKind,
    },
    Castle {
        color: Color,
        queenside: bool,
    },
    /// Annotation wrapper; only SAN rendering differs from the inner move.
    Checked {
        inner: Box<Move>,
        status: CheckStatus,
    },
}

impl Move {
    #[inline]
    pub const fn normal(kind: PieceKind, from: Square, to: Square, capture: bool) -> Self {
        Move::Normal {
            kind,
            from,
            to,
            capture,
        }
    }

    #[inline]
    pub const fn promotion(from: Square, to: Square, capture: bool, promoted_to: PieceKind) -> Self {
        Move::Promotion {
            from,
            to,
            capture,
            promoted_to,
        }
    }

    #[inline]
    pub const fn castle(color: Color, queenside: bool) -> Self {
        Move::Castle { color, queenside }
    }

    /// Parses UCI LAN. The four king castling strings always decode to
    /// [`Move::Castle`], whatever piece stands on the from-square.
    pub fn from_uci(uci: &str, position: &Position) -> Result<Self, ChessErrors> {
        long_algebraic_to_move(uci, position)
    }

    /// Like [`Move::from_uci`], but the castling strings only decode to a
    /// castle when a king stands on the from-square.
    pub fn from_uci_checked(uci: &str, position: &Position) -> Result<Self, ChessErrors> {
        long_algebraic_to_move_checked(uci, position)
    }

    pub fn from_san(san: &str, position: &Position) -> Result<Self, ChessErrors> {
        san_to_move(san, position)
    }

    /// Wraps the move in a check annotation, replacing any existing one.
    pub fn with_check_status(self, status: CheckStatus) -> Self {
        Move::Checked {
            inner: Box::new(self.into_unannotated()),
            status,
        }
    }

    /// Annotation of this move, if any.
    pub fn check_status(&self) -> Option<CheckStatus> {
        match self {
            Move::Checked { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The move without its check annotation.
    pub fn unannotated(&self) -> &Move {
        match self {
            Move::Checked { inner, .. } => inner.unannotated(),
            other => other,
        }
    }

    pub fn into_unannotated(self) -> Move {
        match self {
            Move::Checked { inner, .. } => inner.into_unannotated(),
            other => other,
        }
    }

    pub fn is_pawn_move_or_capture(&self) -> bool {
        match self {
            Move::Normal { kind, capture, .. } => *kind == PieceKind::Pawn || *capture,
            Move::Promotion { .. } => true,
            Move::Castle { .. } => false,
            Move::Checked { inner, .. } => inner.is_pawn_move_or_capture(),
        }
    }

    /// The square a two-step pawn advance jumped over.
    pub fn en_passant_square(&self) -> Option<Square> {
        match self {
            Move::Normal {
                kind: PieceKind::Pawn,
                from,
                to,
                ..
            } if from.rank().abs_diff(to.rank()) == 2 => {
                Some(Square::from_coords(from.file(), (from.rank() + to.rank()) / 2))
            }
            Move::Checked { inner, .. } => inner.en_passant_square(),
            _ => None,
        }
    }

    /// Squares the king and rook start from and land on, for a castle.
    fn castle_squares(color: Color, queenside: bool) -> CastleSquares {
        let back = color.back_rank();
        let (rook_file, (king_to, rook_to)) = if queenside {
            (QUEENSIDE_ROOK_FILE, QUEENSIDE_CASTLE_FILES)
        } else {
            (KINGSIDE_ROOK_FILE, KINGSIDE_CASTLE_FILES)
        };
        CastleSquares {
            king_from: Square::from_coords(KING_START_FILE, back),
            king_to: Square::from_coords(king_to, back),
            rook_from: Square::from_coords(rook_file, back),
            rook_to: Square::from_coords(rook_to, back),
        }
    }

    /// Pseudo-legality on `position`; self-check is the caller's concern
    /// (see [`Position::is_legal`]).
    pub fn is_possible_on(&self, position: &Position) -> bool {
        match self {
            Move::Normal { kind, from, to, .. } => {
                position.get(*from).is_some_and(|piece| piece.kind == *kind)
                    && position.is_move_possible(*from, *to)
            }
            Move::Promotion {
                from,
                to,
                promoted_to,
                ..
            } => {
                let Some(pawn) = position.get(*from) else {
                    return false;
                };
                pawn.kind == PieceKind::Pawn
                    && !matches!(promoted_to, PieceKind::Pawn | PieceKind::King)
                    && to.rank() == pawn.color.promotion_rank()
                    && position.is_move_possible(*from, *to)
            }
            Move::Castle { color, queenside } => {
                let squares = Self::castle_squares(*color, *queenside);
                let back = color.back_rank();
                let transit = Square::from_coords(
                    (squares.king_from.file() + squares.king_to.file()) / 2,
                    back,
                );

                position.castling_rights & castle_flag(*color, *queenside) != 0
                    && position.is_piece_at(squares.king_from, Piece::new(*color, PieceKind::King))
                    && position.is_piece_at(squares.rook_from, Piece::new(*color, PieceKind::Rook))
                    && position.is_rank_open(back, squares.rook_from.file(), squares.king_from.file())
                    && !position.is_in_check(*color)
                    && !position.is_square_attacked(transit, color.opposite())
            }
            Move::Checked { inner, .. } => inner.is_possible_on(position),
        }
    }

    /// Moves the pieces. Flags and counters are left to [`Position::perform`].
    pub fn play(&self, position: &mut Position) {
        match self {
            Move::Normal {
                kind,
                from,
                to,
                capture,
            } => {
                let destination_was_empty = position.get(*to).is_none();
                position.move_raw(*from, *to);
                if *kind == PieceKind::Pawn && *capture && destination_was_empty {
                    position.set(Square::from_coords(to.file(), from.rank()), None);
                }
            }
            Move::Promotion {
                from,
                to,
                capture,
                promoted_to,
            } => {
                Move::normal(PieceKind::Pawn, *from, *to, *capture).play(position);
                if let Some(pawn) = position.get(*to) {
                    position.set(*to, Some(Piece::new(pawn.color, *promoted_to)));
                }
            }
            Move::Castle { color, queenside } => {
                let squares = Self::castle_squares(*color, *queenside);
                position.move_raw(squares.king_from, squares.king_to);
                position.move_raw(squares.rook_from, squares.rook_to);
            }
            Move::Checked { inner, .. } => inner.play(position),
        }
    }

    pub fn to_uci(&self) -> String {
        match self {
            Move::Normal { from, to, .. } => format!("{from}{to}"),
            Move::Promotion {
                from,
                to,
                promoted_to,
                ..
            } => format!("{from}{to}{}", promoted_to.letter().to_ascii_lowercase()),
            Move::Castle { color, queenside } => {
                let squares = Self::castle_squares(*color, *queenside);
                format!("{}{}", squares.king_from, squares.king_to)
            }
            Move::Checked { inner, .. } => inner.to_uci(),
        }
    }

    /// SAN with the full from-square (`Ng1f3`, `e4xd5`, `Pa7a8=Q`).
    pub fn to_san(&self) -> String {
        match self {
            Move::Normal {
                kind,
                from,
                to,
                capture,
            } => {
                let mut out = String::with_capacity(6);
                if *kind != PieceKind::Pawn {
                    out.push(kind.letter());
                }
                push_from_to(&mut out, *from, *to, *capture);
                out
            }
            Move::Promotion {
                from,
                to,
                capture,
                promoted_to,
            } => {
                let mut out = String::with_capacity(8);
                out.push(PieceKind::Pawn.letter());
                push_from_to(&mut out, *from, *to, *capture);
                out.push('=');
                out.push(promoted_to.letter());
                out
            }
            Move::Castle { queenside, .. } => {
                let san = if *queenside { "O-O-O" } else { "O-O" };
                san.to_owned()
            }
            Move::Checked { inner, status } => {
                let mut out = inner.to_san();
                out.push(status.suffix());
                out
            }
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_san())
    }
}

struct CastleSquares {
    king_from: Square,
    king_to: Square,
    rook_from: Square,
    rook_to: Square,
}

fn push_from_to(out: &mut String, from: Square, to: Square, capture: bool) {
    out.push_str(&from.to_string());
    if capture {
        out.push('x');
    }
    out.push_str(&to.to_string());
}
