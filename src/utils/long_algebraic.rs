//! UCI long algebraic notation (`e2e4`, `e7e8q`) to [`Move`].
//!
//! Rendering lives on [`Move::to_uci`]; this module only parses, since
//! parsing needs the position to know which piece is moving.

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::moves::chess_move::Move;
use crate::utils::algebraic::algebraic_to_square;

/// The fixed king castling strings and the castle each one names.
const CASTLING_STRINGS: [(&str, Color, bool); 4] = [
    ("e1g1", Color::White, false),
    ("e1c1", Color::White, true),
    ("e8g8", Color::Black, false),
    ("e8c8", Color::Black, true),
];

/// Parses UCI LAN; the castling strings are decoded without looking at the
/// board.
pub fn long_algebraic_to_move(long_algebraic: &str, position: &Position) -> Result<Move, ChessErrors> {
    parse(long_algebraic, position, false)
}

/// Parses UCI LAN; the castling strings only become castles when the piece
/// on the from-square is a king.
pub fn long_algebraic_to_move_checked(
    long_algebraic: &str,
    position: &Position,
) -> Result<Move, ChessErrors> {
    parse(long_algebraic, position, true)
}

fn parse(long_algebraic: &str, position: &Position, require_king: bool) -> Result<Move, ChessErrors> {
    let text = long_algebraic.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(ChessErrors::InvalidNotation(format!(
            "invalid long algebraic move: {long_algebraic}"
        )));
    }

    let from = algebraic_to_square(&text[0..2])?;
    let to = algebraic_to_square(&text[2..4])?;
    let moving = position.get(from);

    if text.len() == 4 {
        if let Some((_, color, queenside)) = CASTLING_STRINGS.iter().find(|(s, _, _)| *s == text) {
            let king_moves = moving.is_some_and(|piece| piece.kind == PieceKind::King);
            if !require_king || king_moves {
                return Ok(Move::castle(*color, *queenside));
            }
        }
    }

    let piece = moving.ok_or(ChessErrors::NoSuchPiece(from))?;
    let capture =
        position.get(to).is_some() || (piece.kind == PieceKind::Pawn && from.file() != to.file());

    match text.chars().nth(4) {
        None => Ok(Move::normal(piece.kind, from, to, capture)),
        Some(letter) => {
            let promoted_to = PieceKind::from_letter(letter).ok_or_else(|| {
                ChessErrors::InvalidNotation(format!(
                    "invalid promotion piece '{letter}' in {long_algebraic}"
                ))
            })?;
            Ok(Move::promotion(from, to, capture, promoted_to))
        }
    }
}
