//! Legal move enumeration for the side to move.
//!
//! Candidates come from a plain from/to sweep over the board filtered by the
//! pseudo-legal oracle, then by the self-check test. Good enough for driving
//! games and spotting mate; not meant for search.

use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::moves::chess_move::Move;

/// Pseudo-legal moves of the active colour, in from-square index order.
/// Castles come last.
pub fn generate_pseudo_legal_moves(position: &Position) -> Vec<Move> {
    let mover = position.active_color;
    let mut moves = Vec::with_capacity(48);

    for (from, piece) in position.pieces().filter(|(_, piece)| piece.color == mover) {
        for to in Square::all() {
            if !position.is_move_possible(from, to) {
                continue;
            }
            let capture = position.get(to).is_some()
                || (piece.kind == PieceKind::Pawn && from.file() != to.file());

            if piece.kind == PieceKind::Pawn && to.rank() == mover.promotion_rank() {
                moves.extend(
                    PieceKind::PROMOTIONS
                        .iter()
                        .map(|kind| Move::promotion(from, to, capture, *kind)),
                );
            } else {
                moves.push(Move::normal(piece.kind, from, to, capture));
            }
        }
    }

    for queenside in [false, true] {
        let castle = Move::castle(mover, queenside);
        if castle.is_possible_on(position) {
            moves.push(castle);
        }
    }

    moves
}

pub fn generate_legal_moves(position: &Position) -> Vec<Move> {
    generate_pseudo_legal_moves(position)
        .into_iter()
        .filter(|mv| position.is_legal(mv))
        .collect()
}
