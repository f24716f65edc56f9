//! Standard algebraic notation to [`Move`], resolved against a position.
//!
//! Accepts both short SAN (`Nf3`, `exd5`, `e8=Q+`) and the long form this
//! crate writes (`Ng1f3`, `Pa7a8=Q`). When several pieces could make the
//! move, a candidate that is also legal wins; otherwise the first in square
//! order is taken.

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::moves::chess_move::{CheckStatus, Move};
use crate::utils::algebraic::{algebraic_to_square, file_from_char, rank_from_char};

pub fn san_to_move(san: &str, position: &Position) -> Result<Move, ChessErrors> {
    let text = san.trim();
    let invalid = || ChessErrors::InvalidNotation(format!("invalid SAN: {san}"));

    let (body, status) = strip_check_suffix(text);
    let mover = position.active_color;

    let unannotated = match body {
        "O-O" | "0-0" => Move::castle(mover, false),
        "O-O-O" | "0-0-0" => Move::castle(mover, true),
        _ => parse_piece_move(body, position).map_err(|err| match err {
            SanError::Malformed => invalid(),
            SanError::NoCandidate => ChessErrors::AmbiguousOrUnresolvableSan(san.to_owned()),
        })?,
    };

    Ok(match status {
        Some(status) => unannotated.with_check_status(status),
        None => unannotated,
    })
}

enum SanError {
    Malformed,
    NoCandidate,
}

fn strip_check_suffix(text: &str) -> (&str, Option<CheckStatus>) {
    if let Some(body) = text.strip_suffix('#') {
        (body, Some(CheckStatus::Checkmate))
    } else if let Some(body) = text.strip_suffix('+') {
        (body, Some(CheckStatus::Check))
    } else {
        (text, None)
    }
}

/// What is left between the piece letter and the capture mark.
enum Disambiguator {
    None,
    File(u8),
    Rank(u8),
    Square(Square),
}

impl Disambiguator {
    fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (None, _, _) => Some(Disambiguator::None),
            (Some(ch), None, _) => file_from_char(ch)
                .map(Disambiguator::File)
                .or_else(|| rank_from_char(ch).map(Disambiguator::Rank)),
            (Some(_), Some(_), None) => algebraic_to_square(text).ok().map(Disambiguator::Square),
            _ => None,
        }
    }

    fn admits(&self, square: Square) -> bool {
        match self {
            Disambiguator::None => true,
            Disambiguator::File(file) => square.file() == *file,
            Disambiguator::Rank(rank) => square.rank() == *rank,
            Disambiguator::Square(only) => square == *only,
        }
    }
}

fn parse_piece_move(body: &str, position: &Position) -> Result<Move, SanError> {
    if !body.is_ascii() {
        return Err(SanError::Malformed);
    }

    let (body, promoted_to) = match body.len().checked_sub(2).map(|at| body.split_at(at)) {
        Some((rest, suffix)) if suffix.starts_with('=') => {
            let letter = suffix.chars().nth(1).ok_or(SanError::Malformed)?;
            (rest, Some(PieceKind::from_letter(letter).ok_or(SanError::Malformed)?))
        }
        _ => (body, None),
    };

    let split = body.len().checked_sub(2).ok_or(SanError::Malformed)?;
    let (rest, destination) = body.split_at(split);
    let to = algebraic_to_square(destination).map_err(|_| SanError::Malformed)?;

    let (rest, marked_capture) = match rest.strip_suffix('x') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };

    let (kind, middle) = match rest.chars().next() {
        Some(letter @ ('K' | 'Q' | 'R' | 'B' | 'N' | 'P')) => {
            (PieceKind::from_letter(letter).ok_or(SanError::Malformed)?, &rest[1..])
        }
        _ => (PieceKind::Pawn, rest),
    };
    let disambiguator = Disambiguator::parse(middle).ok_or(SanError::Malformed)?;

    let mover = Piece::new(position.active_color, kind);
    let capture = marked_capture || position.get(to).is_some();
    let build = |from: Square| match promoted_to {
        Some(promoted_to) => Move::promotion(from, to, capture, promoted_to),
        None => Move::normal(kind, from, to, capture),
    };

    let candidates: Vec<Move> = position
        .pieces()
        .filter(|(square, piece)| *piece == mover && disambiguator.admits(*square))
        .filter(|(square, _)| position.is_move_possible(*square, to))
        .map(|(square, _)| build(square))
        .collect();

    let chosen = candidates
        .iter()
        .find(|mv| position.is_legal(mv))
        .or_else(|| candidates.first())
        .cloned();
    chosen.ok_or(SanError::NoCandidate)
}
