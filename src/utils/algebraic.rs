//! Square conversions for algebraic coordinates.
//!
//! Converts between human-readable coordinates (e.g., `e4`) and [`Square`]
//! values reused by the FEN/SAN/UCI/PGN components.

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::Square;

/// Convert algebraic notation (for example: "e4") to a square.
#[inline]
pub fn algebraic_to_square(square: &str) -> Result<Square, ChessErrors> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return Err(ChessErrors::InvalidNotation(format!(
            "invalid algebraic square: {square}"
        )));
    }

    let file = file_from_char(char::from(bytes[0])).ok_or_else(|| {
        ChessErrors::InvalidNotation(format!("invalid algebraic file: {}", char::from(bytes[0])))
    })?;
    let rank = rank_from_char(char::from(bytes[1])).ok_or_else(|| {
        ChessErrors::InvalidNotation(format!("invalid algebraic rank: {}", char::from(bytes[1])))
    })?;

    Ok(Square::from_coords(file, rank))
}

/// Convert a square to algebraic notation (for example: "e4").
#[inline]
pub fn square_to_algebraic(square: Square) -> String {
    let mut out = String::with_capacity(2);
    out.push(char::from(b'a' + square.file()));
    out.push(char::from(b'1' + square.rank()));
    out
}

/// File index for a letter `a..=h`.
#[inline]
pub fn file_from_char(ch: char) -> Option<u8> {
    if ('a'..='h').contains(&ch) {
        Some(ch as u8 - b'a')
    } else {
        None
    }
}

/// Rank index for a digit `1..=8`.
#[inline]
pub fn rank_from_char(ch: char) -> Option<u8> {
    if ('1'..='8').contains(&ch) {
        Some(ch as u8 - b'1')
    } else {
        None
    }
}
