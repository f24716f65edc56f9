//! FEN-to-Position parser.
//!
//! Builds a [`Position`] from a Forsyth-Edwards Notation string. Fields after
//! the board are taken verbatim; stale castling or en-passant flags are only
//! dropped when the position is serialized or played on. The two clock
//! fields may be omitted, as many tools do, and then default to `0 1`.

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::utils::algebraic::algebraic_to_square;

pub fn parse_fen(fen: &str) -> Result<Position, ChessErrors> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or_else(|| invalid("missing board layout in FEN"))?;
    let side_part = parts.next().ok_or_else(|| invalid("missing side-to-move in FEN"))?;
    let castling_part = parts
        .next()
        .ok_or_else(|| invalid("missing castling rights in FEN"))?;
    let en_passant_part = parts
        .next()
        .ok_or_else(|| invalid("missing en-passant square in FEN"))?;
    let halfmove_part = parts.next().unwrap_or("0");
    let fullmove_part = parts.next().unwrap_or("1");

    if parts.next().is_some() {
        return Err(invalid("FEN has extra trailing fields"));
    }

    let mut position = Position::new_empty();

    parse_board(board_part, &mut position)?;
    position.active_color = parse_side_to_move(side_part)?;
    position.castling_rights = parse_castling_rights(castling_part)?;
    position.en_passant = parse_en_passant_square(en_passant_part)?;
    position.halfmove_clock = halfmove_part
        .parse::<u32>()
        .map_err(|_| invalid(&format!("invalid halfmove clock: {halfmove_part}")))?;
    position.fullmove_number = fullmove_part
        .parse::<u32>()
        .ok()
        .filter(|number| *number > 0)
        .ok_or_else(|| invalid(&format!("invalid fullmove number: {fullmove_part}")))?;

    Ok(position)
}

fn invalid(message: &str) -> ChessErrors {
    ChessErrors::InvalidNotation(message.to_owned())
}

fn parse_board(board_part: &str, position: &mut Position) -> Result<(), ChessErrors> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(invalid("board layout must contain 8 ranks"));
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7u8.saturating_sub(fen_rank_idx as u8);
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(invalid(&format!("invalid empty-square count '{ch}'")));
                }
                file += empty_count as u8;
                if file > 8 {
                    return Err(invalid(&format!("rank '{rank_str}' has too many files")));
                }
                continue;
            }

            let piece = Piece::from_letter(ch)
                .ok_or_else(|| invalid(&format!("invalid piece character '{ch}' in board layout")))?;

            let square = Square::new(file, board_rank)
                .ok_or_else(|| invalid(&format!("rank '{rank_str}' has too many files")))?;
            position.set(square, Some(piece));
            file += 1;
        }

        if file != 8 {
            return Err(invalid(&format!("rank '{rank_str}' does not sum to 8 files")));
        }
    }

    Ok(())
}

fn parse_side_to_move(side_part: &str) -> Result<Color, ChessErrors> {
    let mut chars = side_part.chars();
    let color = match (chars.next(), chars.next()) {
        (Some(letter), None) => Color::from_fen_letter(letter),
        _ => None,
    };
    color.ok_or_else(|| invalid(&format!("invalid side-to-move field: {side_part}")))
}

fn parse_castling_rights(castling_part: &str) -> Result<CastlingRights, ChessErrors> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights: CastlingRights = 0;

    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_WHITE_KINGSIDE,
            'Q' => rights |= CASTLE_WHITE_QUEENSIDE,
            'k' => rights |= CASTLE_BLACK_KINGSIDE,
            'q' => rights |= CASTLE_BLACK_QUEENSIDE,
            _ => return Err(invalid(&format!("invalid castling rights character: {ch}"))),
        }
    }

    Ok(rights)
}

fn parse_en_passant_square(en_passant_part: &str) -> Result<Option<Square>, ChessErrors> {
    if en_passant_part == "-" {
        return Ok(None);
    }

    Ok(Some(algebraic_to_square(en_passant_part)?))
}
