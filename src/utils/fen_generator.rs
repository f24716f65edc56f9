use crate::game_state::chess_types::*;
use crate::game_state::position::Position;

/// Serializes the normalized position: castling rights and the en-passant
/// target that no longer hold are left out.
pub fn generate_fen(position: &Position) -> String {
    let board = generate_board_field(position);
    let castling = generate_castling_field(position.normalized_castling_rights());
    let en_passant = position
        .normalized_en_passant()
        .map_or_else(|| "-".to_owned(), |square| square.to_string());

    format!(
        "{} {} {} {} {} {}",
        board,
        position.active_color.fen_letter(),
        castling,
        en_passant,
        position.halfmove_clock,
        position.fullmove_number
    )
}

fn generate_board_field(position: &Position) -> String {
    let mut out = String::with_capacity(64);

    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;

        for file in 0..8u8 {
            if let Some(piece) = position.get(Square::from_coords(file, rank)) {
                if empty_count > 0 {
                    out.push(char::from(b'0' + empty_count));
                    empty_count = 0;
                }
                out.push(piece.fen_letter());
            } else {
                empty_count += 1;
            }
        }

        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
        }

        if rank > 0 {
            out.push('/');
        }
    }

    out
}

fn generate_castling_field(rights: CastlingRights) -> String {
    let out: String = [
        (CASTLE_WHITE_KINGSIDE, 'K'),
        (CASTLE_WHITE_QUEENSIDE, 'Q'),
        (CASTLE_BLACK_KINGSIDE, 'k'),
        (CASTLE_BLACK_QUEENSIDE, 'q'),
    ]
    .iter()
    .filter(|(flag, _)| rights & flag != 0)
    .map(|(_, letter)| *letter)
    .collect();

    if out.is_empty() {
        "-".to_owned()
    } else {
        out
    }
}
