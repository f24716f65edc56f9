//! PGN export for game history interchange.
//!
//! Writes the seven-tag roster, the optional `Time`/`Mode`/`SetUp`/`FEN`
//! tags and the movetext. Reading PGN back is not supported.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::Color;
use crate::moves::chess_move::Move;

/// Game termination marker used in the `Result` tag and after the movetext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    #[default]
    Ongoing,
}

impl GameResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }

    pub const fn win_for(color: Color) -> Self {
        match color {
            Color::White => GameResult::WhiteWins,
            Color::Black => GameResult::BlackWins,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameResult {
    type Err = ChessErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" => Ok(GameResult::Draw),
            "*" => Ok(GameResult::Ongoing),
            other => Err(ChessErrors::InvalidNotation(format!("invalid game result: {other}"))),
        }
    }
}

/// Everything that goes into the tag section.
#[derive(Debug, Clone)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub started: NaiveDateTime,
    pub round: u32,
    pub white: String,
    pub black: String,
    pub result: GameResult,
    /// Only set when the game did not start from the standard position.
    pub initial_fen: Option<String>,
}

/// Where the movetext numbering starts.
#[derive(Debug, Clone, Copy)]
pub struct MovetextStart {
    pub active_color: Color,
    pub fullmove_number: u32,
}

pub fn write_pgn(headers: &PgnHeaders, start: MovetextStart, moves: &[Move]) -> String {
    let mut out = String::new();

    let date = headers.started.format("%Y.%m.%d").to_string();
    let time = headers.started.format("%H:%M:%S").to_string();
    let round = headers.round.to_string();

    let mut tags: Vec<(&str, &str)> = vec![
        ("Event", headers.event.as_str()),
        ("Site", headers.site.as_str()),
        ("Date", date.as_str()),
        ("Round", round.as_str()),
        ("White", headers.white.as_str()),
        ("Black", headers.black.as_str()),
        ("Result", headers.result.as_str()),
        ("Time", time.as_str()),
        ("Mode", "ICS"),
    ];
    if let Some(fen) = &headers.initial_fen {
        tags.push(("SetUp", "1"));
        tags.push(("FEN", fen.as_str()));
    }

    for (key, value) in tags {
        out.push_str(&format!("[{} \"{}\"]\n", key, escape_pgn_value(value)));
    }
    out.push('\n');

    out.push_str(&write_movetext(start, moves, headers.result));
    out.push('\n');
    out
}

/// Move numbers, SAN tokens and the trailing result (omitted while ongoing).
pub fn write_movetext(start: MovetextStart, moves: &[Move], result: GameResult) -> String {
    let mut tokens = Vec::<String>::with_capacity(moves.len() * 3 / 2 + 2);
    let mut color = start.active_color;
    let mut number = start.fullmove_number;

    if color == Color::Black {
        tokens.push(format!("{number}..."));
    }

    for mv in moves {
        if color == Color::White {
            tokens.push(format!("{number}."));
        } else {
            number += 1;
        }
        tokens.push(mv.to_san());
        color = color.opposite();
    }

    if result != GameResult::Ongoing {
        tokens.push(result.as_str().to_owned());
    }

    tokens.join(" ")
}

fn escape_pgn_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{write_movetext, write_pgn, GameResult, MovetextStart, PgnHeaders};
    use crate::game_state::chess_types::Color;
    use crate::game_state::position::Position;
    use crate::moves::chess_move::Move;

    fn headers(initial_fen: Option<String>, result: GameResult) -> PgnHeaders {
        PgnHeaders {
            event: "Club \"Open\"".to_owned(),
            site: "Local".to_owned(),
            started: NaiveDate::from_ymd_opt(2024, 3, 9)
                .and_then(|date| date.and_hms_opt(14, 5, 7))
                .expect("test timestamp should be valid"),
            round: 1,
            white: "White".to_owned(),
            black: "Black".to_owned(),
            result,
            initial_fen,
        }
    }

    fn play(position: &mut Position, ucis: &[&str]) -> Vec<Move> {
        ucis.iter()
            .map(|uci| {
                let mv = Move::from_uci(uci, position).expect("test move should parse");
                position.perform(&mv);
                mv
            })
            .collect()
    }

    #[test]
    fn standard_start_header_and_movetext() {
        let mut position = Position::new_game();
        let moves = play(&mut position, &["e2e4", "e7e5", "g1f3"]);
        let start = MovetextStart {
            active_color: Color::White,
            fullmove_number: 1,
        };
        let pgn = write_pgn(&headers(None, GameResult::WhiteWins), start, &moves);

        let expected = "[Event \"Club \\\"Open\\\"\"]\n\
                        [Site \"Local\"]\n\
                        [Date \"2024.03.09\"]\n\
                        [Round \"1\"]\n\
                        [White \"White\"]\n\
                        [Black \"Black\"]\n\
                        [Result \"1-0\"]\n\
                        [Time \"14:05:07\"]\n\
                        [Mode \"ICS\"]\n\
                        \n\
                        1. e2e4 e7e5 2. Ng1f3 1-0\n";
        assert_eq!(pgn, expected);
    }

    #[test]
    fn black_to_move_start_gets_setup_tags_and_ellipsis() {
        let fen = "4k3/8/8/8/8/8/4p3/4K3 b - - 0 12";
        let mut position = Position::from_fen(fen).expect("FEN should parse");
        let moves = play(&mut position, &["e8d7", "e1e2", "d7c6"]);
        let start = MovetextStart {
            active_color: Color::Black,
            fullmove_number: 12,
        };
        let pgn = write_pgn(&headers(Some(fen.to_owned()), GameResult::Ongoing), start, &moves);

        assert!(pgn.contains("[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/4p3/4K3 b - - 0 12\"]\n"));
        assert!(pgn.ends_with("\n\n12... Ke8d7 13. Ke1xe2 Kd7c6\n"));
    }

    #[test]
    fn ongoing_result_is_not_appended() {
        let start = MovetextStart {
            active_color: Color::White,
            fullmove_number: 1,
        };
        assert_eq!(write_movetext(start, &[], GameResult::Ongoing), "");
        assert_eq!(write_movetext(start, &[], GameResult::Draw), "1/2-1/2");
    }

    #[test]
    fn result_text_round_trips() {
        for result in [
            GameResult::WhiteWins,
            GameResult::BlackWins,
            GameResult::Draw,
            GameResult::Ongoing,
        ] {
            assert_eq!(result.as_str().parse::<GameResult>().ok(), Some(result));
        }
        assert!("2-0".parse::<GameResult>().is_err());
        assert_eq!(GameResult::win_for(Color::Black), GameResult::BlackWins);
    }
}
