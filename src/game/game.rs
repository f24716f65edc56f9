//! A game: a position, the moves played on it, players and PGN metadata.
//!
//! `Game` owns its [`Position`] outright. Oracles reach it only through the
//! turn driver (see `game::turn_driver`) and surfaces only through
//! [`Game::play_move`] and [`Game::post_move`], so all mutation happens on the
//! thread that owns the game.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use log::{debug, info};

use crate::chess_errors::ChessErrors;
use crate::config::CoreConfig;
use crate::game_state::chess_rules::STARTING_POSITION_FEN;
use crate::game_state::chess_types::{Color, Square};
use crate::game_state::position::{Outcome, Position};
use crate::moves::chess_move::Move;
use crate::oracles::move_oracle::{SearchLimit, SharedOracle};
use crate::surface::board_surface::BoardSurface;
pub use crate::utils::pgn::GameResult;
use crate::utils::pgn::{write_pgn, MovetextStart, PgnHeaders};

pub const DEFAULT_EVENT: &str = "Frame Chess Game";

/// Process-unique game identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(u64);

impl GameId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GameId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An oracle bound to one colour of one game.
#[derive(Clone)]
pub struct PlayerSeat {
    pub oracle: SharedOracle,
    pub limit: SearchLimit,
}

pub struct Game {
    id: GameId,
    position: Position,
    moves: Vec<Move>,

    initial_fen: Option<String>,
    initial_color: Color,
    initial_fullmove: u32,

    players: [Option<PlayerSeat>; 2],
    surface: Option<Box<dyn BoardSurface>>,

    event: String,
    round: u32,
    started: NaiveDateTime,
    result: GameResult,

    pub(crate) turn_in_flight: Arc<AtomicBool>,
}

impl Game {
    /// Starts a game over `position`, capturing it as the initial state.
    pub fn new(position: Position) -> Self {
        let fen = position.to_fen();
        let initial_fen = (fen != STARTING_POSITION_FEN).then_some(fen);
        Self {
            id: GameId::next(),
            initial_color: position.active_color,
            initial_fullmove: position.fullmove_number,
            initial_fen,
            position,
            moves: Vec::new(),
            players: [None, None],
            surface: None,
            event: DEFAULT_EVENT.to_owned(),
            round: 1,
            started: Local::now().naive_local(),
            result: GameResult::Ongoing,
            turn_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Standard starting position with the configured site.
    pub fn new_standard(config: &CoreConfig) -> Self {
        Self::with_config(Position::new_game(), config)
    }

    pub fn with_config(mut position: Position, config: &CoreConfig) -> Self {
        position.set_site(&config.default_site);
        Self::new(position)
    }

    pub fn from_fen(fen: &str, config: &CoreConfig) -> Result<Self, ChessErrors> {
        Ok(Self::with_config(Position::from_fen(fen)?, config))
    }

    // --- Accessors ---

    #[inline]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn initial_fen(&self) -> &str {
        self.initial_fen.as_deref().unwrap_or(STARTING_POSITION_FEN)
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn started(&self) -> NaiveDateTime {
        self.started
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn is_over(&self) -> bool {
        self.result != GameResult::Ongoing
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.turn_in_flight.load(Ordering::Acquire)
    }

    // --- Header fields ---

    pub fn set_event(&mut self, event: &str) {
        self.event = event.to_owned();
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    pub fn set_result(&mut self, result: GameResult) {
        self.result = result;
    }

    pub fn set_site(&mut self, site: &str) {
        self.position.set_site(site);
    }

    /// Resets the start timestamp to now.
    pub fn restart_clock(&mut self) {
        self.started = Local::now().naive_local();
    }

    // --- Players ---

    pub fn bind_player(&mut self, color: Color, oracle: SharedOracle, limit: SearchLimit) {
        self.players[color.index()] = Some(PlayerSeat { oracle, limit });
    }

    pub fn unbind_player(&mut self, color: Color) -> Option<PlayerSeat> {
        self.players[color.index()].take()
    }

    pub fn player(&self, color: Color) -> Option<&PlayerSeat> {
        self.players[color.index()].as_ref()
    }

    /// Oracle name, or the colour's name for an unbound seat.
    pub fn player_name(&self, color: Color) -> String {
        self.player(color)
            .map(|seat| seat.oracle.name().to_owned())
            .unwrap_or_else(|| format!("{color:?}"))
    }

    /// Closes every bound oracle. Seats stay bound so the PGN keeps the
    /// players' names. Oracles shared with other games are closed for them
    /// too; one that is mid-search closes when the search returns.
    pub fn close_players(&mut self) {
        for seat in self.players.iter().flatten() {
            seat.oracle.close();
        }
    }

    // --- Surface ---

    /// Attaches a surface and paints the current position onto it.
    pub fn attach_surface(&mut self, mut surface: Box<dyn BoardSurface>) {
        for square in Square::all() {
            surface.set(square, self.position.get(square));
        }
        self.surface = Some(surface);
    }

    pub fn detach_surface(&mut self) -> Option<Box<dyn BoardSurface>> {
        self.surface.take()
    }

    pub fn surface(&self) -> Option<&dyn BoardSurface> {
        self.surface.as_deref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut (dyn BoardSurface + 'static)> {
        self.surface.as_deref_mut()
    }

    // --- Moves ---

    /// Applies a move and mirrors the resulting board onto the attached
    /// surface. Illegal moves are logged and applied (see [`Position::perform`]).
    pub fn play_move(&mut self, mv: Move) {
        let before = self.position.clone();
        self.position.perform(&mv);
        if let Some(surface) = self.surface.as_mut() {
            for square in Square::all() {
                let piece = self.position.get(square);
                if before.get(square) != piece {
                    surface.set(square, piece);
                }
            }
        }
        self.record(mv);
    }

    /// Strict form of [`Game::play_move`].
    pub fn try_play_move(&mut self, mv: Move) -> Result<(), ChessErrors> {
        if !self.position.is_legal_for_mover(&mv) {
            return Err(ChessErrors::IllegalMove(mv.to_san()));
        }
        self.play_move(mv);
        Ok(())
    }

    /// Records a move that already happened on the surface; the surface is
    /// not written back.
    pub fn post_move(&mut self, mv: Move) {
        self.position.perform(&mv);
        self.record(mv);
    }

    fn record(&mut self, mv: Move) {
        debug!("game {} ply {}: {}", self.id, self.moves.len() + 1, mv.to_san());
        self.moves.push(mv);

        if self.result != GameResult::Ongoing {
            return;
        }
        let result = match self.position.outcome() {
            Some(Outcome::Checkmate { winner }) => GameResult::win_for(winner),
            Some(Outcome::Stalemate) => GameResult::Draw,
            None => return,
        };
        info!("game {} over: {result}", self.id);
        self.result = result;
    }

    // --- Export ---

    pub fn to_pgn(&self) -> String {
        let headers = PgnHeaders {
            event: self.event.clone(),
            site: self.position.site.to_string(),
            started: self.started,
            round: self.round,
            white: self.player_name(Color::White),
            black: self.player_name(Color::Black),
            result: self.result,
            initial_fen: self.initial_fen.clone(),
        };
        let start = MovetextStart {
            active_color: self.initial_color,
            fullmove_number: self.initial_fullmove,
        };
        write_pgn(&headers, start, &self.moves)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Game, GameId, GameResult};
    use crate::config::CoreConfig;
    use crate::game_state::chess_types::*;
    use crate::game_state::position::Position;
    use crate::moves::chess_move::Move;
    use crate::oracles::move_oracle::testing::ScriptedOracle;
    use crate::oracles::move_oracle::{SearchLimit, SharedOracle};
    use crate::surface::board_surface::BoardSurface;

    fn sq(text: &str) -> Square {
        text.parse().expect("test square should parse")
    }

    /// Surface that records every write.
    #[derive(Clone, Default)]
    struct RecordingSurface {
        writes: Arc<Mutex<Vec<(Square, Option<Piece>)>>>,
    }

    impl BoardSurface for RecordingSurface {
        fn get(&self, _square: Square) -> Option<Piece> {
            None
        }

        fn set(&mut self, square: Square, piece: Option<Piece>) {
            self.writes
                .lock()
                .expect("write log should not be poisoned")
                .push((square, piece));
        }
    }

    fn play_uci(game: &mut Game, uci: &str) {
        let mv = Move::from_uci(uci, game.position()).expect("test move should parse");
        game.play_move(mv);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(GameId::next(), GameId::next());
        let a = Game::new(Position::new_game());
        let b = Game::new(Position::new_game());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn standard_start_has_no_setup_tags() {
        let mut game = Game::new_standard(&CoreConfig::default());
        play_uci(&mut game, "e2e4");
        play_uci(&mut game, "e7e5");

        let pgn = game.to_pgn();
        assert!(pgn.starts_with("[Event \"Frame Chess Game\"]\n[Site \"Local\"]\n"));
        assert!(pgn.contains("[Round \"1\"]\n[White \"White\"]\n[Black \"Black\"]\n[Result \"*\"]\n"));
        assert!(pgn.contains("[Mode \"ICS\"]\n"));
        assert!(!pgn.contains("SetUp"));
        assert!(pgn.ends_with("\n\n1. e2e4 e7e5\n"));
    }

    #[test]
    fn black_to_move_start_emits_setup_and_ellipsis() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 2 2";
        let mut game = Game::from_fen(fen, &CoreConfig::default()).expect("FEN should parse");
        game.set_event("Casual");
        game.set_round(3);
        play_uci(&mut game, "g8f6");
        play_uci(&mut game, "f3e5");

        let pgn = game.to_pgn();
        assert!(pgn.contains("[SetUp \"1\"]\n"));
        assert!(pgn.contains(&format!("[FEN \"{fen}\"]\n")));
        assert!(pgn.contains("[Event \"Casual\"]\n"));
        assert!(pgn.contains("[Round \"3\"]\n"));
        assert!(pgn.ends_with("\n\n2... Ng8f6 3. Nf3xe5\n"));
        assert_eq!(game.initial_fen(), fen);
    }

    #[test]
    fn checkmate_sets_result() {
        let mut game = Game::new(Position::new_game());
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            play_uci(&mut game, uci);
        }
        assert_eq!(game.result(), GameResult::BlackWins);
        assert!(game.is_over());
        assert!(game.to_pgn().ends_with(" 0-1\n"));
    }

    #[test]
    fn stalemate_sets_draw() {
        let mut game = Game::new(
            Position::from_fen("7k/8/5Q1K/8/8/8/8/8 w - - 0 1").expect("FEN should parse"),
        );
        play_uci(&mut game, "f6g6");
        assert_eq!(game.result(), GameResult::Draw);
    }

    #[test]
    fn play_move_mirrors_only_changed_squares() {
        let surface = RecordingSurface::default();
        let writes = Arc::clone(&surface.writes);
        let mut game = Game::new(Position::new_game());
        game.attach_surface(Box::new(surface));
        assert_eq!(writes.lock().expect("write log should not be poisoned").len(), 64);
        writes.lock().expect("write log should not be poisoned").clear();

        play_uci(&mut game, "e2e4");
        let log = writes.lock().expect("write log should not be poisoned").clone();
        assert_eq!(log.len(), 2);
        assert!(log.contains(&(sq("e2"), None)));
        assert!(log.contains(&(sq("e4"), Some(Piece::new(Color::White, PieceKind::Pawn)))));
    }

    #[test]
    fn post_move_does_not_touch_the_surface() {
        let surface = RecordingSurface::default();
        let writes = Arc::clone(&surface.writes);
        let mut game = Game::new(Position::new_game());
        game.attach_surface(Box::new(surface));
        writes.lock().expect("write log should not be poisoned").clear();

        let mv = Move::from_uci("g1f3", game.position()).expect("g1f3 should parse");
        game.post_move(mv);
        assert!(writes.lock().expect("write log should not be poisoned").is_empty());
        assert_eq!(game.moves().len(), 1);
        assert_eq!(game.position().active_color, Color::Black);
    }

    #[test]
    fn strict_play_refuses_illegal_moves() {
        let mut game = Game::new(Position::new_game());
        let jump = Move::normal(PieceKind::Queen, sq("d1"), sq("d5"), false);
        assert!(game.try_play_move(jump).is_err());
        let out_of_turn = Move::normal(PieceKind::Pawn, sq("e7"), sq("e5"), false);
        assert!(game.try_play_move(out_of_turn).is_err());
        assert!(game.moves().is_empty());
    }

    #[test]
    fn player_names_come_from_oracles() {
        let mut game = Game::new(Position::new_game());
        let (oracle, calls) = ScriptedOracle::new(&[]);
        game.bind_player(Color::Black, SharedOracle::new(oracle), SearchLimit::Depth(1));
        assert_eq!(game.player_name(Color::White), "White");
        assert_eq!(game.player_name(Color::Black), "Scripted");
        assert!(game.to_pgn().contains("[Black \"Scripted\"]"));

        game.close_players();
        assert!(game.player(Color::Black).is_some());
        assert_eq!(game.player_name(Color::Black), "Scripted");
        assert!(game.to_pgn().contains("[Black \"Scripted\"]"));
        assert_eq!(
            calls.lock().expect("call log should not be poisoned").last().map(String::as_str),
            Some("close")
        );
    }

    #[test]
    fn site_comes_from_config() {
        let config = CoreConfig {
            default_site: "Club".to_owned(),
            ..CoreConfig::default()
        };
        let game = Game::new_standard(&config);
        assert!(game.to_pgn().contains("[Site \"Club\"]"));
    }
}
