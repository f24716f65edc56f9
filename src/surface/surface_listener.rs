//! Turns piece pick-ups and drops on a board surface into moves.
//!
//! A surface reports what the user did one token at a time. The listener
//! resolves tokens through [`CoreConfig`], keeps a small tracker per game and,
//! once a piece lands on a new square, builds the matching [`Move`] and hands
//! it to [`Game::post_move`]. Side effects a human would not perform by hand
//! (the pawn taken en passant, the rook of a castle) are applied to the
//! game's surface by the listener itself.

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::CoreConfig;
use crate::game::game::{Game, GameId};
use crate::game_state::chess_rules::{
    KINGSIDE_CASTLE_FILES, KINGSIDE_ROOK_FILE, KING_START_FILE, QUEENSIDE_CASTLE_FILES,
    QUEENSIDE_ROOK_FILE,
};
use crate::game_state::chess_types::*;
use crate::moves::chess_move::Move;

/// Something that happened to a single square of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Place { square: Square, token: String },
    Remove { square: Square, token: String },
}

/// Half-finished move of one game.
#[derive(Debug, Default, Clone, Copy)]
struct MoveTracker {
    from: Option<(Square, PieceKind)>,
    captured: Option<Square>,
}

pub struct SurfaceListener {
    config: CoreConfig,
    worlds: HashMap<String, Vec<GameId>>,
    trackers: HashMap<GameId, MoveTracker>,
}

impl SurfaceListener {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            config: config.clone(),
            worlds: HashMap::new(),
            trackers: HashMap::new(),
        }
    }

    /// Routes events of `world` to `game`. Registering twice is harmless.
    pub fn register(&mut self, world: &str, game: GameId) {
        let games = self.worlds.entry(world.to_owned()).or_default();
        if !games.contains(&game) {
            games.push(game);
        }
        self.trackers.entry(game).or_default();
    }

    /// Forgets `game` in every world.
    pub fn unregister(&mut self, game: GameId) {
        self.worlds.retain(|_, games| {
            games.retain(|registered| *registered != game);
            !games.is_empty()
        });
        self.trackers.remove(&game);
    }

    pub fn games_in(&self, world: &str) -> &[GameId] {
        self.worlds.get(world).map_or(&[], Vec::as_slice)
    }

    /// Names a move with the configured piece names, e.g. `Knight c3-d5`.
    pub fn describe(&self, mv: &Move) -> String {
        let name = |kind: PieceKind| self.config.display_name(kind);
        match mv.unannotated() {
            Move::Normal { kind, from, to, .. } => format!("{} {from}-{to}", name(*kind)),
            Move::Promotion {
                from,
                to,
                promoted_to,
                ..
            } => format!(
                "{} {from}-{to} to {}",
                name(PieceKind::Pawn),
                name(*promoted_to)
            ),
            Move::Castle { queenside, .. } => {
                let side = if *queenside { "queenside" } else { "kingside" };
                format!("{} castles {side}", name(PieceKind::King))
            }
            Move::Checked { .. } => mv.to_san(),
        }
    }

    /// Feeds one surface event of `world` to `game`. Returns the move when the
    /// event completes one.
    pub fn handle(&mut self, world: &str, game: &mut Game, event: &SurfaceEvent) -> Option<Move> {
        if !self.games_in(world).contains(&game.id()) {
            trace!("{world}: game {} is not registered, ignoring {event:?}", game.id());
            return None;
        }

        let (square, token, placed) = match event {
            SurfaceEvent::Place { square, token } => (*square, token, true),
            SurfaceEvent::Remove { square, token } => (*square, token, false),
        };
        let Some(piece) = self.config.piece_for_token(token) else {
            trace!("{world}: unknown token '{token}' on {square}");
            return None;
        };

        let tracker = self.trackers.entry(game.id()).or_default();
        if !placed {
            if piece.color == game.position().active_color {
                tracker.from = Some((square, piece.kind));
            } else {
                tracker.captured = Some(square);
            }
            return None;
        }

        let (from, from_kind) = tracker.from?;
        if from == square {
            // Put back where it was picked up.
            *tracker = MoveTracker::default();
            return None;
        }
        let captured = tracker.captured;
        *tracker = MoveTracker::default();

        let mv = build_move(game, from, from_kind, square, piece.kind, captured);
        let mv = match game.position().check_status_after(&mv) {
            Some(status) => mv.with_check_status(status),
            None => mv,
        };
        debug!(
            "{world}: game {} surface move {} ({})",
            game.id(),
            mv.to_san(),
            self.describe(&mv)
        );
        game.post_move(mv.clone());
        Some(mv)
    }
}

fn build_move(
    game: &mut Game,
    from: Square,
    from_kind: PieceKind,
    to: Square,
    to_kind: PieceKind,
    captured: Option<Square>,
) -> Move {
    let color = game.position().active_color;
    let back_rank = color.back_rank();

    let mut capture = captured == Some(to);
    if !capture && from_kind == PieceKind::Pawn && to.file() != from.file() {
        let taken = Square::from_coords(to.file(), from.rank());
        if let Some(surface) = game.surface_mut() {
            surface.set(taken, None);
        }
        capture = true;
    }

    if to_kind != from_kind {
        return Move::promotion(from, to, capture, to_kind);
    }

    let castle_start = from_kind == PieceKind::King
        && from == Square::from_coords(KING_START_FILE, back_rank);
    if castle_start && to.file() == KINGSIDE_CASTLE_FILES.0 {
        relocate_rook(game, back_rank, KINGSIDE_ROOK_FILE, KINGSIDE_CASTLE_FILES.1);
        return Move::castle(color, false);
    }
    if castle_start && to.file() == QUEENSIDE_CASTLE_FILES.0 {
        relocate_rook(game, back_rank, QUEENSIDE_ROOK_FILE, QUEENSIDE_CASTLE_FILES.1);
        return Move::castle(color, true);
    }

    Move::normal(from_kind, from, to, capture)
}

fn relocate_rook(game: &mut Game, rank: u8, from_file: u8, to_file: u8) {
    if let Some(surface) = game.surface_mut() {
        surface.move_piece(
            Square::from_coords(from_file, rank),
            Square::from_coords(to_file, rank),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{SurfaceEvent, SurfaceListener};
    use crate::config::CoreConfig;
    use crate::game::game::Game;
    use crate::game_state::chess_types::*;
    use crate::game_state::position::Position;
    use crate::moves::chess_move::{CheckStatus, Move};
    use crate::surface::board_surface::VirtualSurface;

    const WORLD: &str = "overworld";

    fn sq(text: &str) -> Square {
        text.parse().expect("test square should parse")
    }

    fn setup(fen: &str) -> (Game, VirtualSurface, SurfaceListener) {
        let config = CoreConfig::default();
        let mut game = Game::from_fen(fen, &config).expect("test FEN should parse");
        let surface = VirtualSurface::new(&config);
        game.attach_surface(Box::new(surface.clone()));
        let mut listener = SurfaceListener::new(&config);
        listener.register(WORLD, game.id());
        (game, surface, listener)
    }

    /// Lifts `from` and drops the same token on `to`.
    fn drag(
        listener: &mut SurfaceListener,
        game: &mut Game,
        surface: &VirtualSurface,
        from: &str,
        to: &str,
    ) -> Option<Move> {
        let lifted = surface.lift(sq(from)).expect("a token should be on the from-square");
        let token = match &lifted {
            SurfaceEvent::Remove { token, .. } => token.clone(),
            SurfaceEvent::Place { .. } => unreachable!("lift emits a removal"),
        };
        assert_eq!(listener.handle(WORLD, game, &lifted), None);
        let dropped = surface.drop_token(sq(to), &token);
        listener.handle(WORLD, game, &dropped)
    }

    #[test]
    fn quiet_move_is_posted() {
        let (mut game, surface, mut listener) =
            setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let mv = drag(&mut listener, &mut game, &surface, "e2", "e4").expect("a move should be built");

        assert_eq!(mv, Move::normal(PieceKind::Pawn, sq("e2"), sq("e4"), false));
        assert_eq!(game.moves(), &[mv]);
        assert_eq!(
            game.position().to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn capture_in_either_lift_order() {
        let fen = "4k3/8/8/3p4/8/2N5/8/4K3 w - - 0 1";
        let expected = Move::normal(PieceKind::Knight, sq("c3"), sq("d5"), true);

        let (mut game, surface, mut listener) = setup(fen);
        let victim = surface.lift(sq("d5")).expect("the pawn should be on d5");
        assert_eq!(listener.handle(WORLD, &mut game, &victim), None);
        let mv = drag(&mut listener, &mut game, &surface, "c3", "d5").expect("a move should be built");
        assert_eq!(mv, expected);

        let (mut game, surface, mut listener) = setup(fen);
        let knight = surface.lift(sq("c3")).expect("the knight should be on c3");
        assert_eq!(listener.handle(WORLD, &mut game, &knight), None);
        let victim = surface.lift(sq("d5")).expect("the pawn should be on d5");
        assert_eq!(listener.handle(WORLD, &mut game, &victim), None);
        let dropped = surface.drop_token(sq("d5"), "white_knight");
        assert_eq!(listener.handle(WORLD, &mut game, &dropped), Some(expected));
        assert_eq!(game.position().to_fen(), "4k3/8/8/3N4/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn en_passant_clears_the_taken_pawn() {
        let (mut game, surface, mut listener) =
            setup("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        let mv = drag(&mut listener, &mut game, &surface, "e5", "f6").expect("a move should be built");

        assert_eq!(mv, Move::normal(PieceKind::Pawn, sq("e5"), sq("f6"), true));
        assert_eq!(surface.token_at(sq("f5")), None);
        assert_eq!(
            game.position().to_fen(),
            "rnbqkbnr/ppp1p1pp/5P2/3p4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
        );
    }

    #[test]
    fn swapped_token_is_a_promotion() {
        let (mut game, surface, mut listener) = setup("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let lifted = surface.lift(sq("a7")).expect("the pawn should be on a7");
        assert_eq!(listener.handle(WORLD, &mut game, &lifted), None);
        let dropped = surface.drop_token(sq("a8"), "white_queen");
        let mv = listener
            .handle(WORLD, &mut game, &dropped)
            .expect("a promotion should be built");

        assert_eq!(mv.check_status(), Some(CheckStatus::Check));
        assert_eq!(mv.to_san(), "Pa7a8=Q+");
        assert_eq!(game.position().to_fen(), "Q3k3/8/8/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn king_two_files_castles_and_moves_the_rook() {
        let (mut game, surface, mut listener) = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mv = drag(&mut listener, &mut game, &surface, "e1", "g1").expect("a castle should be built");
        assert_eq!(mv, Move::castle(Color::White, false));
        assert_eq!(surface.token_at(sq("f1")).as_deref(), Some("white_rook"));
        assert_eq!(surface.token_at(sq("h1")), None);

        let mv = drag(&mut listener, &mut game, &surface, "e8", "c8").expect("a castle should be built");
        assert_eq!(mv, Move::castle(Color::Black, true));
        assert_eq!(surface.token_at(sq("d8")).as_deref(), Some("black_rook"));
        assert_eq!(surface.token_at(sq("a8")), None);
        assert_eq!(
            game.position().to_fen(),
            "2kr3r/8/8/8/8/8/8/R4RK1 w - - 2 2"
        );
    }

    #[test]
    fn put_back_and_noise_produce_nothing() {
        let (mut game, surface, mut listener) =
            setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(drag(&mut listener, &mut game, &surface, "g1", "g1"), None);

        let stray = surface.drop_token(sq("e5"), "teapot");
        assert_eq!(listener.handle(WORLD, &mut game, &stray), None);
        let orphan = surface.drop_token(sq("e6"), "white_pawn");
        assert_eq!(listener.handle(WORLD, &mut game, &orphan), None);
        assert!(game.moves().is_empty());
    }

    #[test]
    fn unregistered_games_are_ignored() {
        let (mut game, surface, mut listener) =
            setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let lifted = surface.lift(sq("e2")).expect("the pawn should be on e2");
        assert_eq!(listener.handle("nether", &mut game, &lifted), None);

        listener.unregister(game.id());
        assert!(listener.games_in(WORLD).is_empty());
        assert_eq!(drag(&mut listener, &mut game, &surface, "d2", "d4"), None);
        assert!(game.moves().is_empty());
    }

    #[test]
    fn moves_are_described_with_configured_names() {
        let config = CoreConfig::from_toml_str(
            "[piece_display_names]\nknight = \"Springer\"\nqueen = \"Dame\"",
        )
        .expect("TOML should parse");
        let listener = SurfaceListener::new(&config);

        let jump = Move::normal(PieceKind::Knight, sq("c3"), sq("d5"), true)
            .with_check_status(CheckStatus::Check);
        assert_eq!(listener.describe(&jump), "Springer c3-d5");
        let promotion = Move::promotion(sq("a7"), sq("a8"), false, PieceKind::Queen);
        assert_eq!(listener.describe(&promotion), "Pawn a7-a8 to Dame");
        assert_eq!(
            listener.describe(&Move::castle(Color::Black, true)),
            "King castles queenside"
        );
    }

    #[test]
    fn registry_tracks_worlds() {
        let config = CoreConfig::default();
        let mut listener = SurfaceListener::new(&config);
        let first = Game::new(Position::new_game());
        let second = Game::new(Position::new_game());

        listener.register(WORLD, first.id());
        listener.register(WORLD, second.id());
        listener.register(WORLD, first.id());
        listener.register("nether", second.id());
        assert_eq!(listener.games_in(WORLD), &[first.id(), second.id()]);

        listener.unregister(second.id());
        assert_eq!(listener.games_in(WORLD), &[first.id()]);
        assert!(listener.games_in("nether").is_empty());
    }
}
