//! Display-side board contract and an in-memory implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::CoreConfig;
use crate::game_state::chess_types::*;
use crate::game_state::position::Position;
use crate::surface::surface_listener::SurfaceEvent;

/// A board a game can be mirrored onto: a GUI, a physical board, a world in
/// some host application.
pub trait BoardSurface: Send {
    fn get(&self, square: Square) -> Option<Piece>;

    fn set(&mut self, square: Square, piece: Option<Piece>);

    /// Moves whatever stands on `from` to `to`, replacing anything there.
    fn move_piece(&mut self, from: Square, to: Square) {
        let piece = self.get(from);
        self.set(from, None);
        self.set(to, piece);
    }
}

/// Grid of surface tokens kept in memory.
///
/// Clones share the same grid, so a host can keep a handle while the game
/// owns another one.
#[derive(Clone)]
pub struct VirtualSurface {
    config: Arc<CoreConfig>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl VirtualSurface {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            config: Arc::new(config.clone()),
            tokens: Arc::new(Mutex::new(vec![None; 64])),
        }
    }

    pub fn from_position(position: &Position, config: &CoreConfig) -> Self {
        let mut surface = Self::new(config);
        for (square, piece) in position.pieces() {
            surface.set(square, Some(piece));
        }
        surface
    }

    fn grid(&self) -> MutexGuard<'_, Vec<Option<String>>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token_at(&self, square: Square) -> Option<String> {
        self.grid()[square.index()].clone()
    }

    /// Lifts the token off `square`, as a user picking up a piece would.
    pub fn lift(&self, square: Square) -> Option<SurfaceEvent> {
        self.grid()[square.index()]
            .take()
            .map(|token| SurfaceEvent::Remove { square, token })
    }

    /// Puts `token` on `square`, as a user dropping a piece would.
    pub fn drop_token(&self, square: Square, token: &str) -> SurfaceEvent {
        self.grid()[square.index()] = Some(token.to_owned());
        SurfaceEvent::Place {
            square,
            token: token.to_owned(),
        }
    }

    /// Pieces currently on the surface, rebuilt as a board-only position.
    pub fn snapshot(&self) -> Position {
        let mut position = Position::new_empty();
        for square in Square::all() {
            position.set(square, self.get(square));
        }
        position
    }
}

impl BoardSurface for VirtualSurface {
    fn get(&self, square: Square) -> Option<Piece> {
        self.grid()[square.index()]
            .as_deref()
            .and_then(|token| self.config.piece_for_token(token))
    }

    fn set(&mut self, square: Square, piece: Option<Piece>) {
        let token = piece.map(|piece| self.config.token_for(piece));
        self.grid()[square.index()] = token;
    }
}
