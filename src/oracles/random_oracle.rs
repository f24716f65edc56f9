//! Random-move oracle.
//!
//! Picks uniformly among the legal moves of the last position it was told.
//! Used for diagnostics, integration tests and as a sparring partner when no
//! engine is configured.

use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chess_errors::ChessErrors;
use crate::game_state::position::Position;
use crate::oracles::move_oracle::{MoveOracle, SearchLimit};

pub struct RandomOracle {
    rng: StdRng,
    position: Option<Position>,
}

impl RandomOracle {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            position: None,
        }
    }

    /// Reproducible move sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            position: None,
        }
    }
}

impl Default for RandomOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveOracle for RandomOracle {
    fn name(&self) -> String {
        "Random Mover".to_owned()
    }

    fn new_game(&mut self) -> Result<(), ChessErrors> {
        self.position = None;
        Ok(())
    }

    fn position_fen(&mut self, fen: &str) -> Result<(), ChessErrors> {
        self.position = Some(Position::from_fen(fen)?);
        Ok(())
    }

    fn best_move(&mut self, _limit: SearchLimit) -> Result<String, ChessErrors> {
        let position = self
            .position
            .as_ref()
            .ok_or_else(|| ChessErrors::OracleFailure("no position set".to_owned()))?;

        let legal_moves = position.legal_moves();
        let picked = legal_moves
            .as_slice()
            .choose(&mut self.rng)
            .ok_or_else(|| ChessErrors::OracleFailure("no legal moves".to_owned()))?;
        Ok(picked.to_uci())
    }
}
