//! Move-oracle abstraction used by the turn driver.
//!
//! An oracle is anything that, told a position, answers with a move in UCI
//! long algebraic notation: an engine subprocess, a random mover, a remote
//! player. Oracles are shared between games through [`SharedOracle`], which
//! also tracks game boundaries so `new_game` is sent exactly when needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use log::debug;

use crate::chess_errors::ChessErrors;
use crate::game::game::GameId;

/// How long the oracle may think.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(Duration),
    /// Whatever the oracle does without a limit (bounded by its own timeout).
    #[default]
    EngineDefault,
}

pub trait MoveOracle: Send {
    fn name(&self) -> String;

    /// Signals that the following positions belong to a different game.
    fn new_game(&mut self) -> Result<(), ChessErrors>;

    fn position_fen(&mut self, fen: &str) -> Result<(), ChessErrors>;

    /// Chosen move for the last position, as UCI LAN.
    fn best_move(&mut self, limit: SearchLimit) -> Result<String, ChessErrors>;

    /// Releases the oracle's resources. Calling it twice is a no-op.
    fn close(&mut self) {}
}

struct OracleSlot {
    oracle: Box<dyn MoveOracle>,
    last_game: Option<GameId>,
}

/// Cloneable handle to an oracle that may serve several seats and games.
///
/// The slot stays locked for a whole search. The name is read once up front
/// and closing never waits for the lock, so neither blocks the game's owner.
#[derive(Clone)]
pub struct SharedOracle {
    slot: Arc<Mutex<OracleSlot>>,
    name: Arc<str>,
    closing: Arc<AtomicBool>,
}

impl SharedOracle {
    pub fn new(oracle: impl MoveOracle + 'static) -> Self {
        Self::from_boxed(Box::new(oracle))
    }

    pub fn from_boxed(oracle: Box<dyn MoveOracle>) -> Self {
        let name = Arc::from(oracle.name());
        Self {
            slot: Arc::new(Mutex::new(OracleSlot {
                oracle,
                last_game: None,
            })),
            name,
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, OracleSlot>, ChessErrors> {
        self.slot
            .lock()
            .map_err(|_| ChessErrors::OracleFailure("oracle lock poisoned".to_owned()))
    }

    /// Name the oracle reported when it was wrapped.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Announces a new game if `game` differs from the last one served, sets
    /// the position and asks for a move.
    pub fn choose_move(
        &self,
        game: GameId,
        fen: &str,
        limit: SearchLimit,
    ) -> Result<String, ChessErrors> {
        let mut slot = self.lock()?;
        if self.is_closing() {
            return Err(ChessErrors::OracleFailure(format!("{} is closed", self.name)));
        }
        if slot.last_game != Some(game) {
            debug!("oracle {} starts game {game}", self.name);
            slot.oracle.new_game()?;
            slot.last_game = Some(game);
        }
        slot.oracle.position_fen(fen)?;
        let answer = slot.oracle.best_move(limit);

        if self.is_closing() {
            debug!("closing {} after its search", self.name);
            slot.oracle.close();
        }
        answer
    }

    /// Closes the oracle, or marks it to be closed by the search currently
    /// holding it.
    pub fn close(&self) {
        self.closing.store(true, Ordering::Release);
        let mut slot = match self.slot.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("{} is searching, close deferred", self.name);
                return;
            }
        };
        slot.oracle.close();
    }

    pub fn ptr_eq(&self, other: &SharedOracle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedOracle;
    use super::{SearchLimit, SharedOracle};
    use crate::game::game::GameId;

    #[test]
    fn new_game_only_on_boundary_change() {
        let (oracle, calls) = ScriptedOracle::new(&["e2e4", "d2d4", "c2c4"]);
        let shared = SharedOracle::new(oracle);
        let first = GameId::next();
        let second = GameId::next();

        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(shared.choose_move(first, fen, SearchLimit::Depth(3)).ok(), Some("e2e4".to_owned()));
        assert_eq!(shared.choose_move(first, fen, SearchLimit::Depth(3)).ok(), Some("d2d4".to_owned()));
        assert_eq!(shared.choose_move(second, fen, SearchLimit::EngineDefault).ok(), Some("c2c4".to_owned()));
        assert!(shared.choose_move(second, fen, SearchLimit::EngineDefault).is_err());

        let calls = calls.lock().expect("call log should not be poisoned");
        let new_games = calls.iter().filter(|call| *call == "new_game").count();
        assert_eq!(new_games, 2);
        assert_eq!(calls[0], "new_game");
        assert_eq!(calls[1], format!("position {fen}"));
        assert_eq!(calls[2], "best_move Depth(3)");
    }

    #[test]
    fn clones_share_the_oracle() {
        let (oracle, calls) = ScriptedOracle::new(&[]);
        let shared = SharedOracle::new(oracle);
        let clone = shared.clone();
        assert!(shared.ptr_eq(&clone));
        assert_eq!(clone.name(), "Scripted");
        clone.close();
        assert!(shared.is_closing());
        assert_eq!(
            calls.lock().expect("call log should not be poisoned").as_slice(),
            ["close".to_owned()]
        );
        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        assert!(shared.choose_move(GameId::next(), fen, SearchLimit::Depth(1)).is_err());
    }
}
