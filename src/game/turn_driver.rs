//! Asynchronous turns: the oracle thinks on a worker thread, the answer is
//! applied on the thread that owns the [`Game`].
//!
//! [`Game::play_turn`] dispatches the request and returns a [`PendingTurn`].
//! The owner later calls [`PendingTurn::wait`] or [`PendingTurn::poll`], which
//! is the only place an oracle answer touches the position. [`PlayLoop`]
//! strings turns together until the game ends, a ply limit is reached or a
//! cancellation flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::chess_errors::ChessErrors;
use crate::game::game::{Game, GameId, GameResult};
use crate::game_state::chess_types::Color;
use crate::moves::chess_move::Move;

type OracleAnswer = Result<String, ChessErrors>;

/// An oracle request in flight for one game.
///
/// Dropping it without waiting abandons the answer and frees the game for the
/// next turn.
pub struct PendingTurn {
    game: GameId,
    color: Color,
    fen: String,
    rx: Receiver<OracleAnswer>,
    worker: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicBool>,
    finished: bool,
}

impl Game {
    /// Asks the oracle bound to the side to move for a move.
    pub fn play_turn(&mut self) -> Result<PendingTurn, ChessErrors> {
        if self.is_over() {
            return Err(ChessErrors::IllegalMove(format!(
                "game {} is already over ({})",
                self.id(),
                self.result()
            )));
        }

        let color = self.position().active_color;
        let seat = self.player(color).cloned().ok_or(ChessErrors::NoPlayer(color))?;

        if self.turn_in_flight.swap(true, Ordering::AcqRel) {
            return Err(ChessErrors::TurnInProgress);
        }

        let game = self.id();
        let fen = self.position().to_fen();
        let (tx, rx) = mpsc::channel();

        let request_fen = fen.clone();
        let spawned = thread::Builder::new()
            .name(format!("oracle-{}-{color:?}", game.value()))
            .spawn(move || {
                let answer = seat.oracle.choose_move(game, &request_fen, seat.limit);
                // The receiver is gone when the turn was abandoned.
                let _ = tx.send(answer);
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(err) => {
                self.turn_in_flight.store(false, Ordering::Release);
                return Err(err.into());
            }
        };
        debug!("game {game}: asked {color:?} for a move on {fen}");

        Ok(PendingTurn {
            game,
            color,
            fen,
            rx,
            worker: Some(worker),
            in_flight: Arc::clone(&self.turn_in_flight),
            finished: false,
        })
    }
}

impl PendingTurn {
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Blocks until the oracle answers, then plays the move on `game`.
    pub fn wait(mut self, game: &mut Game) -> Result<Move, ChessErrors> {
        let answer = self
            .rx
            .recv()
            .unwrap_or_else(|_| Err(ChessErrors::OracleFailure("oracle worker vanished".to_owned())));
        self.finish(game, answer)
    }

    /// Plays the move if the oracle has answered; `Ok(None)` while it is
    /// still thinking or once the turn is already finished.
    pub fn poll(&mut self, game: &mut Game) -> Result<Option<Move>, ChessErrors> {
        if self.finished {
            return Ok(None);
        }
        let answer = match self.rx.try_recv() {
            Ok(answer) => answer,
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(ChessErrors::OracleFailure("oracle worker vanished".to_owned()))
            }
        };
        self.finish(game, answer).map(Some)
    }

    fn finish(&mut self, game: &mut Game, answer: OracleAnswer) -> Result<Move, ChessErrors> {
        self.finished = true;
        self.in_flight.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("oracle worker for game {} panicked", self.game);
            }
        }

        if game.id() != self.game {
            return Err(ChessErrors::IllegalMove(format!(
                "turn of game {} applied to game {}",
                self.game,
                game.id()
            )));
        }
        if game.position().to_fen() != self.fen {
            return Err(ChessErrors::IllegalMove(format!(
                "position of game {} changed while the oracle was thinking",
                self.game
            )));
        }

        let uci = answer?;
        let mv = Move::from_uci_checked(&uci, game.position())?;
        let mv = match game.position().check_status_after(&mv) {
            Some(status) => mv.with_check_status(status),
            None => mv,
        };
        debug!("game {}: {:?} plays {uci} ({})", self.game, self.color, mv.to_san());
        game.play_move(mv.clone());
        Ok(mv)
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.finished {
            debug!("game {}: abandoning pending turn", self.game);
            self.in_flight.store(false, Ordering::Release);
        }
    }
}

/// Why a [`PlayLoop`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    GameOver(GameResult),
    PlyLimit,
    Cancelled,
}

/// Plays turns back to back on the calling thread.
pub struct PlayLoop {
    cancel: Arc<AtomicBool>,
    max_plies: Option<usize>,
}

impl Default for PlayLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayLoop {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            max_plies: None,
        }
    }

    pub fn with_max_plies(mut self, max_plies: usize) -> Self {
        self.max_plies = Some(max_plies);
        self
    }

    /// Flag that stops the loop before its next turn. A turn already handed
    /// to an oracle still completes.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Runs turns on `game`, calling `on_move` after each applied move.
    pub fn run<F>(&self, game: &mut Game, mut on_move: F) -> Result<LoopEnd, ChessErrors>
    where
        F: FnMut(&Game, &Move),
    {
        let mut plies = 0usize;
        let end = loop {
            if self.cancel.load(Ordering::Acquire) {
                break LoopEnd::Cancelled;
            }
            if game.is_over() {
                break LoopEnd::GameOver(game.result());
            }
            if self.max_plies.is_some_and(|max| plies >= max) {
                break LoopEnd::PlyLimit;
            }

            let mv = game.play_turn()?.wait(game)?;
            plies += 1;
            on_move(game, &mv);
        };
        info!("game {} loop ended after {plies} plies: {end:?}", game.id());
        Ok(end)
    }
}
