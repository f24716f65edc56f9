//! Errors used throughout the rules core and its adapters.
//!
//! `ChessErrors` is the single error type of the crate. Notation and parsing
//! failures are recoverable and meant to be shown to whoever typed the text;
//! oracle failures surface through the turn driver; `IllegalMove` is only
//! produced by the strict entry points because `Position::perform` logs and
//! proceeds instead.

use thiserror::Error;

use crate::game_state::chess_types::{Color, Square};

/// Unified error type for the rules core.
#[derive(Debug, Error)]
pub enum ChessErrors {
    /// Malformed FEN, SAN, UCI or square text.
    ///
    /// Payload: a short description including the offending text.
    #[error("invalid notation: {0}")]
    InvalidNotation(String),

    /// A UCI move named a from-square with nothing on it.
    #[error("no piece on {0}")]
    NoSuchPiece(Square),

    /// SAN whose disambiguator matched no movable piece.
    #[error("ambiguous or unresolvable SAN: {0}")]
    AmbiguousOrUnresolvableSan(String),

    /// A move that fails the legality test, from the strict apply path.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// The move oracle (engine process or otherwise) failed to answer.
    #[error("move oracle failure: {0}")]
    OracleFailure(String),

    /// No oracle is bound to the colour that has to move.
    #[error("no player bound for {0:?}")]
    NoPlayer(Color),

    /// A turn was requested while the previous one is still pending.
    #[error("a turn is already in progress")]
    TurnInProgress,

    /// The configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
