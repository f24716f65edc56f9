//! Canonical chess-rule constants.
//!
//! This module stores static rule-related literals such as the standard
//! starting position FEN used to initialize and validate game state setup.

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// King file on both back ranks before castling.
pub const KING_START_FILE: u8 = 4;

/// Rook files on the king's and queen's wings.
pub const KINGSIDE_ROOK_FILE: u8 = 7;
pub const QUEENSIDE_ROOK_FILE: u8 = 0;

/// Destination files of king and rook after castling: `(king, rook)`.
pub const KINGSIDE_CASTLE_FILES: (u8, u8) = (6, 5);
pub const QUEENSIDE_CASTLE_FILES: (u8, u8) = (2, 3);
