//! Board occupancy plus game-state flags, and the rules oracle over them.
//!
//! `Position` is the central model of the rules core. It stores one optional
//! piece per square, the side to move, castling rights, the en-passant target
//! and both clocks. It is mutated only through [`Position::perform`] (and the
//! raw editing helpers used by FEN loading and by moves themselves).

use std::sync::Arc;

use log::{debug, warn};

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_rules::{
    KINGSIDE_ROOK_FILE, KING_START_FILE, QUEENSIDE_ROOK_FILE, STARTING_POSITION_FEN,
};
use crate::game_state::chess_types::*;
use crate::moves::chess_move::{CheckStatus, Move};
use crate::moves::move_list::generate_legal_moves;
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::parse_fen;

/// Site string used when nothing else is configured.
pub const DEFAULT_SITE: &str = "Local";

/// How a game ended, as far as the board alone can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    // Rank-major: index = rank * 8 + file.
    board: [Option<Piece>; 64],

    pub active_color: Color,
    pub castling_rights: CastlingRights,
    pub en_passant: Option<Square>,

    pub halfmove_clock: u32,
    pub fullmove_number: u32,

    // Display only; carried into PGN by the game.
    pub site: Arc<str>,
}

impl Default for Position {
    /// An empty board, white to move, no rights.
    fn default() -> Self {
        Self {
            board: [None; 64],
            active_color: Color::White,
            castling_rights: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            site: Arc::from(DEFAULT_SITE),
        }
    }
}

impl Position {
    #[inline]
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// The standard starting position.
    pub fn new_game() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut position = Self::default();
        for color in Color::ALL {
            let back = color.back_rank();
            let pawns = (back as i8 + color.pawn_direction()) as u8;
            for (file, kind) in BACK_RANK.iter().enumerate() {
                let file = file as u8;
                position.set(Square::from_coords(file, back), Some(Piece::new(color, *kind)));
                position.set(
                    Square::from_coords(file, pawns),
                    Some(Piece::new(color, PieceKind::Pawn)),
                );
            }
        }
        position.castling_rights = CASTLE_ALL;
        position
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, ChessErrors> {
        parse_fen(fen)
    }

    /// Replaces the whole state with the one described by `fen`, keeping the site.
    ///
    /// On error the position is left untouched.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), ChessErrors> {
        let mut loaded = parse_fen(fen)?;
        loaded.site = Arc::clone(&self.site);
        *self = loaded;
        Ok(())
    }

    /// FEN of the normalized position (stale castling and en-passant flags are
    /// dropped from the output).
    #[inline]
    pub fn to_fen(&self) -> String {
        generate_fen(self)
    }

    #[inline]
    pub fn is_standard_start(&self) -> bool {
        self.to_fen() == STARTING_POSITION_FEN
    }

    pub fn set_site(&mut self, site: &str) {
        self.site = Arc::from(site);
    }

    // --- Raw board access ---

    #[inline]
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }

    #[inline]
    pub fn is_piece_at(&self, square: Square, piece: Piece) -> bool {
        self.get(square) == Some(piece)
    }

    /// Raw write that bypasses every rule.
    #[inline]
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.index()] = piece;
    }

    /// Moves whatever stands on `from` to `to`, dropping `to`'s contents.
    ///
    /// Returns `false` (and changes nothing) when `from` is empty.
    pub fn move_raw(&mut self, from: Square, to: Square) -> bool {
        let Some(piece) = self.get(from) else {
            return false;
        };
        self.set(from, None);
        self.set(to, Some(piece));
        true
    }

    /// First square holding `piece`, in index order.
    pub fn find(&self, piece: Piece) -> Option<Square> {
        Square::all().find(|square| self.is_piece_at(*square, piece))
    }

    /// Occupied squares with their pieces, in index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |square| self.get(square).map(|piece| (square, piece)))
    }

    // --- Line tests (endpoints excluded) ---

    pub fn is_file_open(&self, file: u8, from_rank: u8, to_rank: u8) -> bool {
        let (low, high) = (from_rank.min(to_rank), from_rank.max(to_rank));
        (low + 1..high).all(|rank| self.get(Square::from_coords(file, rank)).is_none())
    }

    pub fn is_rank_open(&self, rank: u8, from_file: u8, to_file: u8) -> bool {
        let (low, high) = (from_file.min(to_file), from_file.max(to_file));
        (low + 1..high).all(|file| self.get(Square::from_coords(file, rank)).is_none())
    }

    pub fn is_diagonal_open(&self, from_file: u8, from_rank: u8, to_file: u8, to_rank: u8) -> bool {
        let file_step: i8 = if to_file > from_file { 1 } else { -1 };
        let rank_step: i8 = if to_rank > from_rank { 1 } else { -1 };
        let mut file = from_file as i8 + file_step;
        let mut rank = from_rank as i8 + rank_step;
        while file != to_file as i8 && rank != to_rank as i8 {
            if !(0..8).contains(&file) || !(0..8).contains(&rank) {
                return false;
            }
            if self.get(Square::from_coords(file as u8, rank as u8)).is_some() {
                return false;
            }
            file += file_step;
            rank += rank_step;
        }
        true
    }

    // --- Rules oracle ---

    /// Pseudo-legal test: geometry and occupancy only, self-check ignored.
    pub fn is_move_possible(&self, from: Square, to: Square) -> bool {
        let Some(piece) = self.get(from) else {
            return false;
        };
        let target = self.get(to);
        if target.is_some_and(|t| t.color == piece.color) {
            return false;
        }

        if piece.kind != PieceKind::Pawn {
            return self.reaches(piece.kind, from, to);
        }

        let direction = piece.color.pawn_direction();
        let start_rank = piece.color.back_rank() as i8 + direction;
        let d_file = to.file() as i8 - from.file() as i8;
        let d_rank = to.rank() as i8 - from.rank() as i8;

        let capture =
            self.en_passant == Some(to) || target.is_some_and(|t| t.color != piece.color);
        if d_file.abs() != i8::from(capture) {
            return false;
        }
        if d_rank == direction {
            return true;
        }

        !capture
            && from.rank() as i8 == start_rank
            && d_rank == 2 * direction
            && from
                .offset(0, direction)
                .is_some_and(|middle| self.get(middle).is_none())
    }

    /// Geometry plus path test for non-pawn kinds; the destination's
    /// occupant is not looked at.
    fn reaches(&self, kind: PieceKind, from: Square, to: Square) -> bool {
        let d_file = to.file() as i8 - from.file() as i8;
        let d_rank = to.rank() as i8 - from.rank() as i8;
        if d_file == 0 && d_rank == 0 {
            return false;
        }

        let straight = (d_file == 0 && self.is_file_open(from.file(), from.rank(), to.rank()))
            || (d_rank == 0 && self.is_rank_open(from.rank(), from.file(), to.file()));
        let diagonal = d_file.abs() == d_rank.abs()
            && self.is_diagonal_open(from.file(), from.rank(), to.file(), to.rank());

        match kind {
            PieceKind::Rook => straight,
            PieceKind::Bishop => diagonal,
            PieceKind::Queen => straight || diagonal,
            PieceKind::Knight => {
                matches!((d_file.abs(), d_rank.abs()), (1, 2) | (2, 1))
            }
            PieceKind::King => d_file.abs() <= 1 && d_rank.abs() <= 1,
            PieceKind::Pawn => false,
        }
    }

    /// Whether any piece of `by` could capture on `square`, whatever stands there.
    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        self.pieces()
            .filter(|(_, piece)| piece.color == by)
            .any(|(from, piece)| match piece.kind {
                PieceKind::Pawn => {
                    let d_file = square.file() as i8 - from.file() as i8;
                    let d_rank = square.rank() as i8 - from.rank() as i8;
                    d_file.abs() == 1 && d_rank == by.pawn_direction()
                }
                kind => self.reaches(kind, from, square),
            })
    }

    /// A colour is in check when an enemy piece could move onto its king.
    /// Without a king there is no check.
    pub fn is_in_check(&self, color: Color) -> bool {
        let Some(king) = self.find(Piece::new(color, PieceKind::King)) else {
            return false;
        };
        self.pieces()
            .filter(|(_, piece)| piece.color == color.opposite())
            .any(|(square, _)| self.is_move_possible(square, king))
    }

    /// Possible on this board and does not leave the mover's king in check.
    pub fn is_legal(&self, mv: &Move) -> bool {
        if !mv.is_possible_on(self) {
            return false;
        }
        let mut trial = self.clone();
        mv.play(&mut trial);
        !trial.is_in_check(self.active_color)
    }

    /// Applies `mv` and updates every flag and counter.
    ///
    /// Illegal moves are logged and applied anyway: engine answers and moves
    /// already made on a physical surface are taken as given.
    pub fn perform(&mut self, mv: &Move) {
        if !self.is_legal(mv) {
            warn!("playing illegal move {} on {}", mv.to_san(), self.to_fen());
        }
        self.apply(mv);
        debug!("performed {} -> {}", mv.to_san(), self.to_fen());
    }

    /// [`Position::is_legal`] for a move of the side to move.
    pub fn is_legal_for_mover(&self, mv: &Move) -> bool {
        let mover = match mv.unannotated() {
            Move::Normal { from, .. } | Move::Promotion { from, .. } => {
                self.get(*from).map(|piece| piece.color)
            }
            Move::Castle { color, .. } => Some(*color),
            Move::Checked { .. } => None,
        };
        mover == Some(self.active_color) && self.is_legal(mv)
    }

    /// Like [`Position::perform`] but refuses illegal moves and moves of the
    /// side not on move.
    pub fn try_perform(&mut self, mv: &Move) -> Result<(), ChessErrors> {
        if !self.is_legal_for_mover(mv) {
            return Err(ChessErrors::IllegalMove(mv.to_san()));
        }
        self.apply(mv);
        Ok(())
    }

    fn apply(&mut self, mv: &Move) {
        mv.play(self);
        self.validate_castling();
        self.en_passant = mv.en_passant_square();

        if mv.is_pawn_move_or_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.active_color = self.active_color.opposite();
        if self.active_color == Color::White {
            self.fullmove_number += 1;
        }
        self.validate_en_passant();
    }

    /// Rights whose king or rook has left its home square are dropped.
    pub fn validate_castling(&mut self) {
        self.castling_rights = self.normalized_castling_rights();
    }

    pub fn normalized_castling_rights(&self) -> CastlingRights {
        let mut rights = self.castling_rights;
        for color in Color::ALL {
            let back = color.back_rank();
            let king_home =
                self.is_piece_at(Square::from_coords(KING_START_FILE, back), Piece::new(color, PieceKind::King));
            let rook_home = |file: u8| {
                self.is_piece_at(Square::from_coords(file, back), Piece::new(color, PieceKind::Rook))
            };

            if !king_home || !rook_home(KINGSIDE_ROOK_FILE) {
                rights &= !castle_flag(color, false);
            }
            if !king_home || !rook_home(QUEENSIDE_ROOK_FILE) {
                rights &= !castle_flag(color, true);
            }
        }
        rights
    }

    /// Clears an en-passant target that is occupied or has no enemy pawn behind it.
    pub fn validate_en_passant(&mut self) {
        self.en_passant = self.normalized_en_passant();
    }

    pub fn normalized_en_passant(&self) -> Option<Square> {
        let target = self.en_passant?;
        if self.get(target).is_some() {
            return None;
        }
        let mover = self.active_color.opposite();
        let pawn_square = target.offset(0, mover.pawn_direction())?;
        self.is_piece_at(pawn_square, Piece::new(mover, PieceKind::Pawn))
            .then_some(target)
    }

    // --- Whole-position queries ---

    /// Every legal move of the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        generate_legal_moves(self)
    }

    /// Check annotation the move deserves: looks at the side that moves next.
    pub fn check_status_after(&self, mv: &Move) -> Option<CheckStatus> {
        let mut trial = self.clone();
        trial.apply(mv);
        if !trial.is_in_check(trial.active_color) {
            return None;
        }
        if trial.legal_moves().is_empty() {
            Some(CheckStatus::Checkmate)
        } else {
            Some(CheckStatus::Check)
        }
    }

    /// `None` while the side to move still has a legal move.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.legal_moves().is_empty() {
            return None;
        }
        if self.is_in_check(self.active_color) {
            Some(Outcome::Checkmate {
                winner: self.active_color.opposite(),
            })
        } else {
            Some(Outcome::Stalemate)
        }
    }
}
