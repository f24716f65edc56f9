//! Crate root module declarations for the Frame Chess rules core.
//!
//! This file exposes the rules core (positions, moves, notation), the game
//! layer with its turn driver, the move oracles and the board-surface adapter
//! so the binary, benches and host applications can import stable paths.

pub mod game_state {
    pub mod chess_rules;
    pub mod chess_types;
    pub mod position;
}

pub mod moves {
    pub mod chess_move;
    pub mod move_list;
}

pub mod game {
    #[allow(clippy::module_inception)]
    pub mod game;
    pub mod turn_driver;
}

pub mod oracles {
    pub mod move_oracle;
    pub mod random_oracle;
    pub mod uci_engine;
}

pub mod surface {
    pub mod board_surface;
    pub mod surface_listener;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
    pub mod pgn;
    pub mod render_position;
    pub mod san;
}

pub mod chess_errors;
pub mod config;
