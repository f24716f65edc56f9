//! Command-line driver: plays one game between two oracles and prints it.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{error, info};

use frame_chess::chess_errors::ChessErrors;
use frame_chess::config::CoreConfig;
use frame_chess::game::game::Game;
use frame_chess::game::turn_driver::PlayLoop;
use frame_chess::game_state::chess_types::Color;
use frame_chess::oracles::move_oracle::{SearchLimit, SharedOracle};
use frame_chess::oracles::random_oracle::RandomOracle;
use frame_chess::oracles::uci_engine::UciEngine;
use frame_chess::utils::render_position::render_position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlayerKind {
    /// The UCI engine named by `engine_command` in the config.
    Engine,
    /// Uniformly random legal moves.
    Random,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting position (defaults to the standard one)
    #[arg(long)]
    fen: Option<String>,

    #[arg(long, value_enum, default_value_t = PlayerKind::Random)]
    white: PlayerKind,

    #[arg(long, value_enum, default_value_t = PlayerKind::Random)]
    black: PlayerKind,

    /// Search depth asked of the oracles
    #[arg(long, conflicts_with = "movetime")]
    depth: Option<u32>,

    /// Thinking time per move in milliseconds
    #[arg(long)]
    movetime: Option<u64>,

    /// Stop after this many plies
    #[arg(long)]
    max_plies: Option<usize>,

    /// Seed for the random player
    #[arg(long)]
    seed: Option<u64>,

    /// Print the board after every ply
    #[arg(long)]
    show_board: bool,
}

impl Args {
    fn search_limit(&self) -> SearchLimit {
        match (self.depth, self.movetime) {
            (Some(depth), _) => SearchLimit::Depth(depth),
            (None, Some(ms)) => SearchLimit::MoveTime(Duration::from_millis(ms)),
            (None, None) => SearchLimit::EngineDefault,
        }
    }
}

/// Creates each kind of oracle at most once so both seats can share it.
struct OracleFactory<'a> {
    config: &'a CoreConfig,
    seed: Option<u64>,
    engine: Option<SharedOracle>,
    random: Option<SharedOracle>,
}

impl OracleFactory<'_> {
    fn get(&mut self, kind: PlayerKind) -> Result<SharedOracle, ChessErrors> {
        let slot = match kind {
            PlayerKind::Engine => &mut self.engine,
            PlayerKind::Random => &mut self.random,
        };
        if let Some(oracle) = slot {
            return Ok(oracle.clone());
        }
        let oracle = match kind {
            PlayerKind::Engine => SharedOracle::new(UciEngine::from_config(self.config)?),
            PlayerKind::Random => match self.seed {
                Some(seed) => SharedOracle::new(RandomOracle::seeded(seed)),
                None => SharedOracle::new(RandomOracle::new()),
            },
        };
        *slot = Some(oracle.clone());
        Ok(oracle)
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    )
    .init();

    if let Err(e) = run(&args) {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), ChessErrors> {
    let config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    let mut game = match &args.fen {
        Some(fen) => Game::from_fen(fen, &config)?,
        None => Game::new_standard(&config),
    };

    let limit = args.search_limit();
    let mut factory = OracleFactory {
        config: &config,
        seed: args.seed,
        engine: None,
        random: None,
    };
    game.bind_player(Color::White, factory.get(args.white)?, limit);
    game.bind_player(Color::Black, factory.get(args.black)?, limit);
    info!(
        "game {}: {} vs {}",
        game.id(),
        game.player_name(Color::White),
        game.player_name(Color::Black)
    );

    let play_loop = match args.max_plies {
        Some(max) => PlayLoop::new().with_max_plies(max),
        None => PlayLoop::new(),
    };
    let outcome = play_loop.run(&mut game, |game, mv| {
        if args.show_board {
            println!("{mv}\n{}\n", render_position(game.position()));
        }
    });
    game.close_players();
    let end = outcome?;
    info!("game {} stopped: {end:?}", game.id());

    println!("{}\n", render_position(game.position()));
    println!("{}", game.position().to_fen());
    println!();
    print!("{}", game.to_pgn());
    Ok(())
}
