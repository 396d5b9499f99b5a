//! Terminal chess: two humans, or one human against a UCI engine.
//!
//! Usage: cargo run --release -- --engine /usr/bin/stockfish --difficulty hard --engine-color black

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use chess_rules::engine::{play_engine_turn, Difficulty, EngineBridge, EngineConfig, DEFAULT_ENGINE_PATH};
use chess_rules::errors::{EngineError, MoveError};
use chess_rules::game::Game;
use chess_rules::types::{Color, Move, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Color {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chess_rules")]
#[command(about = "Play chess in the terminal, optionally against a UCI engine")]
struct Args {
    /// Path to a UCI engine. Without it both sides are played from the keyboard
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Use the default engine executable found on PATH
    #[arg(long, conflicts_with = "engine")]
    stockfish: bool,

    /// Search depth, overrides --difficulty
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,

    /// Color played by the engine
    #[arg(long, value_enum, default_value_t = Side::Black)]
    engine_color: Side,

    /// How long to wait for the engine's move, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Draw the board with Black at the bottom
    #[arg(long)]
    flip: bool,

    /// Start from this position instead of the initial one
    #[arg(long)]
    fen: Option<String>,
}

impl Args {
    fn engine_config(&self) -> Option<EngineConfig> {
        let path = match (&self.engine, self.stockfish) {
            (Some(path), _) => path.clone(),
            (None, true) => PathBuf::from(DEFAULT_ENGINE_PATH),
            (None, false) => return None,
        };
        let mut config = EngineConfig::default()
            .with_path(path)
            .with_response_timeout(Duration::from_millis(self.timeout_ms));
        if let Some(difficulty) = self.difficulty {
            config = config.with_difficulty(difficulty);
        }
        if let Some(depth) = self.depth {
            config = config.with_depth(depth);
        }
        Some(config)
    }
}

const HELP: &str = "\
moves are given as <from><to>[promotion], e.g. e2e4 or a7a8n
commands:
  moves <square>  list legal destinations
  fen             print the position
  flip            turn the board around
  depth <n>       change the engine search depth
  new             start a new game
  quit            leave";

struct Session {
    game: Mutex<Game>,
    engine: Option<EngineBridge>,
    engine_color: Color,
    flipped: bool,
}

impl Session {
    fn game(&self) -> std::sync::MutexGuard<'_, Game> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self) {
        let game = self.game();
        println!("{}", game.board().draw_board_oriented(self.flipped));
        println!("{}", game.status_text());
    }

    fn is_engine_turn(&self) -> bool {
        let game = self.game();
        self.engine.is_some() && !game.status().is_terminal() && game.active_color() == self.engine_color
    }

    /// Continue without the engine, both sides by hand
    fn drop_engine(&mut self, error: &EngineError) {
        println!("Engine unavailable ({}), continuing with two human players.", error);
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown();
        }
    }

    fn engine_turn(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match play_engine_turn(&self.game, engine) {
            Ok(_) => {}
            Err(EngineError::Rejected(MoveError::Stale { .. })) => {}
            Err(e) => self.drop_engine(&e),
        }
    }

    fn new_game(&mut self) {
        self.game().reset();
        let result = match self.engine.as_mut() {
            Some(engine) => engine.new_game(),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.drop_engine(&e);
        }
    }

    /// Returns false when the user wants to leave
    fn handle_line(&mut self, line: &str) -> color_eyre::Result<bool> {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => {}
            (Some("quit" | "exit"), _) => return Ok(false),
            (Some("help"), _) => println!("{}", HELP),
            (Some("new"), _) => self.new_game(),
            (Some("fen"), _) => println!("{}", self.game().to_fen()),
            (Some("flip"), _) => self.flipped = !self.flipped,
            (Some("moves"), Some(square)) => match Square::from_algebraic(square) {
                Ok(square) => {
                    let mut targets: Vec<Square> = self.game().legal_destinations(square).into_iter().collect();
                    targets.sort();
                    let targets: Vec<String> = targets.iter().map(|s| s.to_algebraic()).collect();
                    println!("{}: {}", square, targets.join(" "));
                }
                Err(e) => println!("{}", e),
            },
            (Some("depth"), Some(depth)) => {
                let depth: u32 = depth.parse().wrap_err_with(|| format!("bad depth `{}`", depth))?;
                match self.engine.as_mut() {
                    Some(engine) => engine.set_search_depth(depth),
                    None => println!("no engine attached"),
                }
            }
            (Some(text), _) => match Move::from_uci(text) {
                Ok(mv) => {
                    if let Err(e) = self.game().apply_move(&mv) {
                        println!("{}", e);
                    }
                }
                Err(_) => println!("unknown command `{}`, try `help`", line.trim()),
            },
        }
        Ok(true)
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let game = match &args.fen {
        Some(fen) => Game::from_fen(fen)?,
        None => Game::new(),
    };
    let engine = match args.engine_config() {
        Some(config) => match EngineBridge::spawn(config) {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!(error = %e, "could not start engine");
                println!("Engine unavailable ({}), playing with two human players.", e);
                None
            }
        },
        None => None,
    };
    let mut session = Session {
        game: Mutex::new(game),
        engine,
        engine_color: args.engine_color.into(),
        flipped: args.flip,
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        session.render();
        if session.is_engine_turn() {
            session.engine_turn();
            continue;
        }
        if session.game().status().is_terminal() {
            println!("Type `new` to play again or `quit` to leave.");
        }
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        match session.handle_line(&line?) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{:#}", e),
        }
    }

    if let Some(mut engine) = session.engine.take() {
        engine.shutdown();
    }
    Ok(())
}
