//! Integration tests driving the engine bridge against scripted stand-in engines.
//!
//! Run with: cargo test --test engine_bridge_tests
#![cfg(unix)]

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chess_rules::engine::{play_engine_turn, EngineBridge, EngineConfig};
use chess_rules::errors::EngineError;
use chess_rules::game::Game;
use chess_rules::types::{Color, Move, Status};

/// Answers the handshake, replies to every `go` with `reply` and exits on `quit`
fn replying_engine(reply: &str) -> String {
    format!(
        r#"while read -r line; do
  case "$line" in
    uci) echo "id name scripted"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 score cp 13"; echo "{}" ;;
    quit) exit 0 ;;
  esac
done"#,
        reply
    )
}

/// Answers the handshake but never searches and never quits
const STUBBORN_ENGINE: &str = r#"while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
  esac
done"#;

fn sh_config(script: &str) -> EngineConfig {
    EngineConfig::default()
        .with_path("sh")
        .with_args(["-c", script])
        .with_ready_timeout(Duration::from_secs(5))
        .with_response_timeout(Duration::from_secs(5))
        .with_quit_grace(Duration::from_secs(2))
}

#[test]
fn test_spawn_and_best_move() {
    let mut bridge = EngineBridge::spawn(sh_config(&replying_engine("bestmove e2e4 ponder e7e5"))).unwrap();
    let mv = bridge.best_move(chess_rules::board::STARTING_POSITION_FEN).unwrap();
    assert_eq!(mv, Move::from_uci("e2e4").unwrap());

    bridge.new_game().unwrap();
    let start = Instant::now();
    bridge.shutdown();
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_engine_plays_a_move() {
    let game = Mutex::new(Game::new());
    let mut bridge = EngineBridge::spawn(sh_config(&replying_engine("bestmove g1f3"))).unwrap();
    assert_eq!(play_engine_turn(&game, &mut bridge).unwrap(), Status::InProgress);
    let game = game.lock().unwrap();
    assert_eq!(game.active_color(), Color::Black);
    assert_eq!(game.to_fen(), "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 0 1");
}

#[test]
fn test_illegal_suggestion_leaves_game_alone() {
    let game = Mutex::new(Game::new());
    let mut bridge = EngineBridge::spawn(sh_config(&replying_engine("bestmove e1e3"))).unwrap();
    let err = play_engine_turn(&game, &mut bridge).unwrap_err();
    assert!(matches!(err, EngineError::Rejected(_)));
    assert_eq!(game.lock().unwrap().to_fen(), chess_rules::board::STARTING_POSITION_FEN);
}

#[test]
fn test_malformed_reply_is_no_move() {
    let mut bridge = EngineBridge::spawn(sh_config(&replying_engine("bestmove (none)"))).unwrap();
    let err = bridge.best_move("k7/8/8/8/8/8/8/K7 w - - 0 1").unwrap_err();
    assert!(matches!(err, EngineError::NoMove));
}

#[test]
fn test_unresponsive_engine_times_out() {
    let config = sh_config(STUBBORN_ENGINE).with_response_timeout(Duration::from_millis(200));
    let mut bridge = EngineBridge::spawn(config).unwrap();
    let start = Instant::now();
    let err = bridge.best_move(chess_rules::board::STARTING_POSITION_FEN).unwrap_err();
    assert!(matches!(err, EngineError::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_engine_ignoring_quit_is_killed() {
    let config = sh_config(STUBBORN_ENGINE).with_quit_grace(Duration::from_millis(200));
    let mut bridge = EngineBridge::spawn(config).unwrap();
    let start = Instant::now();
    bridge.shutdown();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn test_missing_executable() {
    let config = EngineConfig::default().with_path("/nonexistent/engine-binary");
    assert!(matches!(EngineBridge::spawn(config), Err(EngineError::Spawn { .. })));
}

#[test]
fn test_engine_that_exits_during_handshake() {
    let config = sh_config("exit 0").with_quit_grace(Duration::from_millis(200));
    let err = EngineBridge::spawn(config).err().unwrap();
    assert!(matches!(err, EngineError::Closed | EngineError::Io(_)));
}
