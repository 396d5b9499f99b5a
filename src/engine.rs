//! Bridge to an external UCI analysis engine (e.g. stockfish).
//!
//! A reader thread forwards every line the engine prints over a channel, so the
//! caller can wait for an answer with a deadline instead of blocking on the pipe.
//! Only one request is in flight at a time: `best_move` takes `&mut self`.
//!
//! If a request times out the engine is told to `stop` and the bestmove it still
//! owes is skipped when it eventually shows up.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::errors::{EngineError, NotationError};
use crate::game::Game;
use crate::types::{Move, Status};

pub const DEFAULT_SEARCH_DEPTH: u32 = 10;
pub const DEFAULT_ENGINE_PATH: &str = "stockfish";

const QUIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// Search depth handed to the engine
    pub fn depth(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 7,
            Difficulty::Hard => 12,
            Difficulty::Expert => 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    /// Extra command line arguments for the executable
    pub args: Vec<String>,
    pub search_depth: u32,
    /// How long to wait for `bestmove` after `go`
    pub response_timeout: Duration,
    /// How long to wait for `uciok` / `readyok`
    pub ready_timeout: Duration,
    /// How long the engine gets to exit after `quit` before it is killed
    pub quit_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_ENGINE_PATH),
            args: Vec::new(),
            search_depth: DEFAULT_SEARCH_DEPTH,
            response_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            quit_grace: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_difficulty(self, difficulty: Difficulty) -> Self {
        self.with_depth(difficulty.depth())
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_quit_grace(mut self, grace: Duration) -> Self {
        self.quit_grace = grace;
        self
    }
}

pub fn position_command(fen: &str) -> String {
    format!("position fen {}", fen)
}

pub fn go_command(depth: u32) -> String {
    format!("go depth {}", depth)
}

/// `None` if the line is not a bestmove line at all, otherwise the parsed move.
pub fn parse_bestmove(line: &str) -> Option<Result<Move, NotationError>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    Some(match tokens.next() {
        Some(mv) => Move::from_uci(mv),
        None => Err(NotationError::Move(line.trim().to_string())),
    })
}

fn spawn_reader<R: Read + Send + 'static>(reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed reading engine output");
                    break;
                }
            }
        }
    });
    rx
}

pub struct EngineBridge {
    config: EngineConfig,
    writer: Box<dyn Write + Send>,
    lines: Receiver<String>,
    child: Option<Child>,
    // bestmove replies still owed for requests that timed out
    stale_bestmoves: usize,
    closed: bool,
}

impl EngineBridge {
    /// Start the engine executable and run the `uci` / `isready` handshake.
    pub fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.display().to_string(),
                source,
            })?;
        info!(path = %config.path.display(), pid = child.id(), "engine started");

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                return Err(EngineError::Closed);
            }
        };
        let mut bridge = Self::from_streams(stdout, stdin, config);
        bridge.child = Some(child);
        bridge.handshake()?;
        Ok(bridge)
    }

    /// Talk to an engine over arbitrary streams. No handshake is performed.
    pub fn from_streams<R, W>(reader: R, writer: W, config: EngineConfig) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            config,
            writer: Box::new(writer),
            lines: spawn_reader(reader),
            child: None,
            stale_bestmoves: 0,
            closed: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn search_depth(&self) -> u32 {
        self.config.search_depth
    }

    pub fn set_search_depth(&mut self, depth: u32) {
        debug!(depth, "search depth changed");
        self.config.search_depth = depth;
    }

    pub fn handshake(&mut self) -> Result<(), EngineError> {
        let timeout = self.config.ready_timeout;
        self.send("uci")?;
        self.wait_for("uciok", timeout)?;
        self.send("isready")?;
        self.wait_for("readyok", timeout)?;
        info!("engine ready");
        Ok(())
    }

    /// Tell the engine a new game starts and wait until it is ready again.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.wait_for("readyok", self.config.ready_timeout)
    }

    /// Ask for the best move in the position given as FEN.
    /// Gives up after the configured response timeout.
    pub fn best_move(&mut self, fen: &str) -> Result<Move, EngineError> {
        self.send(&position_command(fen))?;
        self.send(&go_command(self.config.search_depth))?;

        let timeout = self.config.response_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => match parse_bestmove(&line) {
                    None => continue,
                    Some(_) if self.stale_bestmoves > 0 => {
                        self.stale_bestmoves -= 1;
                        debug!(%line, "skipping reply to an abandoned request");
                    }
                    Some(Ok(mv)) => {
                        debug!(%fen, mv = %mv, "engine answered");
                        return Ok(mv);
                    }
                    Some(Err(e)) => {
                        warn!(%line, error = %e, "malformed bestmove");
                        return Err(EngineError::NoMove);
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    warn!(?timeout, "engine did not answer in time");
                    if let Err(e) = self.send("stop") {
                        warn!(error = %e, "failed to send stop");
                    }
                    self.stale_bestmoves += 1;
                    return Err(EngineError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::NoMove),
            }
        }
    }

    /// Send `quit`, give the process a moment to exit, then kill it.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.send("quit") {
            debug!(error = %e, "quit not delivered");
        }
        let Some(mut child) = self.child.take() else {
            return;
        };
        let deadline = Instant::now() + self.config.quit_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(%status, "engine exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(QUIT_POLL_INTERVAL),
                Ok(None) => {
                    warn!("engine ignored quit, killing it");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to poll engine process, killing it");
                    break;
                }
            }
        }
        let _ = child.kill();
        let _ = child.wait();
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        debug!(command, "to engine");
        writeln!(self.writer, "{}", command)?;
        self.writer.flush()?;
        Ok(())
    }

    fn wait_for(&mut self, expected: &str, timeout: Duration) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    let line = line.trim();
                    if line.starts_with(expected) {
                        return Ok(());
                    }
                    if line.starts_with("bestmove") && self.stale_bestmoves > 0 {
                        self.stale_bestmoves -= 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(EngineError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::Closed),
            }
        }
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Let the engine move for the side to move in `game`.
///
/// The lock is only held to read the position and to apply the answer, never while
/// waiting for the engine. If the game was reset in between, the answer is dropped
/// and `EngineError::Rejected(MoveError::Stale { .. })` comes back.
pub fn play_engine_turn(game: &Mutex<Game>, bridge: &mut EngineBridge) -> Result<Status, EngineError> {
    let (fen, generation) = {
        let game = game.lock().unwrap_or_else(PoisonError::into_inner);
        if game.status().is_terminal() {
            return Ok(game.status());
        }
        (game.to_fen(), game.generation())
    };
    let mv = bridge.best_move(&fen)?;
    let mut game = game.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(game.apply_engine_move(generation, &mv)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MoveError;
    use crate::types::{PieceKind, Square};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::mpsc::Sender;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Engine output fed by the test, one chunk at a time
    struct ChannelReader {
        rx: Receiver<Vec<u8>>,
        buf: Vec<u8>,
        pos: usize,
    }

    impl Read for ChannelReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.buf.len() {
                match self.rx.recv() {
                    Ok(chunk) => {
                        self.buf = chunk;
                        self.pos = 0;
                    }
                    Err(_) => return Ok(0),
                }
            }
            let n = out.len().min(self.buf.len() - self.pos);
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn channel_reader() -> (Sender<Vec<u8>>, ChannelReader) {
        let (tx, rx) = mpsc::channel();
        (tx, ChannelReader { rx, buf: Vec::new(), pos: 0 })
    }

    fn scripted(output: &str, config: EngineConfig) -> (EngineBridge, SharedBuf) {
        let input = SharedBuf::default();
        let bridge = EngineBridge::from_streams(Cursor::new(output.to_string()), input.clone(), config);
        (bridge, input)
    }

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn test_difficulty_depths() {
        assert_eq!(Difficulty::Easy.depth(), 1);
        assert_eq!(Difficulty::Medium.depth(), 7);
        assert_eq!(Difficulty::Hard.depth(), 12);
        assert_eq!(Difficulty::Expert.depth(), 20);
        assert_eq!(EngineConfig::default().search_depth, DEFAULT_SEARCH_DEPTH);
        assert_eq!(EngineConfig::default().with_difficulty(Difficulty::Hard).search_depth, 12);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            position_command("8/8/8/8/8/8/8/K6k w - - 0 1"),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
        assert_eq!(go_command(7), "go depth 7");
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(parse_bestmove("info depth 3 score cp 20"), None);
        assert_eq!(parse_bestmove("bestmove e2e4 ponder e7e5"), Some(Ok(Move::new(sq("e2"), sq("e4")))));
        assert_eq!(
            parse_bestmove("bestmove a7a8q"),
            Some(Ok(Move::with_promotion(sq("a7"), sq("a8"), PieceKind::Queen)))
        );
        assert!(matches!(parse_bestmove("bestmove"), Some(Err(_))));
        assert!(matches!(parse_bestmove("bestmove (none)"), Some(Err(_))));
        assert!(matches!(parse_bestmove("bestmove e9e4"), Some(Err(_))));
    }

    #[test]
    fn test_handshake() {
        let (mut bridge, input) = scripted("id name Fake\nuciok\nreadyok\n", EngineConfig::default());
        bridge.handshake().unwrap();
        assert_eq!(input.contents(), "uci\nisready\n");
    }

    #[test]
    fn test_handshake_on_closed_stream() {
        let (mut bridge, _) = scripted("id name Fake\n", EngineConfig::default());
        assert!(matches!(bridge.handshake(), Err(EngineError::Closed)));
    }

    #[test]
    fn test_best_move_skips_info_lines() {
        let config = EngineConfig::default().with_depth(5);
        let (mut bridge, input) = scripted("info depth 1\ninfo depth 2\nbestmove g1f3\n", config);
        let mv = bridge.best_move(crate::board::STARTING_POSITION_FEN).unwrap();
        assert_eq!(mv, Move::new(sq("g1"), sq("f3")));
        assert_eq!(
            input.contents(),
            format!("position fen {}\ngo depth 5\n", crate::board::STARTING_POSITION_FEN)
        );
    }

    #[test]
    fn test_no_bestmove_before_end_of_stream() {
        let (mut bridge, _) = scripted("info depth 1\n", EngineConfig::default());
        assert!(matches!(bridge.best_move("k7/8/8/8/8/8/8/K7 w - - 0 1"), Err(EngineError::NoMove)));
    }

    #[test]
    fn test_malformed_bestmove() {
        let (mut bridge, _) = scripted("bestmove zz\n", EngineConfig::default());
        assert!(matches!(bridge.best_move("k7/8/8/8/8/8/8/K7 w - - 0 1"), Err(EngineError::NoMove)));
    }

    #[test]
    fn test_timeout_then_stale_reply_is_skipped() {
        let (tx, reader) = channel_reader();
        let input = SharedBuf::default();
        let config = EngineConfig::default().with_response_timeout(Duration::from_millis(50));
        let mut bridge = EngineBridge::from_streams(reader, input.clone(), config);

        let fen = crate::board::STARTING_POSITION_FEN;
        assert!(matches!(bridge.best_move(fen), Err(EngineError::Timeout(_))));
        assert!(input.contents().ends_with("stop\n"));

        tx.send(b"bestmove e2e4\nbestmove d2d4\n".to_vec()).unwrap();
        assert_eq!(bridge.best_move(fen).unwrap(), Move::new(sq("d2"), sq("d4")));
    }

    #[test]
    fn test_shutdown_sends_quit_once() {
        let (mut bridge, input) = scripted("", EngineConfig::default());
        bridge.shutdown();
        bridge.shutdown();
        drop(bridge);
        assert_eq!(input.contents(), "quit\n");
    }

    #[test]
    fn test_play_engine_turn() {
        let game = Mutex::new(Game::new());
        let (mut bridge, _) = scripted("bestmove e2e4\n", EngineConfig::default());
        assert_eq!(play_engine_turn(&game, &mut bridge).unwrap(), Status::InProgress);
        assert_eq!(game.lock().unwrap().to_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
    }

    #[test]
    fn test_play_engine_turn_rejects_illegal_suggestion() {
        let game = Mutex::new(Game::new());
        let (mut bridge, _) = scripted("bestmove e2e5\n", EngineConfig::default());
        let err = play_engine_turn(&game, &mut bridge).unwrap_err();
        assert!(matches!(err, EngineError::Rejected(MoveError::Illegal { .. })));
        assert_eq!(game.lock().unwrap().active_color(), crate::types::Color::White);
    }

    #[test]
    fn test_reply_after_reset_is_discarded() {
        let (tx, reader) = channel_reader();
        let game = Arc::new(Mutex::new(Game::new()));
        let input = SharedBuf::default();
        let mut bridge = EngineBridge::from_streams(reader, input.clone(), EngineConfig::default());

        let worker = {
            let game = Arc::clone(&game);
            thread::spawn(move || play_engine_turn(&game, &mut bridge))
        };
        // the reset lands while the engine is thinking
        while !input.contents().contains("go depth") {
            thread::sleep(Duration::from_millis(5));
        }
        game.lock().unwrap().reset();
        tx.send(b"bestmove e2e4\n".to_vec()).unwrap();

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(EngineError::Rejected(MoveError::Stale { expected: 0, actual: 1 }))));
        assert_eq!(game.lock().unwrap().active_color(), crate::types::Color::White);
    }
}
