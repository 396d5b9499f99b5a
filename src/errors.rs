use std::time::Duration;

use thiserror::Error;

use crate::types::{Color, Square};

/// Reasons a move request is turned down. A rejected move never mutates the game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("there is no piece on {0}")]
    NoPiece(Square),
    #[error("it is {0}'s turn")]
    NotYourTurn(Color),
    #[error("castling from {from} to {to} is not allowed")]
    CastlingNotAllowed { from: Square, to: Square },
    #[error("{from}{to} is not a legal move")]
    Illegal { from: Square, to: Square },
    #[error("the game is over")]
    GameOver,
    /// The game was reset after the move was requested.
    #[error("move was computed for generation {expected}, game is at generation {actual}")]
    Stale { expected: u64, actual: u64 },
}

/// Malformed square, coordinate move or FEN text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("invalid square `{0}`")]
    Square(String),
    #[error("invalid coordinate move `{0}`")]
    Move(String),
    #[error("invalid FEN `{fen}`: {reason}")]
    Fen { fen: String, reason: String },
}

/// Failures talking to the external analysis engine. All of them are recoverable:
/// the game itself is never touched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine `{path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("engine produced no move")]
    NoMove,
    #[error("engine connection is closed")]
    Closed,
    #[error("engine suggested a move that was rejected: {0}")]
    Rejected(#[from] MoveError),
}
