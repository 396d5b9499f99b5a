use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::errors::{MoveError, NotationError};
use crate::types::{Color, Move, Piece, PieceKind, Square, Status};

/// Result of clicking (selecting) a square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// An own piece is now selected; its legal destinations are cached
    Selected(Square),
    /// The selected square was chosen again, or the choice led nowhere
    Deselected,
    /// The selected piece was moved to the chosen square
    Moved(Status),
    /// A pawn is about to reach the last row; ask for the piece and call
    /// [`Game::request_move`] with it
    PromotionRequired { from: Square, to: Square },
    /// Nothing to do (empty or enemy square with nothing selected, or the game is over)
    Ignored,
}

/// The state of one game: the board plus check flags, outcome and the current selection.
///
/// Every accepted move goes through [`Game::apply_move`]. The generation counter goes
/// up on every reset so that answers computed for an earlier game can be recognised and
/// dropped.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    // indexed by color
    check: [bool; 2],
    status: Status,
    generation: u64,
    selected: Option<Square>,
    legal_targets: HashSet<Square>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::from_board(Board::new())
    }

    pub fn from_fen(fen: &str) -> Result<Self, NotationError> {
        Ok(Self::from_board(Board::from_fen(fen)?))
    }

    fn from_board(board: Board) -> Self {
        let mut game = Self {
            board,
            check: [false; 2],
            status: Status::InProgress,
            generation: 0,
            selected: None,
            legal_targets: HashSet::new(),
        };
        game.refresh_status();
        game
    }

    /// Back to the starting position. Invalidates outstanding engine requests.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self::new();
        self.generation = generation;
        info!(generation, "new game");
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.piece_at(square)
    }

    pub fn active_color(&self) -> Color {
        self.board.active_color()
    }

    /// Check flag as of the last accepted move
    pub fn is_in_check(&self, color: Color) -> bool {
        self.check[color.index()]
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn to_fen(&self) -> String {
        self.board.to_fen()
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    /// Legal destinations of the selected piece, empty when nothing is selected
    pub fn legal_targets(&self) -> &HashSet<Square> {
        &self.legal_targets
    }

    pub fn legal_destinations(&mut self, square: Square) -> HashSet<Square> {
        self.board.legal_destinations(square)
    }

    pub fn legal_moves(&mut self) -> Vec<Move> {
        let color = self.board.active_color();
        self.board.legal_moves(color)
    }

    pub fn is_checkmate(&mut self, color: Color) -> bool {
        self.board.is_checkmate(color)
    }

    pub fn is_stalemate(&mut self, color: Color) -> bool {
        self.board.is_stalemate(color)
    }

    /// Validate and play a move for the side to move, then work out whether the game
    /// has ended. A rejected move leaves the game untouched.
    pub fn apply_move(&mut self, mv: &Move) -> Result<Status, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameOver);
        }
        match self.board.try_execute(mv) {
            Ok(_) => {
                self.clear_selection();
                self.refresh_status();
                Ok(self.status)
            }
            Err(e) => {
                debug!(mv = %mv, error = %e, "move rejected");
                Err(e)
            }
        }
    }

    pub fn request_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> Result<Status, MoveError> {
        self.apply_move(&Move { from, to, promotion })
    }

    /// Apply a move that was computed for the game as it stood at `generation`.
    /// If the game has been reset since, the move is dropped.
    pub fn apply_engine_move(&mut self, generation: u64, mv: &Move) -> Result<Status, MoveError> {
        if generation != self.generation {
            warn!(mv = %mv, expected = generation, actual = self.generation, "discarding stale engine move");
            return Err(MoveError::Stale {
                expected: generation,
                actual: self.generation,
            });
        }
        self.apply_move(mv)
    }

    /// Click handling for a presentation layer
    pub fn select_square(&mut self, square: Square) -> Selection {
        if self.status.is_terminal() {
            return Selection::Ignored;
        }
        let selected = match self.selected {
            None => {
                return if self.is_own_piece(square) {
                    self.select(square);
                    Selection::Selected(square)
                } else {
                    Selection::Ignored
                };
            }
            Some(s) => s,
        };

        if square == selected {
            self.clear_selection();
            return Selection::Deselected;
        }

        let is_pawn = self.board.piece_at(selected).is_some_and(|p| p.kind == PieceKind::Pawn);
        if is_pawn && (square.row == 0 || square.row == 7) && self.legal_targets.contains(&square) {
            return Selection::PromotionRequired { from: selected, to: square };
        }

        match self.request_move(selected, square, None) {
            Ok(status) => Selection::Moved(status),
            Err(_) if self.is_own_piece(square) => {
                self.select(square);
                Selection::Selected(square)
            }
            Err(_) => {
                self.clear_selection();
                Selection::Deselected
            }
        }
    }

    /// Status line for the side to move
    pub fn status_text(&self) -> String {
        match self.status {
            Status::Checkmate(winner) => format!("Checkmate! {} wins!", winner),
            Status::Stalemate => "Stalemate! Game ends in a draw.".to_string(),
            Status::InProgress => {
                let color = self.active_color();
                if self.is_in_check(color) {
                    format!("{} is in check!", color)
                } else {
                    format!("{}'s turn", color)
                }
            }
        }
    }

    fn is_own_piece(&self, square: Square) -> bool {
        self.board.piece_at(square).is_some_and(|p| p.color == self.active_color())
    }

    fn select(&mut self, square: Square) {
        self.selected = Some(square);
        self.legal_targets = self.board.legal_destinations(square);
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.legal_targets.clear();
    }

    fn refresh_status(&mut self) {
        for color in [Color::White, Color::Black] {
            self.check[color.index()] = self.board.is_in_check(color);
        }
        let to_move = self.board.active_color();
        let in_check = self.check[to_move.index()];
        self.status = if self.board.has_legal_move(to_move) {
            Status::InProgress
        } else if in_check {
            Status::Checkmate(to_move.other_color())
        } else {
            Status::Stalemate
        };
        match self.status {
            Status::InProgress => {}
            Status::Checkmate(winner) => info!(%winner, "checkmate"),
            Status::Stalemate => info!("stalemate"),
        }
    }
}
