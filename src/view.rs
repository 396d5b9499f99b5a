//! Render data for a board widget: what each square shows and how screen
//! positions map to board squares when the board is flipped.

use itertools::iproduct;

use crate::game::Game;
use crate::types::{Piece, PieceKind, Square, BOARD_SIZE};

/// Everything needed to paint one square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareView {
    pub square: Square,
    pub piece: Option<Piece>,
    pub light: bool,
    pub selected: bool,
    pub legal_target: bool,
    /// A king standing on this square is in check
    pub king_in_check: bool,
}

/// Which side of the board is at the bottom of the screen.
/// Unflipped means White at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub flipped: bool,
}

impl Orientation {
    pub fn new(flipped: bool) -> Self {
        Self { flipped }
    }

    pub fn toggle(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Board square drawn at a screen position (row 0 is the top of the screen)
    pub fn board_square(&self, screen_row: u8, screen_col: u8) -> Option<Square> {
        if screen_row >= BOARD_SIZE || screen_col >= BOARD_SIZE {
            return None;
        }
        Some(if self.flipped {
            Square::new(BOARD_SIZE - 1 - screen_row, BOARD_SIZE - 1 - screen_col)
        } else {
            Square::new(screen_row, screen_col)
        })
    }

    /// Inverse of [`Orientation::board_square`]
    pub fn screen_position(&self, square: Square) -> (u8, u8) {
        if self.flipped {
            (BOARD_SIZE - 1 - square.row, BOARD_SIZE - 1 - square.col)
        } else {
            (square.row, square.col)
        }
    }

    /// File letter under a screen column
    pub fn file_label(&self, screen_col: u8) -> char {
        let col = if self.flipped { BOARD_SIZE - 1 - screen_col } else { screen_col };
        (b'a' + col) as char
    }

    /// Rank digit beside a screen row
    pub fn rank_label(&self, screen_row: u8) -> char {
        let row = if self.flipped { BOARD_SIZE - 1 - screen_row } else { screen_row };
        (b'8' - row) as char
    }
}

impl Game {
    pub fn square_view(&self, square: Square) -> SquareView {
        let piece = self.piece_at(square);
        let king_in_check = piece.is_some_and(|p| p.kind == PieceKind::King && self.is_in_check(p.color));
        SquareView {
            square,
            piece,
            light: (square.row + square.col) % 2 == 0,
            selected: self.selected() == Some(square),
            legal_target: self.legal_targets().contains(&square),
            king_in_check,
        }
    }

    /// All 64 squares in screen order, top-left first
    pub fn board_view(&self, orientation: Orientation) -> Vec<SquareView> {
        iproduct!(0..BOARD_SIZE, 0..BOARD_SIZE)
            .filter_map(|(r, c)| orientation.board_square(r, c))
            .map(|sq| self.square_view(sq))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Move};
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn test_orientation_mapping() {
        let normal = Orientation::default();
        assert_eq!(normal.board_square(0, 0), Some(sq("a8")));
        assert_eq!(normal.board_square(7, 7), Some(sq("h1")));
        assert_eq!(normal.board_square(8, 0), None);

        let flipped = Orientation::new(true);
        assert_eq!(flipped.board_square(0, 0), Some(sq("h1")));
        assert_eq!(flipped.board_square(7, 0), Some(sq("h8")));
        assert_eq!(flipped.screen_position(sq("h1")), (0, 0));

        for square in Square::all() {
            let (r, c) = flipped.screen_position(square);
            assert_eq!(flipped.board_square(r, c), Some(square));
        }
    }

    #[test]
    fn test_labels() {
        let mut o = Orientation::default();
        assert_eq!(o.file_label(0), 'a');
        assert_eq!(o.rank_label(0), '8');
        o.toggle();
        assert_eq!(o.file_label(0), 'h');
        assert_eq!(o.rank_label(0), '1');
    }

    #[test]
    fn test_square_view_highlights() {
        let mut game = Game::new();
        game.select_square(sq("g1"));
        let view = game.square_view(sq("g1"));
        assert!(view.selected);
        assert!(game.square_view(sq("f3")).legal_target);
        assert!(!game.square_view(sq("e3")).legal_target);
        assert!(game.square_view(sq("a8")).light);
        assert!(!game.square_view(sq("h8")).light);
    }

    #[test]
    fn test_king_in_check_highlight() {
        let mut game = Game::new();
        for m in ["e2e4", "d7d5", "f1b5"] {
            game.apply_move(&Move::from_uci(m).unwrap()).unwrap();
        }
        let view = game.square_view(sq("e8"));
        assert_eq!(view.piece, Some(Piece::new(Color::Black, PieceKind::King)));
        assert!(view.king_in_check);
        assert!(!game.square_view(sq("e1")).king_in_check);
    }

    #[test]
    fn test_board_view_order() {
        let game = Game::new();
        let views = game.board_view(Orientation::new(true));
        assert_eq!(views.len(), 64);
        assert_eq!(views[0].square, sq("h1"));
        assert_eq!(views[63].square, sq("a8"));
    }
}
