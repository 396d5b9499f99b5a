//! Move legality on a [`Board`].
//!
//! Legality is decided in two stages. A move is pseudo-legal when it fits the piece's
//! movement pattern and the occupancy of the board. It is legal when, in addition,
//! playing it does not leave the mover's own king attacked. The second stage is
//! answered by actually playing the move on the board, asking whether the king is
//! attacked, and rolling the board back through an undo log.

use std::collections::HashSet;

use crate::board::{
    Board, KINGSIDE_ROOK_COL, KINGSIDE_ROOK_TARGET_COL, KING_HOME_COL, QUEENSIDE_ROOK_COL, QUEENSIDE_ROOK_TARGET_COL,
};
use crate::types::{Color, Move, PieceKind, Square, PIECES_CAN_PROMOTE_TO};

impl Board {
    /// Are all squares strictly between `from` and `to` empty? Only meaningful when the
    /// two squares share a row, a column or a diagonal.
    pub fn path_clear(&self, from: Square, to: Square) -> bool {
        let row_step = (to.row as i8 - from.row as i8).signum();
        let col_step = (to.col as i8 - from.col as i8).signum();
        let mut current = from;
        loop {
            current = match current.offset(row_step, col_step) {
                Some(next) => next,
                None => return true,
            };
            if current == to {
                return true;
            }
            if self.piece_at(current).is_some() {
                return false;
            }
        }
    }

    /// Pattern plus occupancy, without looking at the safety of the mover's king
    pub fn is_pseudo_legal(&self, from: Square, to: Square) -> bool {
        let piece = match self.piece_at(from) {
            Some(p) => p,
            None => return false,
        };
        let target = self.piece_at(to);
        if target.is_some_and(|t| t.color == piece.color) {
            return false;
        }
        if !piece.matches_pattern(from, to) {
            return false;
        }
        match piece.kind {
            PieceKind::Pawn => {
                if from.col == to.col {
                    // pushes need an empty destination, double pushes an empty middle square too
                    if target.is_some() {
                        return false;
                    }
                    if (to.row as i8 - from.row as i8).abs() == 2 {
                        return self.path_clear(from, to);
                    }
                    true
                } else {
                    // diagonal steps are captures only
                    target.is_some()
                }
            }
            PieceKind::Rook | PieceKind::Bishop | PieceKind::Queen => self.path_clear(from, to),
            PieceKind::Knight | PieceKind::King => true,
        }
    }

    /// Can any piece of `by` move onto `square`?
    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        self.pieces(by).any(|(from, _)| self.is_pseudo_legal(from, square))
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_location(color), color.other_color())
    }

    /// Castling test for a king on `king_square` heading to `dest`.
    ///
    /// Requires the king on its home square, a two column step along the home row,
    /// untouched castling flags, the king not in check right now, the matching rook
    /// in its corner, nothing between king and rook, and the king not in check once
    /// king and rook stand on their new squares. The square the king crosses is not
    /// tested for attacks.
    pub fn can_castle(&self, king_square: Square, dest: Square) -> bool {
        let king = match self.piece_at(king_square) {
            Some(p) if p.kind == PieceKind::King => p,
            _ => return false,
        };
        let home = king.color.home_row();
        if king_square != Square::new(home, KING_HOME_COL) || dest.row != home {
            return false;
        }
        let kingside = match dest.col as i8 - king_square.col as i8 {
            2 => true,
            -2 => false,
            _ => return false,
        };
        if !self.castling_rights().can_castle(king.color, kingside) {
            return false;
        }
        if self.is_in_check(king.color) {
            return false;
        }
        let rook_square = Square::new(home, if kingside { KINGSIDE_ROOK_COL } else { QUEENSIDE_ROOK_COL });
        match self.piece_at(rook_square) {
            Some(rook) if rook.kind == PieceKind::Rook && rook.color == king.color => {}
            _ => return false,
        }
        if !self.path_clear(king_square, rook_square) {
            return false;
        }

        let rook_target = Square::new(home, if kingside { KINGSIDE_ROOK_TARGET_COL } else { QUEENSIDE_ROOK_TARGET_COL });
        let mut after = self.clone();
        let rook = after.put(rook_square, None);
        after.put(king_square, None);
        after.put(rook_target, rook);
        after.put(dest, Some(king));
        !after.is_in_check(king.color)
    }

    /// Pseudo-legal and does not leave the mover's king attacked.
    ///
    /// The move is played on the board itself and undone before returning, so the
    /// board is unchanged afterwards whatever the answer.
    pub fn is_legal(&mut self, from: Square, to: Square) -> bool {
        if !self.is_pseudo_legal(from, to) {
            return false;
        }
        let mover = match self.piece_at(from) {
            Some(p) => p.color,
            None => return false,
        };
        let mut log = self.undo_log();
        self.relocate_logged(from, to, &mut log);
        let in_check = self.is_in_check(mover);
        self.rollback(log);
        !in_check
    }

    /// Every square the piece on `square` may legally move to, castling included
    pub fn legal_destinations(&mut self, square: Square) -> HashSet<Square> {
        let mut destinations: HashSet<Square> = Square::all().filter(|to| self.is_legal(square, *to)).collect();
        if self.piece_at(square).is_some_and(|p| p.kind == PieceKind::King) {
            for d_col in [2, -2] {
                if let Some(dest) = square.offset(0, d_col) {
                    if self.can_castle(square, dest) {
                        destinations.insert(dest);
                    }
                }
            }
        }
        destinations
    }

    /// Every legal move for `color`. Pawn moves onto the last row are expanded into
    /// one move per promotion choice.
    pub fn legal_moves(&mut self, color: Color) -> Vec<Move> {
        let origins: Vec<(Square, PieceKind)> = self.pieces(color).map(|(sq, p)| (sq, p.kind)).collect();
        let mut moves = Vec::new();
        for (from, kind) in origins {
            let mut destinations: Vec<Square> = self.legal_destinations(from).into_iter().collect();
            destinations.sort();
            for to in destinations {
                if kind == PieceKind::Pawn && (to.row == 0 || to.row == 7) {
                    moves.extend(PIECES_CAN_PROMOTE_TO.iter().map(|k| Move::with_promotion(from, to, *k)));
                } else {
                    moves.push(Move::new(from, to));
                }
            }
        }
        moves
    }

    /// Exhaustive scan: does any piece of `color` have at least one legal destination?
    /// Castling is not consulted: whenever it is available the castling rook has a
    /// legal move of its own.
    pub fn has_legal_move(&mut self, color: Color) -> bool {
        let origins: Vec<Square> = self.pieces(color).map(|(sq, _)| sq).collect();
        origins
            .into_iter()
            .any(|from| Square::all().any(|to| self.is_legal(from, to)))
    }

    pub fn is_checkmate(&mut self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_legal_move(color)
    }

    pub fn is_stalemate(&mut self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_legal_move(color)
    }
}
