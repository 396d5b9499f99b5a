//! Playing a move on the board: validation, castling rook relocation, promotion,
//! castling-rights bookkeeping and the turn flip.

use tracing::debug;

use crate::board::{
    Board, KINGSIDE_ROOK_COL, KINGSIDE_ROOK_TARGET_COL, QUEENSIDE_ROOK_COL, QUEENSIDE_ROOK_TARGET_COL,
};
use crate::errors::MoveError;
use crate::types::{Move, Piece, PieceKind, Square};

/// What happened when a move was played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    pub mv: Move,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub castled: bool,
    pub promoted_to: Option<PieceKind>,
}

impl Executed {
    pub fn to_human(&self) -> String {
        if self.castled {
            let side = if self.mv.to.col > self.mv.from.col { "kingside" } else { "queenside" };
            return format!("{} castles {}", self.piece.color.to_human(), side);
        }
        let maybe_capture_str = match self.captured {
            Some(p) => format!(" capturing {} {}", p.color.to_human(), p.kind.to_human()),
            None => "".to_string(),
        };
        let maybe_promotion_str = match self.promoted_to {
            Some(kind) => format!(" promoting to {}", kind.to_human()),
            None => "".to_string(),
        };
        format!(
            "{} moves {} from {} to {}{}{}",
            self.piece.color.to_human(),
            self.piece.kind.to_human(),
            self.mv.from,
            self.mv.to,
            maybe_capture_str,
            maybe_promotion_str,
        )
    }
}

impl Board {
    /// Is this a two column king step, i.e. a castling attempt?
    pub fn is_castling_attempt(&self, from: Square, to: Square) -> bool {
        self.piece_at(from).is_some_and(|p| p.kind == PieceKind::King)
            && from.row == to.row
            && (to.col as i8 - from.col as i8).abs() == 2
    }

    /// Check a move request against the side to move and the legality rules.
    /// Leaves the board as it found it.
    pub fn validate(&mut self, mv: &Move) -> Result<(), MoveError> {
        let piece = self.piece_at(mv.from).ok_or(MoveError::NoPiece(mv.from))?;
        if piece.color != self.active_color() {
            return Err(MoveError::NotYourTurn(self.active_color()));
        }
        if self.is_castling_attempt(mv.from, mv.to) {
            if !self.can_castle(mv.from, mv.to) {
                return Err(MoveError::CastlingNotAllowed { from: mv.from, to: mv.to });
            }
        } else if !self.is_legal(mv.from, mv.to) {
            return Err(MoveError::Illegal { from: mv.from, to: mv.to });
        }
        Ok(())
    }

    /// Validate and play `mv`. On error nothing changes.
    pub fn try_execute(&mut self, mv: &Move) -> Result<Executed, MoveError> {
        self.validate(mv)?;
        Ok(self.execute(mv))
    }

    /// Play a move that has already been validated and hand the turn to the other side.
    ///
    /// A missing promotion choice, or one that is not a queen, rook, bishop or knight,
    /// promotes to a queen.
    ///
    /// # Panics
    ///
    /// If `mv.from` is empty or the move would capture a king. Use
    /// [`Board::try_execute`] for unchecked input.
    pub(crate) fn execute(&mut self, mv: &Move) -> Executed {
        let piece = match self.piece_at(mv.from) {
            Some(p) => p,
            None => panic!("execute called with an empty origin square {}", mv.from),
        };
        let color = piece.color;
        let mut executed = Executed {
            mv: *mv,
            piece,
            captured: None,
            castled: false,
            promoted_to: None,
        };

        if self.is_castling_attempt(mv.from, mv.to) {
            let kingside = mv.to.col > mv.from.col;
            let (rook_from_col, rook_to_col) = if kingside {
                (KINGSIDE_ROOK_COL, KINGSIDE_ROOK_TARGET_COL)
            } else {
                (QUEENSIDE_ROOK_COL, QUEENSIDE_ROOK_TARGET_COL)
            };
            let row = mv.from.row;
            self.put(mv.from, None);
            self.put(mv.to, Some(piece));
            let rook = self.put(Square::new(row, rook_from_col), None);
            self.put(Square::new(row, rook_to_col), rook);

            let rights = self.castling_rights_mut();
            rights.mark_king_moved(color);
            rights.mark_rook_moved(color, !kingside);
            executed.castled = true;
        } else {
            self.put(mv.from, None);
            executed.captured = self.put(mv.to, Some(piece));
            if let Some(captured) = executed.captured {
                assert!(
                    captured.kind != PieceKind::King,
                    "king cannot be captured, something is amiss"
                );
            }

            match piece.kind {
                PieceKind::King => self.castling_rights_mut().mark_king_moved(color),
                PieceKind::Rook if mv.from.row == color.home_row() => {
                    if mv.from.col == QUEENSIDE_ROOK_COL {
                        self.castling_rights_mut().mark_rook_moved(color, true);
                    } else if mv.from.col == KINGSIDE_ROOK_COL {
                        self.castling_rights_mut().mark_rook_moved(color, false);
                    }
                }
                PieceKind::Pawn if mv.to.row == 0 || mv.to.row == 7 => {
                    let kind = match mv.promotion {
                        Some(kind) if kind.is_promotion_target() => kind,
                        _ => PieceKind::Queen,
                    };
                    self.put(mv.to, Some(Piece::new(color, kind)));
                    executed.promoted_to = Some(kind);
                }
                _ => {}
            }
        }

        self.flip_active_color();
        debug!(mv = %mv, "{}", executed.to_human());
        executed
    }
}
