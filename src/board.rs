use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::errors::NotationError;
use crate::types::{Color, Piece, PieceKind, Square, BOARD_SIZE};

pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

pub const KING_HOME_COL: u8 = 4;
pub const QUEENSIDE_ROOK_COL: u8 = 0;
pub const KINGSIDE_ROOK_COL: u8 = 7;
/// Where the rook ends up after castling queenside / kingside
pub const QUEENSIDE_ROOK_TARGET_COL: u8 = 3;
pub const KINGSIDE_ROOK_TARGET_COL: u8 = 5;

static STARTING_BOARD: Lazy<Board> = Lazy::new(|| {
    let mut board = Board::empty();
    for color in [Color::White, Color::Black] {
        let home = color.home_row();
        for (col, kind) in BACK_RANK.iter().enumerate() {
            board.put(Square::new(home, col as u8), Some(Piece::new(color, *kind)));
        }
        for col in 0..BOARD_SIZE {
            board.put(Square::new(color.pawn_start_row(), col), Some(Piece::new(color, PieceKind::Pawn)));
        }
    }
    board
});

/// Castling eligibility bookkeeping. Flags only ever go from false to true during a
/// game; a fresh game starts with all of them cleared.
///
/// "left" is the a-file rook and "right" the h-file rook for both colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    king_moved: [bool; 2],
    left_rook_moved: [bool; 2],
    right_rook_moved: [bool; 2],
}

impl CastlingRights {
    /// Whether the flags still permit castling. Path and attack conditions are checked
    /// separately by the legality engine.
    pub fn can_castle(&self, color: Color, kingside: bool) -> bool {
        let i = color.index();
        !self.king_moved[i]
            && if kingside {
                !self.right_rook_moved[i]
            } else {
                !self.left_rook_moved[i]
            }
    }

    pub fn mark_king_moved(&mut self, color: Color) {
        self.king_moved[color.index()] = true;
    }

    pub fn mark_rook_moved(&mut self, color: Color, left: bool) {
        if left {
            self.left_rook_moved[color.index()] = true;
        } else {
            self.right_rook_moved[color.index()] = true;
        }
    }

    /// FEN castling field, `-` if nobody may castle
    pub fn to_fen(&self) -> String {
        let field: String = [
            (Color::White, true, 'K'),
            (Color::White, false, 'Q'),
            (Color::Black, true, 'k'),
            (Color::Black, false, 'q'),
        ]
        .iter()
        .filter(|(color, kingside, _)| self.can_castle(*color, *kingside))
        .map(|(_, _, c)| *c)
        .collect();
        if field.is_empty() {
            "-".to_string()
        } else {
            field
        }
    }

    fn from_fen(field: &str) -> Option<Self> {
        if field != "-" && !field.chars().all(|c| "KQkq".contains(c)) {
            return None;
        }
        let mut rights = Self::default();
        for (color, kingside, c) in [
            (Color::White, true, 'K'),
            (Color::White, false, 'Q'),
            (Color::Black, true, 'k'),
            (Color::Black, false, 'q'),
        ] {
            if !field.contains(c) {
                rights.mark_rook_moved(color, !kingside);
            }
        }
        Some(rights)
    }
}

/// Prior contents of every square touched by a speculative change, plus the king
/// cache as it was before. Restored in reverse order by [`Board::rollback`].
#[derive(Debug)]
pub(crate) struct UndoLog {
    entries: Vec<(Square, Option<Piece>)>,
    king_locations: [Square; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
    // cached square of each king, indexed by color
    king_locations: [Square; 2],
    // who's move it is
    active_color: Color,
    castling_rights: CastlingRights,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The standard starting position
    pub fn new() -> Board {
        STARTING_BOARD.clone()
    }

    fn empty() -> Board {
        Board {
            squares: [[None; 8]; 8],
            king_locations: [
                Square::new(Color::White.home_row(), KING_HOME_COL),
                Square::new(Color::Black.home_row(), KING_HOME_COL),
            ],
            active_color: Color::White,
            castling_rights: CastlingRights::default(),
        }
    }

    /// Load a position. The en passant and move counter fields are accepted but
    /// ignored since neither is tracked.
    pub fn from_fen(fen_string: &str) -> Result<Board, NotationError> {
        let fail = |reason: &str| NotationError::Fen {
            fen: fen_string.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = fen_string.split_whitespace().collect();
        if parts.len() < 2 || parts.len() > 6 {
            return Err(fail("expected between 2 and 6 space separated fields"));
        }

        let mut board = Board::empty();
        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != BOARD_SIZE as usize {
            return Err(fail("expected 8 ranks"));
        }
        let mut kings = [0usize; 2];
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0u8;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or_else(|| fail("unknown piece letter"))?;
                    if col >= BOARD_SIZE {
                        return Err(fail("rank is too long"));
                    }
                    if piece.kind == PieceKind::King {
                        kings[piece.color.index()] += 1;
                    }
                    board.put(Square::new(row as u8, col), Some(piece));
                    col += 1;
                }
                if col > BOARD_SIZE {
                    return Err(fail("rank is too long"));
                }
            }
            if col != BOARD_SIZE {
                return Err(fail("rank is too short"));
            }
        }
        if kings != [1, 1] {
            return Err(fail("each side needs exactly one king"));
        }

        board.active_color = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(fail("active color must be `w` or `b`")),
        };
        if let Some(field) = parts.get(2) {
            board.castling_rights = CastlingRights::from_fen(field).ok_or_else(|| fail("bad castling field"))?;
        }
        // the side that just moved cannot have left its own king attacked
        if board.is_in_check(board.active_color.other_color()) {
            return Err(fail("side not to move is in check"));
        }
        Ok(board)
    }

    /// Serialize to FEN. En passant is always `-` and the counters are always `0 1`.
    pub fn to_fen(&self) -> String {
        let placement = (0..BOARD_SIZE)
            .map(|row| {
                let mut rank = String::new();
                let mut empty = 0;
                for col in 0..BOARD_SIZE {
                    match self.piece_at(Square::new(row, col)) {
                        Some(piece) => {
                            if empty > 0 {
                                rank.push_str(&empty.to_string());
                                empty = 0;
                            }
                            rank.push(piece.to_fen_char());
                        }
                        None => empty += 1,
                    }
                }
                if empty > 0 {
                    rank.push_str(&empty.to_string());
                }
                rank
            })
            .join("/");
        format!(
            "{} {} {} - 0 1",
            placement,
            self.active_color.to_char(),
            self.castling_rights.to_fen()
        )
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.row as usize][square.col as usize]
    }

    /// Get the color of the side to move
    pub fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn castling_rights(&self) -> &CastlingRights {
        &self.castling_rights
    }

    pub(crate) fn castling_rights_mut(&mut self) -> &mut CastlingRights {
        &mut self.castling_rights
    }

    pub fn king_location(&self, color: Color) -> Square {
        self.king_locations[color.index()]
    }

    pub(crate) fn flip_active_color(&mut self) {
        self.active_color = self.active_color.other_color();
    }

    /// All pieces of `color` with their squares
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| match self.piece_at(sq) {
            Some(p) if p.color == color => Some((sq, p)),
            _ => None,
        })
    }

    /// Overwrite a square and return what was there. This is the only way the grid
    /// changes, so placing a king here is what keeps the king cache in sync.
    pub(crate) fn put(&mut self, square: Square, piece: Option<Piece>) -> Option<Piece> {
        if let Some(p) = piece {
            if p.kind == PieceKind::King {
                self.king_locations[p.color.index()] = square;
            }
        }
        std::mem::replace(&mut self.squares[square.row as usize][square.col as usize], piece)
    }

    pub(crate) fn undo_log(&self) -> UndoLog {
        UndoLog {
            entries: Vec::with_capacity(2),
            king_locations: self.king_locations,
        }
    }

    /// `put`, remembering the previous occupant in `log`
    pub(crate) fn put_logged(&mut self, square: Square, piece: Option<Piece>, log: &mut UndoLog) {
        let prior = self.put(square, piece);
        log.entries.push((square, prior));
    }

    /// Move whatever stands on `from` to `to`, recording both squares in `log`
    pub(crate) fn relocate_logged(&mut self, from: Square, to: Square, log: &mut UndoLog) {
        let piece = self.piece_at(from);
        self.put_logged(from, None, log);
        self.put_logged(to, piece, log);
    }

    pub(crate) fn rollback(&mut self, log: UndoLog) {
        for (square, prior) in log.entries.into_iter().rev() {
            self.squares[square.row as usize][square.col as usize] = prior;
        }
        self.king_locations = log.king_locations;
    }

    pub fn draw_board(&self) -> String {
        self.draw_board_oriented(false)
    }

    /// Board with file and rank labels; `flipped` puts black at the bottom
    pub fn draw_board_oriented(&self, flipped: bool) -> String {
        let rows: Vec<u8> = if flipped { (0..8).rev().collect() } else { (0..8).collect() };
        let cols: Vec<u8> = if flipped { (0..8).rev().collect() } else { (0..8).collect() };
        let mut string = String::new();
        for &r in &rows {
            string.push(Square::new(r, 0).rank_char());
            for &c in &cols {
                string.push(' ');
                string.push_str(match self.piece_at(Square::new(r, c)) {
                    Some(p) => p.to_symbol(),
                    None => ".",
                });
            }
            string.push('\n');
        }
        string.push(' ');
        for &c in &cols {
            string.push(' ');
            string.push(Square::new(0, c).file_char());
        }
        string.push('\n');
        string
    }

    pub fn draw_to_terminal(&self) {
        println!("{}", self.draw_board());
    }
}
