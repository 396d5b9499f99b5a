use std::fmt;

use itertools::iproduct;

use crate::errors::NotationError;

pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    pub fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn other_color(&self) -> Color {
        if *self == Color::White {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Row delta of a pawn step. White advances toward row 0.
    pub fn pawn_direction(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    pub fn pawn_start_row(&self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row holding the king and rooks at the start of the game
    pub fn home_row(&self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub fn from_char(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Promotion choice from its letter. Anything unrecognised promotes to a queen.
    pub fn promotion_from_char(c: char) -> PieceKind {
        match PieceKind::from_char(c) {
            Some(kind) if kind.is_promotion_target() => kind,
            _ => PieceKind::Queen,
        }
    }

    /// Is the piece a sliding piece (one which can move multiple square in a given direction)
    pub fn is_sliding(&self) -> bool {
        matches!(self, PieceKind::Rook | PieceKind::Bishop | PieceKind::Queen)
    }

    pub fn is_promotion_target(&self) -> bool {
        PIECES_CAN_PROMOTE_TO.contains(self)
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    /// Lowercase letter, as used in FEN for black pieces and in coordinate promotions
    pub fn to_char(&self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

pub const PIECES_CAN_PROMOTE_TO: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// A square on the board, in board-array convention: row 0 is black's back rank,
/// row 7 is white's back rank, col 0 is the a-file.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    /// All 64 squares, row by row from row 0
    pub fn all() -> impl Iterator<Item = Square> {
        iproduct!(0..BOARD_SIZE, 0..BOARD_SIZE).map(|(row, col)| Square { row, col })
    }

    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Square> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if (0..BOARD_SIZE as i8).contains(&row) && (0..BOARD_SIZE as i8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    pub fn from_algebraic(s: &str) -> Result<Square, NotationError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(NotationError::Square(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(NotationError::Square(s.to_string()));
        }
        Ok(Square {
            row: 8 - (rank - b'0'),
            col: file - b'a',
        })
    }

    pub fn to_algebraic(&self) -> String {
        format!("{}{}", self.file_char(), self.rank_char())
    }

    pub fn file_char(&self) -> char {
        (b'a' + self.col) as char
    }

    pub fn rank_char(&self) -> char {
        (b'0' + 8 - self.row) as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Piece {
        Piece { color, kind }
    }

    /// Piece from its FEN letter, uppercase is white
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceKind::from_char(c).map(|kind| Piece {
            color: Color::from_case(c),
            kind,
        })
    }

    pub fn to_fen_char(&self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn to_symbol(&self) -> &'static str {
        match (self.color, self.kind) {
            (Color::White, PieceKind::Pawn) => "♙",
            (Color::White, PieceKind::Knight) => "♘",
            (Color::White, PieceKind::Bishop) => "♗",
            (Color::White, PieceKind::Rook) => "♖",
            (Color::White, PieceKind::Queen) => "♕",
            (Color::White, PieceKind::King) => "♔",
            (Color::Black, PieceKind::Pawn) => "♟︎",
            (Color::Black, PieceKind::Knight) => "♞",
            (Color::Black, PieceKind::Bishop) => "♝",
            (Color::Black, PieceKind::Rook) => "♜",
            (Color::Black, PieceKind::Queen) => "♛",
            (Color::Black, PieceKind::King) => "♚",
        }
    }

    /// Does `to` fit this piece's movement pattern from `from`, ignoring everything
    /// else on the board?
    ///
    /// Pawns report forward one, forward two from their starting row and the forward
    /// diagonals. Which of those are actually playable depends on occupancy, and that
    /// is settled by the legality checks on the board.
    pub fn matches_pattern(&self, from: Square, to: Square) -> bool {
        let d_row = to.row as i8 - from.row as i8;
        let d_col = to.col as i8 - from.col as i8;
        if d_row == 0 && d_col == 0 {
            return false;
        }
        match self.kind {
            PieceKind::Rook => d_row == 0 || d_col == 0,
            PieceKind::Bishop => d_row.abs() == d_col.abs(),
            PieceKind::Queen => d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs(),
            PieceKind::King => d_row.abs() <= 1 && d_col.abs() <= 1,
            PieceKind::Knight => matches!((d_row.abs(), d_col.abs()), (2, 1) | (1, 2)),
            PieceKind::Pawn => {
                let dir = self.color.pawn_direction();
                match d_col.abs() {
                    0 => {
                        d_row == dir || (from.row == self.color.pawn_start_row() && d_row == 2 * dir)
                    }
                    1 => d_row == dir,
                    _ => false,
                }
            }
        }
    }
}

/// A move request: origin, destination and an optional promotion choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Parse coordinate notation such as `e2e4` or `e7e8q`
    pub fn from_uci(s: &str) -> Result<Self, NotationError> {
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(NotationError::Move(s.to_string()));
        }
        let bad = |_| NotationError::Move(s.to_string());
        let from = Square::from_algebraic(&s[0..2]).map_err(bad)?;
        let to = Square::from_algebraic(&s[2..4]).map_err(bad)?;
        let promotion = match s[4..].chars().next() {
            Some(c) => match PieceKind::from_char(c) {
                Some(kind) if kind.is_promotion_target() => Some(kind),
                _ => return Err(NotationError::Move(s.to_string())),
            },
            None => None,
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }

    pub fn to_uci(&self) -> String {
        match self.promotion {
            Some(kind) => format!("{}{}{}", self.from, self.to, kind.to_char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

/// Where the game stands after the last accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the side to move
    InProgress,
    /// Contains the winner
    Checkmate(Color),
    Stalemate,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::InProgress)
    }
}
