use std::fmt;
use std::ops::Not;

use crate::types::Score;

/// Side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl Color {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Rank-direction of pawn pushes: +8 for White, -8 for Black.
    #[inline]
    pub fn forward(self) -> i32 {
        match self {
            Color::White => 8,
            Color::Black => -8,
        }
    }
}

/// Kind of piece, independent of color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PieceType {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> PieceType {
        debug_assert!(index < 6);
        unsafe { std::mem::transmute(index as u8) }
    }

    /// Material value used by exchange evaluation and move ordering.
    #[inline]
    pub fn value(self) -> Score {
        const VALUES: [Score; 6] = [100, 320, 330, 500, 900, 20000];
        VALUES[self as usize]
    }
}

/// A colored piece, or `None` for an empty square.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Piece {
    WhitePawn = 0,
    WhiteKnight = 1,
    WhiteBishop = 2,
    WhiteRook = 3,
    WhiteQueen = 4,
    WhiteKing = 5,
    BlackPawn = 6,
    BlackKnight = 7,
    BlackBishop = 8,
    BlackRook = 9,
    BlackQueen = 10,
    BlackKing = 11,
    None = 12,
}

impl Piece {
    #[inline]
    pub fn new(color: Color, pt: PieceType) -> Piece {
        unsafe { std::mem::transmute(color as u8 * 6 + pt as u8) }
    }

    #[inline]
    pub fn from_index(index: usize) -> Piece {
        debug_assert!(index <= 12);
        unsafe { std::mem::transmute(index as u8) }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Piece::None
    }

    #[inline]
    pub fn color(self) -> Color {
        debug_assert!(self.is_some());
        if (self as u8) < 6 { Color::White } else { Color::Black }
    }

    #[inline]
    pub fn piece_type(self) -> PieceType {
        debug_assert!(self.is_some());
        PieceType::from_index(self as usize % 6)
    }

    /// Parses a FEN piece letter.
    pub fn from_fen_char(c: char) -> Option<Piece> {
        let pt = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(color, pt))
    }

    pub fn to_fen_char(self) -> char {
        let c = match self.piece_type() {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        };
        match self.color() {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_some() {
            write!(f, "{}", self.to_fen_char())
        } else {
            write!(f, ".")
        }
    }
}
