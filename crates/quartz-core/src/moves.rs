//! Compact move encoding.
//!
//! A move packs origin, destination and kind into 16 bits:
//! bits 0-5 origin square, bits 6-11 destination square, bits 12-15 kind.
//! Equality compares the packed word, so two moves are equal exactly when
//! origin, destination and kind all match.

use std::fmt;

use crate::piece::PieceType;
use crate::square::Square;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum MoveKind {
    Quiet = 0,
    DoublePush = 1,
    CastleWhiteKing = 2,
    CastleWhiteQueen = 3,
    CastleBlackKing = 4,
    CastleBlackQueen = 5,
    Capture = 6,
    EnPassant = 7,
    PromoKnight = 8,
    PromoBishop = 9,
    PromoRook = 10,
    PromoQueen = 11,
    PromoCaptureKnight = 12,
    PromoCaptureBishop = 13,
    PromoCaptureRook = 14,
    PromoCaptureQueen = 15,
}

impl MoveKind {
    #[inline]
    fn from_u16(value: u16) -> MoveKind {
        debug_assert!(value < 16);
        unsafe { std::mem::transmute(value) }
    }

    #[inline]
    pub fn is_castle_kind(self) -> bool {
        matches!(
            self,
            MoveKind::CastleWhiteKing
                | MoveKind::CastleWhiteQueen
                | MoveKind::CastleBlackKing
                | MoveKind::CastleBlackQueen
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Move(u16);

impl Move {
    /// Sentinel for "no move". Encodes a1-to-a1, which no legal move uses.
    pub const NONE: Move = Move(0);

    #[inline]
    pub fn new(from: Square, to: Square, kind: MoveKind) -> Move {
        debug_assert!(from.is_some() && to.is_some());
        Move(from as u16 | ((to as u16) << 6) | ((kind as u16) << 12))
    }

    #[inline]
    pub fn from(self) -> Square {
        Square::from_usize_unchecked((self.0 & 63) as usize)
    }

    #[inline]
    pub fn to(self) -> Square {
        Square::from_usize_unchecked(((self.0 >> 6) & 63) as usize)
    }

    #[inline]
    pub fn kind(self) -> MoveKind {
        MoveKind::from_u16(self.0 >> 12)
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Move::NONE
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Move::NONE
    }

    /// True for regular captures, en passant, and capturing promotions.
    #[inline]
    pub fn is_capture(self) -> bool {
        matches!(
            self.kind(),
            MoveKind::Capture
                | MoveKind::EnPassant
                | MoveKind::PromoCaptureKnight
                | MoveKind::PromoCaptureBishop
                | MoveKind::PromoCaptureRook
                | MoveKind::PromoCaptureQueen
        )
    }

    #[inline]
    pub fn is_promotion(self) -> bool {
        self.0 >> 12 >= MoveKind::PromoKnight as u16
    }

    #[inline]
    pub fn is_castle(self) -> bool {
        matches!(
            self.kind(),
            MoveKind::CastleWhiteKing
                | MoveKind::CastleWhiteQueen
                | MoveKind::CastleBlackKing
                | MoveKind::CastleBlackQueen
        )
    }

    /// True for captures and queen promotions, the move set explored by
    /// quiescence search when not in check.
    #[inline]
    pub fn is_tactical(self) -> bool {
        self.is_capture() || self.kind() == MoveKind::PromoQueen
    }

    /// Piece type a promotion yields. Only valid for promotion moves.
    #[inline]
    pub fn promotion_type(self) -> PieceType {
        debug_assert!(self.is_promotion());
        PieceType::from_index(PieceType::Knight as usize + ((self.0 >> 12) & 3) as usize)
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u16) -> Move {
        Move(raw)
    }
}

impl fmt::Display for Move {
    /// Long algebraic notation, e.g. `e2e4` or `e7e8q`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_some() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", self.from(), self.to())?;
        if self.is_promotion() {
            let c = match self.promotion_type() {
                PieceType::Knight => 'n',
                PieceType::Bishop => 'b',
                PieceType::Rook => 'r',
                _ => 'q',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({:?})", self.kind())
    }
}
