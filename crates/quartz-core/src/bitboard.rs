//! Bitboard primitives. One bit per square, A1 = bit 0, H8 = bit 63.

use crate::square::Square;

pub type Bitboard = u64;

pub const FILE_A: Bitboard = 0x0101_0101_0101_0101;
pub const FILE_B: Bitboard = FILE_A << 1;
pub const FILE_G: Bitboard = FILE_A << 6;
pub const FILE_H: Bitboard = FILE_A << 7;

pub const RANK_1: Bitboard = 0xFF;
pub const RANK_2: Bitboard = RANK_1 << 8;
pub const RANK_3: Bitboard = RANK_1 << 16;
pub const RANK_6: Bitboard = RANK_1 << 40;
pub const RANK_7: Bitboard = RANK_1 << 48;
pub const RANK_8: Bitboard = RANK_1 << 56;

#[inline]
pub fn file_bb(file: usize) -> Bitboard {
    FILE_A << file
}

#[inline]
pub fn north(bb: Bitboard) -> Bitboard {
    bb << 8
}

#[inline]
pub fn south(bb: Bitboard) -> Bitboard {
    bb >> 8
}

#[inline]
pub fn east(bb: Bitboard) -> Bitboard {
    (bb & !FILE_H) << 1
}

#[inline]
pub fn west(bb: Bitboard) -> Bitboard {
    (bb & !FILE_A) >> 1
}

#[inline]
pub fn north_east(bb: Bitboard) -> Bitboard {
    (bb & !FILE_H) << 9
}

#[inline]
pub fn north_west(bb: Bitboard) -> Bitboard {
    (bb & !FILE_A) << 7
}

#[inline]
pub fn south_east(bb: Bitboard) -> Bitboard {
    (bb & !FILE_H) >> 7
}

#[inline]
pub fn south_west(bb: Bitboard) -> Bitboard {
    (bb & !FILE_A) >> 9
}

/// Lowest set bit as a square. The board must be non-empty.
#[inline]
pub fn lsb(bb: Bitboard) -> Square {
    debug_assert!(bb != 0);
    Square::from_usize_unchecked(bb.trailing_zeros() as usize)
}

#[inline]
pub fn more_than_one(bb: Bitboard) -> bool {
    bb & bb.wrapping_sub(1) != 0
}

/// Iterator over the set bits of a bitboard, yielding squares.
pub struct BitboardIterator {
    bb: Bitboard,
}

impl BitboardIterator {
    #[inline]
    pub fn new(bb: Bitboard) -> BitboardIterator {
        BitboardIterator { bb }
    }
}

impl Iterator for BitboardIterator {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        if self.bb == 0 {
            return None;
        }
        let sq = lsb(self.bb);
        self.bb &= self.bb - 1;
        Some(sq)
    }
}
