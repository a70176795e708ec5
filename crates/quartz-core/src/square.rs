use std::fmt;
use std::str::FromStr;

/// Represents a square on a chessboard, ranging from A1 to H8.
///
/// Squares are numbered with A1 = 0 and H8 = 63, rank by rank, so moving
/// one rank up adds 8 to the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
    None,
}

impl Square {
    /// Converts the `Square` into a single-bit bitboard.
    #[inline]
    pub fn bitboard(self) -> u64 {
        debug_assert!((self as usize) < 64, "bitboard() on Square::None");
        1u64 << self as usize
    }

    /// Converts a `usize` index into a `Square`.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `index` is above 64 (64 maps to `None`).
    #[inline]
    pub fn from_usize_unchecked(index: usize) -> Square {
        debug_assert!(index <= 64, "index out of bounds for Square: {index}");
        unsafe { std::mem::transmute(index as u8) }
    }

    #[inline]
    pub fn from_file_rank(file: usize, rank: usize) -> Square {
        debug_assert!(file < 8 && rank < 8);
        Square::from_usize_unchecked(rank * 8 + file)
    }

    /// File index, 0 = a-file.
    #[inline]
    pub fn file(self) -> usize {
        self as usize & 7
    }

    /// Rank index, 0 = first rank.
    #[inline]
    pub fn rank(self) -> usize {
        self as usize >> 3
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Square::None
    }

    /// Mirrors the square vertically (A1 <-> A8).
    #[inline]
    pub fn flip_rank(self) -> Square {
        debug_assert!(self.is_some());
        Square::from_usize_unchecked(self as usize ^ 56)
    }

    /// Returns an iterator over all 64 squares.
    #[inline]
    pub fn iter() -> impl Iterator<Item = Square> {
        (0..64).map(Square::from_usize_unchecked)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Square::None {
            return write!(f, "-");
        }
        let file = (b'a' + self.file() as u8) as char;
        let rank = (b'1' + self.rank() as u8) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Square {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(format!("invalid square: {s}"));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file >= 8 || rank >= 8 {
            return Err(format!("invalid square: {s}"));
        }
        Ok(Square::from_file_rank(file as usize, rank as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_index_round_trip() {
        for sq in Square::iter() {
            assert_eq!(Square::from_file_rank(sq.file(), sq.rank()), sq);
            assert_eq!(sq.bitboard().trailing_zeros() as usize, sq as usize);
        }
    }

    #[test]
    fn test_square_parse_and_display() {
        assert_eq!("e4".parse::<Square>().unwrap(), Square::E4);
        assert_eq!("a1".parse::<Square>().unwrap(), Square::A1);
        assert_eq!("h8".parse::<Square>().unwrap(), Square::H8);
        assert!("i9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
        assert_eq!(Square::C7.to_string(), "c7");
    }

    #[test]
    fn test_flip_rank() {
        assert_eq!(Square::A1.flip_rank(), Square::A8);
        assert_eq!(Square::E4.flip_rank(), Square::E5);
        assert_eq!(Square::H8.flip_rank(), Square::H1);
    }
}
