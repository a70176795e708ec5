//! Zobrist keys for position hashing.
//!
//! Keys are generated once from a fixed seed so that hashes are stable
//! across runs and threads.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::piece::Piece;
use crate::square::Square;

const SEED: u64 = 0x5851_F42D_4C95_7F2D;

pub struct Zobrist {
    piece_square: [[u64; 64]; 12],
    castling: [u64; 16],
    en_passant_file: [u64; 8],
    side: u64,
}

static ZOBRIST: OnceLock<Zobrist> = OnceLock::new();

impl Zobrist {
    fn generate() -> Zobrist {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut piece_square = [[0u64; 64]; 12];
        for squares in piece_square.iter_mut() {
            for key in squares.iter_mut() {
                *key = rng.random();
            }
        }
        let mut castling = [0u64; 16];
        for key in castling.iter_mut().skip(1) {
            *key = rng.random();
        }
        let mut en_passant_file = [0u64; 8];
        for key in en_passant_file.iter_mut() {
            *key = rng.random();
        }
        Zobrist {
            piece_square,
            castling,
            en_passant_file,
            side: rng.random(),
        }
    }
}

#[inline]
fn zobrist() -> &'static Zobrist {
    ZOBRIST.get_or_init(Zobrist::generate)
}

/// Forces key generation. Called from crate init.
pub fn init() {
    let _ = zobrist();
}

#[inline]
pub fn piece_square(piece: Piece, sq: Square) -> u64 {
    zobrist().piece_square[piece.index()][sq as usize]
}

#[inline]
pub fn castling(rights: u8) -> u64 {
    zobrist().castling[rights as usize & 15]
}

#[inline]
pub fn en_passant(file: usize) -> u64 {
    zobrist().en_passant_file[file & 7]
}

#[inline]
pub fn side_to_move() -> u64 {
    zobrist().side
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        assert_eq!(
            piece_square(Piece::WhiteKnight, Square::G1),
            piece_square(Piece::WhiteKnight, Square::G1)
        );
        assert_eq!(side_to_move(), side_to_move());
    }

    #[test]
    fn test_keys_are_distinct() {
        assert_ne!(
            piece_square(Piece::WhitePawn, Square::E2),
            piece_square(Piece::WhitePawn, Square::E4)
        );
        assert_ne!(
            piece_square(Piece::WhitePawn, Square::E2),
            piece_square(Piece::BlackPawn, Square::E2)
        );
        assert_ne!(castling(1), castling(2));
        assert_ne!(en_passant(0), en_passant(7));
    }

    #[test]
    fn test_no_castling_rights_key_is_zero() {
        // Rights of zero must not perturb the hash, so that incremental
        // right updates can XOR unconditionally.
        assert_eq!(castling(0), 0);
    }
}
