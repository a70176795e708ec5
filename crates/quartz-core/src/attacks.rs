//! Precomputed attack tables.
//!
//! Leaper attacks (pawn, knight, king) are table lookups. Sliding attacks
//! use classical ray tables: the full ray in a direction is truncated at
//! the first blocker by XOR-ing away the ray beyond it.

use crate::bitboard::Bitboard;
use crate::piece::Color;
use crate::square::Square;

const NOT_FILE_A: u64 = !0x0101_0101_0101_0101;
const NOT_FILE_H: u64 = !0x8080_8080_8080_8080;

const fn shift_north(bb: u64) -> u64 {
    bb << 8
}
const fn shift_south(bb: u64) -> u64 {
    bb >> 8
}
const fn shift_east(bb: u64) -> u64 {
    (bb & NOT_FILE_H) << 1
}
const fn shift_west(bb: u64) -> u64 {
    (bb & NOT_FILE_A) >> 1
}
const fn shift_north_east(bb: u64) -> u64 {
    (bb & NOT_FILE_H) << 9
}
const fn shift_north_west(bb: u64) -> u64 {
    (bb & NOT_FILE_A) << 7
}
const fn shift_south_east(bb: u64) -> u64 {
    (bb & NOT_FILE_H) >> 7
}
const fn shift_south_west(bb: u64) -> u64 {
    (bb & NOT_FILE_A) >> 9
}

const fn shift_dir(bb: u64, dir: usize) -> u64 {
    match dir {
        DIR_N => shift_north(bb),
        DIR_NE => shift_north_east(bb),
        DIR_E => shift_east(bb),
        DIR_SE => shift_south_east(bb),
        DIR_S => shift_south(bb),
        DIR_SW => shift_south_west(bb),
        DIR_W => shift_west(bb),
        _ => shift_north_west(bb),
    }
}

// Ray directions. The first four run toward higher square indices, so the
// first blocker on those rays is the lowest set bit; the last four run
// toward lower indices and use the highest set bit.
const DIR_N: usize = 0;
const DIR_NE: usize = 1;
const DIR_E: usize = 2;
const DIR_NW: usize = 3;
const DIR_S: usize = 4;
const DIR_SW: usize = 5;
const DIR_W: usize = 6;
const DIR_SE: usize = 7;

const fn build_rays() -> [[u64; 64]; 8] {
    let mut rays = [[0u64; 64]; 8];
    let mut dir = 0;
    while dir < 8 {
        let mut sq = 0;
        while sq < 64 {
            let mut ray = 0u64;
            let mut step = shift_dir(1u64 << sq, dir);
            while step != 0 {
                ray |= step;
                step = shift_dir(step, dir);
            }
            rays[dir][sq] = ray;
            sq += 1;
        }
        dir += 1;
    }
    rays
}

const fn build_knight_attacks() -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0;
    while sq < 64 {
        let bb = 1u64 << sq;
        table[sq] = shift_north(shift_north_east(bb))
            | shift_north(shift_north_west(bb))
            | shift_south(shift_south_east(bb))
            | shift_south(shift_south_west(bb))
            | shift_east(shift_north_east(bb))
            | shift_east(shift_south_east(bb))
            | shift_west(shift_north_west(bb))
            | shift_west(shift_south_west(bb));
        sq += 1;
    }
    table
}

const fn build_king_attacks() -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0;
    while sq < 64 {
        let bb = 1u64 << sq;
        table[sq] = shift_north(bb)
            | shift_south(bb)
            | shift_east(bb)
            | shift_west(bb)
            | shift_north_east(bb)
            | shift_north_west(bb)
            | shift_south_east(bb)
            | shift_south_west(bb);
        sq += 1;
    }
    table
}

const fn build_pawn_attacks() -> [[u64; 64]; 2] {
    let mut table = [[0u64; 64]; 2];
    let mut sq = 0;
    while sq < 64 {
        let bb = 1u64 << sq;
        table[0][sq] = shift_north_east(bb) | shift_north_west(bb);
        table[1][sq] = shift_south_east(bb) | shift_south_west(bb);
        sq += 1;
    }
    table
}

static RAYS: [[u64; 64]; 8] = build_rays();
static KNIGHT_ATTACKS: [u64; 64] = build_knight_attacks();
static KING_ATTACKS: [u64; 64] = build_king_attacks();
static PAWN_ATTACKS: [[u64; 64]; 2] = build_pawn_attacks();

/// Squares attacked by a pawn of `color` standing on `sq`.
#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    PAWN_ATTACKS[color.index()][sq as usize]
}

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq as usize]
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq as usize]
}

#[inline]
fn ray_attack(dir: usize, sq: Square, occupied: Bitboard) -> Bitboard {
    let ray = RAYS[dir][sq as usize];
    let blockers = ray & occupied;
    if blockers == 0 {
        return ray;
    }
    let first = if dir < 4 {
        blockers.trailing_zeros() as usize
    } else {
        63 - blockers.leading_zeros() as usize
    };
    ray ^ RAYS[dir][first]
}

#[inline]
pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    ray_attack(DIR_NE, sq, occupied)
        | ray_attack(DIR_NW, sq, occupied)
        | ray_attack(DIR_SE, sq, occupied)
        | ray_attack(DIR_SW, sq, occupied)
}

#[inline]
pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    ray_attack(DIR_N, sq, occupied)
        | ray_attack(DIR_S, sq, occupied)
        | ray_attack(DIR_E, sq, occupied)
        | ray_attack(DIR_W, sq, occupied)
}

#[inline]
pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knight_attacks() {
        assert_eq!(knight_attacks(Square::A1), Square::B3.bitboard() | Square::C2.bitboard());
        assert_eq!(knight_attacks(Square::E4).count_ones(), 8);
        assert!(knight_attacks(Square::G1) & Square::F3.bitboard() != 0);
    }

    #[test]
    fn test_king_attacks() {
        assert_eq!(king_attacks(Square::E4).count_ones(), 8);
        assert_eq!(king_attacks(Square::A1).count_ones(), 3);
        assert_eq!(king_attacks(Square::H8).count_ones(), 3);
    }

    #[test]
    fn test_pawn_attacks() {
        assert_eq!(
            pawn_attacks(Color::White, Square::E4),
            Square::D5.bitboard() | Square::F5.bitboard()
        );
        assert_eq!(pawn_attacks(Color::White, Square::A2), Square::B3.bitboard());
        assert_eq!(
            pawn_attacks(Color::Black, Square::E4),
            Square::D3.bitboard() | Square::F3.bitboard()
        );
        assert_eq!(pawn_attacks(Color::Black, Square::H7), Square::G6.bitboard());
    }

    #[test]
    fn test_rook_attacks_empty_board() {
        let attacks = rook_attacks(Square::D4, 0);
        assert_eq!(attacks.count_ones(), 14);
        assert!(attacks & Square::D8.bitboard() != 0);
        assert!(attacks & Square::A4.bitboard() != 0);
        assert!(attacks & Square::E5.bitboard() == 0);
    }

    #[test]
    fn test_rook_attacks_with_blockers() {
        let occ = Square::D6.bitboard() | Square::F4.bitboard();
        let attacks = rook_attacks(Square::D4, occ);
        // Ray stops at and includes the blocker.
        assert!(attacks & Square::D6.bitboard() != 0);
        assert!(attacks & Square::D7.bitboard() == 0);
        assert!(attacks & Square::F4.bitboard() != 0);
        assert!(attacks & Square::G4.bitboard() == 0);
        assert!(attacks & Square::A4.bitboard() != 0);
    }

    #[test]
    fn test_bishop_attacks_with_blockers() {
        let occ = Square::F6.bitboard();
        let attacks = bishop_attacks(Square::D4, occ);
        assert!(attacks & Square::F6.bitboard() != 0);
        assert!(attacks & Square::G7.bitboard() == 0);
        assert!(attacks & Square::A1.bitboard() != 0);
        assert!(attacks & Square::A7.bitboard() != 0);
    }

    #[test]
    fn test_queen_attacks_combines_rook_and_bishop() {
        let occ = Square::D6.bitboard() | Square::F6.bitboard();
        assert_eq!(
            queen_attacks(Square::D4, occ),
            rook_attacks(Square::D4, occ) | bishop_attacks(Square::D4, occ)
        );
    }
}
