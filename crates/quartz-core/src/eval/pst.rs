//! Piece-square tables, written in visual order (rank 8 first) and
//! indexed through [`table_index`] so the same data serves both colors.

use crate::piece::{Color, PieceType};
use crate::square::Square;
use crate::types::Score;

#[rustfmt::skip]
static PAWN_MG: [Score; 64] = [
     0,   0,   0,   0,   0,   0,   0,   0,
    50,  50,  50,  50,  50,  50,  50,  50,
    10,  10,  20,  30,  30,  20,  10,  10,
     5,   5,  10,  25,  25,  10,   5,   5,
     0,   0,   0,  20,  20,   0,   0,   0,
     5,  -5, -10,   0,   0, -10,  -5,   5,
     5,  10,  10, -20, -20,  10,  10,   5,
     0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
static PAWN_EG: [Score; 64] = [
     0,   0,   0,   0,   0,   0,   0,   0,
    80,  80,  80,  80,  80,  80,  80,  80,
    50,  50,  50,  50,  50,  50,  50,  50,
    30,  30,  30,  30,  30,  30,  30,  30,
    20,  20,  20,  20,  20,  20,  20,  20,
    10,  10,  10,  10,  10,  10,  10,  10,
    10,  10,  10,  10,  10,  10,  10,  10,
     0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
static KNIGHT: [Score; 64] = [
   -50, -40, -30, -30, -30, -30, -40, -50,
   -40, -20,   0,   0,   0,   0, -20, -40,
   -30,   0,  10,  15,  15,  10,   0, -30,
   -30,   5,  15,  20,  20,  15,   5, -30,
   -30,   0,  15,  20,  20,  15,   0, -30,
   -30,   5,  10,  15,  15,  10,   5, -30,
   -40, -20,   0,   5,   5,   0, -20, -40,
   -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
static BISHOP: [Score; 64] = [
   -20, -10, -10, -10, -10, -10, -10, -20,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -10,   0,   5,  10,  10,   5,   0, -10,
   -10,   5,   5,  10,  10,   5,   5, -10,
   -10,   0,  10,  10,  10,  10,   0, -10,
   -10,  10,  10,  10,  10,  10,  10, -10,
   -10,   5,   0,   0,   0,   0,   5, -10,
   -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
static ROOK: [Score; 64] = [
     0,   0,   0,   0,   0,   0,   0,   0,
     5,  10,  10,  10,  10,  10,  10,   5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
     0,   0,   0,   5,   5,   0,   0,   0,
];

#[rustfmt::skip]
static QUEEN: [Score; 64] = [
   -20, -10, -10,  -5,  -5, -10, -10, -20,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -10,   0,   5,   5,   5,   5,   0, -10,
    -5,   0,   5,   5,   5,   5,   0,  -5,
     0,   0,   5,   5,   5,   5,   0,  -5,
   -10,   5,   5,   5,   5,   5,   0, -10,
   -10,   0,   5,   0,   0,   0,   0, -10,
   -20, -10, -10,  -5,  -5, -10, -10, -20,
];

#[rustfmt::skip]
static KING_MG: [Score; 64] = [
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -20, -30, -30, -40, -40, -30, -30, -20,
   -10, -20, -20, -20, -20, -20, -20, -10,
    20,  20,   0,   0,   0,   0,  20,  20,
    20,  30,  10,   0,   0,  10,  30,  20,
];

#[rustfmt::skip]
static KING_EG: [Score; 64] = [
   -50, -40, -30, -20, -20, -30, -40, -50,
   -30, -20, -10,   0,   0, -10, -20, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -30,   0,   0,   0,   0, -30, -30,
   -50, -30, -30, -30, -30, -30, -30, -50,
];

// White looks the tables up through a rank flip, black directly, so one
// set of data covers both sides.
#[inline]
fn table_index(color: Color, sq: Square) -> usize {
    match color {
        Color::White => sq.flip_rank() as usize,
        Color::Black => sq as usize,
    }
}

/// Midgame and endgame bonuses for a piece on a square, from that
/// piece's own side's point of view.
#[inline]
pub fn piece_square(pt: PieceType, color: Color, sq: Square) -> (Score, Score) {
    let idx = table_index(color, sq);
    match pt {
        PieceType::Pawn => (PAWN_MG[idx], PAWN_EG[idx]),
        PieceType::Knight => (KNIGHT[idx], KNIGHT[idx]),
        PieceType::Bishop => (BISHOP[idx], BISHOP[idx]),
        PieceType::Rook => (ROOK[idx], ROOK[idx]),
        PieceType::Queen => (QUEEN[idx], QUEEN[idx]),
        PieceType::King => (KING_MG[idx], KING_EG[idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_color_symmetric() {
        for sq in Square::iter() {
            for pt in PieceType::ALL {
                let white = piece_square(pt, Color::White, sq);
                let black = piece_square(pt, Color::Black, sq.flip_rank());
                assert_eq!(white, black, "{pt:?} on {sq}");
            }
        }
    }

    #[test]
    fn test_central_knight_beats_rim_knight() {
        let center = piece_square(PieceType::Knight, Color::White, Square::E4).0;
        let rim = piece_square(PieceType::Knight, Color::White, Square::A1).0;
        assert!(center > rim);
    }

    #[test]
    fn test_castled_king_good_in_midgame_only() {
        let (mg, eg) = piece_square(PieceType::King, Color::White, Square::G1);
        let (center_mg, center_eg) = piece_square(PieceType::King, Color::White, Square::E5);
        assert!(mg > center_mg);
        assert!(eg < center_eg);
    }

    #[test]
    fn test_advanced_pawn_gains_in_endgame() {
        let (_, eg_a7) = piece_square(PieceType::Pawn, Color::White, Square::A7);
        let (_, eg_a3) = piece_square(PieceType::Pawn, Color::White, Square::A3);
        assert!(eg_a7 > eg_a3);
    }
}
