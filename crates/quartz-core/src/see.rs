//! Static exchange evaluation.
//!
//! Plays out the capture sequence on a single square with both sides
//! always capturing with their least valuable attacker, then backs the
//! gains up with the option to stand pat at every level. Sliders behind
//! the current attacker join in automatically because the attacker set
//! is recomputed against the shrinking occupancy.

use crate::bitboard::{self, Bitboard};
use crate::moves::{Move, MoveKind};
use crate::piece::{Color, PieceType};
use crate::position::Position;
use crate::square::Square;
use crate::types::Score;

const MAX_EXCHANGE_DEPTH: usize = 32;

/// Expected material balance of `mv` and all best recaptures on its
/// destination square, from the mover's point of view.
pub fn see(pos: &Position, mv: Move) -> Score {
    let from = mv.from();
    let to = mv.to();

    let mut gain = [0i32; MAX_EXCHANGE_DEPTH];
    gain[0] = match mv.kind() {
        MoveKind::EnPassant => PieceType::Pawn.value(),
        _ if mv.is_capture() => pos.piece_on(to).piece_type().value(),
        _ => 0,
    };
    if mv.is_promotion() {
        gain[0] += mv.promotion_type().value() - PieceType::Pawn.value();
    }

    // Value standing on the target square, at risk for the next capture.
    let mut at_risk = if mv.is_promotion() {
        mv.promotion_type().value()
    } else {
        pos.piece_on(from).piece_type().value()
    };

    let mut occ = pos.occupied() ^ from.bitboard();
    if mv.kind() == MoveKind::EnPassant {
        occ ^= Square::from_file_rank(to.file(), from.rank()).bitboard();
    }
    let mut side = !pos.side_to_move();

    let mut depth = 0;
    loop {
        let attackers = pos.attackers_to(to, occ) & occ;
        let ours = attackers & pos.pieces_of(side);
        if ours == 0 {
            break;
        }
        let (att_sq, att_pt) = least_valuable(pos, ours);
        // The king may only recapture onto an undefended square.
        if att_pt == PieceType::King && attackers & pos.pieces_of(!side) != 0 {
            break;
        }
        depth += 1;
        if depth >= MAX_EXCHANGE_DEPTH {
            break;
        }
        gain[depth] = at_risk - gain[depth - 1];
        // A pawn recapturing onto the last rank leaves a queen behind.
        let promotes = att_pt == PieceType::Pawn
            && to.rank() == if side == Color::White { 7 } else { 0 };
        if promotes {
            gain[depth] += PieceType::Queen.value() - PieceType::Pawn.value();
        }
        if gain[depth].max(-gain[depth - 1]) < 0 {
            break;
        }
        at_risk = if promotes { PieceType::Queen.value() } else { att_pt.value() };
        occ ^= att_sq.bitboard();
        side = !side;
    }

    while depth > 0 {
        gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
        depth -= 1;
    }
    gain[0]
}

/// Whether the exchange on `mv` is worth at least `threshold`.
#[inline]
pub fn see_ge(pos: &Position, mv: Move, threshold: Score) -> bool {
    see(pos, mv) >= threshold
}

fn least_valuable(pos: &Position, attackers: Bitboard) -> (Square, PieceType) {
    for pt in PieceType::ALL {
        let subset = attackers & pos.pieces_by_type(pt);
        if subset != 0 {
            return (bitboard::lsb(subset), pt);
        }
    }
    unreachable!("empty attacker set")
}
