//! Static evaluation.
//!
//! Material plus piece-square tables, tapered between midgame and
//! endgame by remaining piece count, with pawn structure terms cached
//! by the pawn/king hash. The result is from the side to move's point
//! of view, as quiescence stand-pat requires.

mod pawn_cache;
mod pst;

pub use pawn_cache::PawnCache;

use crate::bitboard::{self, Bitboard, BitboardIterator, file_bb};
use crate::constants::SCORE_DRAW;
use crate::piece::{Color, PieceType};
use crate::position::Position;
use crate::square::Square;
use crate::types::Score;

const TEMPO: Score = 10;
const BISHOP_PAIR: Score = 30;
const DOUBLED_PAWN: Score = -10;
const ISOLATED_PAWN: Score = -15;
static PASSED_PAWN: [Score; 8] = [0, 10, 15, 25, 40, 60, 100, 0];

/// Game phase contribution per piece type; 24 with all pieces on board.
pub const PHASE_MAX: i32 = 24;

/// Remaining-material phase, 0 (bare kings) to [`PHASE_MAX`] (full board).
pub fn game_phase(pos: &Position) -> i32 {
    let minors = (pos.pieces_by_type(PieceType::Knight)
        | pos.pieces_by_type(PieceType::Bishop))
    .count_ones() as i32;
    let rooks = pos.pieces_by_type(PieceType::Rook).count_ones() as i32;
    let queens = pos.pieces_by_type(PieceType::Queen).count_ones() as i32;
    (minors + 2 * rooks + 4 * queens).min(PHASE_MAX)
}

/// Piece-square gain of moving `pt` from `from` to `to`, tapered by
/// `phase`. Cheap enough for per-move ordering heuristics.
pub fn pst_delta(pt: PieceType, color: Color, from: Square, to: Square, phase: i32) -> Score {
    let (from_mg, from_eg) = pst::piece_square(pt, color, from);
    let (to_mg, to_eg) = pst::piece_square(pt, color, to);
    let mg = to_mg - from_mg;
    let eg = to_eg - from_eg;
    (mg * phase + eg * (PHASE_MAX - phase)) / PHASE_MAX
}

const fn build_adjacent_files() -> [Bitboard; 8] {
    let mut masks = [0u64; 8];
    let mut f = 0;
    while f < 8 {
        if f > 0 {
            masks[f] |= 0x0101_0101_0101_0101 << (f - 1);
        }
        if f < 7 {
            masks[f] |= 0x0101_0101_0101_0101 << (f + 1);
        }
        f += 1;
    }
    masks
}

const fn build_passed_masks() -> [[Bitboard; 64]; 2] {
    let mut masks = [[0u64; 64]; 2];
    let mut sq = 0;
    while sq < 64 {
        let file = sq % 8;
        let rank = sq / 8;
        let lo = if file == 0 { 0 } else { file - 1 };
        let hi = if file == 7 { 7 } else { file + 1 };
        let mut f = lo;
        while f <= hi {
            let mut r = rank + 1;
            while r < 8 {
                masks[0][sq] |= 1u64 << (r * 8 + f);
                r += 1;
            }
            let mut r = 0;
            while r < rank {
                masks[1][sq] |= 1u64 << (r * 8 + f);
                r += 1;
            }
            f += 1;
        }
        sq += 1;
    }
    masks
}

static ADJACENT_FILES: [Bitboard; 8] = build_adjacent_files();
static PASSED_MASKS: [[Bitboard; 64]; 2] = build_passed_masks();

/// Evaluates `pos` from the side to move's point of view.
pub fn evaluate(pos: &Position, cache: &PawnCache) -> Score {
    if is_material_draw(pos) {
        return SCORE_DRAW;
    }

    let mut mg = 0;
    let mut eg = 0;

    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        for pt in PieceType::ALL {
            for sq in BitboardIterator::new(pos.pieces(color, pt)) {
                let (p_mg, p_eg) = pst::piece_square(pt, color, sq);
                let material = if pt == PieceType::King { 0 } else { pt.value() };
                mg += sign * (material + p_mg);
                eg += sign * (material + p_eg);
            }
        }
        if pos.pieces(color, PieceType::Bishop).count_ones() >= 2 {
            mg += sign * BISHOP_PAIR;
            eg += sign * BISHOP_PAIR;
        }
    }

    let pawns = pawn_score(pos, cache);
    mg += pawns;
    eg += pawns;

    let phase = game_phase(pos);
    let white_score = (mg * phase + eg * (PHASE_MAX - phase)) / PHASE_MAX;

    let score = match pos.side_to_move() {
        Color::White => white_score,
        Color::Black => -white_score,
    };
    score + TEMPO
}

/// Material signatures the search should treat as dead draws. Currently
/// the classic rook-pawn ending: king and a-/h-pawn against a defending
/// king that already sits in the promotion corner.
fn is_material_draw(pos: &Position) -> bool {
    if pos.occupied().count_ones() != 3 {
        return false;
    }
    for color in [Color::White, Color::Black] {
        let pawns = pos.pieces(color, PieceType::Pawn);
        if pawns.count_ones() != 1 {
            continue;
        }
        let pawn = bitboard::lsb(pawns);
        if pawn.file() != 0 && pawn.file() != 7 {
            return false;
        }
        let promo_rank = if color == Color::White { 7 } else { 0 };
        let defender = pos.king_square(!color);
        return defender.file().abs_diff(pawn.file()) <= 1
            && defender.rank().abs_diff(promo_rank) <= 1;
    }
    false
}

fn pawn_score(pos: &Position, cache: &PawnCache) -> Score {
    let key = pos.pawn_king_hash();
    if let Some(score) = cache.probe(key) {
        return score;
    }
    let score = pawn_structure(pos);
    cache.store(key, score);
    score
}

/// White-relative pawn structure score, independent of side to move so
/// it can be cached on the pawn/king hash alone.
fn pawn_structure(pos: &Position) -> Score {
    let mut score = 0;
    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        let ours = pos.pieces(color, PieceType::Pawn);
        let theirs = pos.pieces(!color, PieceType::Pawn);

        for file in 0..8 {
            let on_file = (ours & file_bb(file)).count_ones() as i32;
            if on_file > 1 {
                score += sign * DOUBLED_PAWN * (on_file - 1);
            }
        }

        for sq in BitboardIterator::new(ours) {
            if ADJACENT_FILES[sq.file()] & ours == 0 {
                score += sign * ISOLATED_PAWN;
            }
            if PASSED_MASKS[color.index()][sq as usize] & theirs == 0 {
                let rel_rank = match color {
                    Color::White => sq.rank(),
                    Color::Black => 7 - sq.rank(),
                };
                score += sign * PASSED_PAWN[rel_rank];
            }
        }
    }
    score
}
