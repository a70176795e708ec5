//! Move ordering.
//!
//! Moves are scored into tiers and consumed best-first through
//! `MoveList::pick_best`: hash move, winning captures by victim value,
//! killers, the counter move, quiets by history, losing captures last.

use crate::eval;
use crate::move_list::MoveList;
use crate::moves::Move;
use crate::piece::PieceType;
use crate::position::Position;
use crate::search::history::{PieceMove, SearchHistory};
use crate::see;

const TT_MOVE_SCORE: i32 = 10_000_000;
const WINNING_CAPTURE_BASE: i32 = 1_000_000;
const KILLER_0_SCORE: i32 = 900_000;
const KILLER_1_SCORE: i32 = 800_000;
const DISTANT_KILLER_SCORE: i32 = 750_000;
const COUNTER_MOVE_SCORE: i32 = 700_000;
const LOSING_CAPTURE_BASE: i32 = -1_000_000;

/// Captures that answer the opponent's last move on the same square
/// sort ahead of equally valued exchanges elsewhere.
const RECAPTURE_BONUS: i32 = 2_000;

/// Weight on the tapered piece-square delta mixed into quiet scores.
/// History dominates once populated; the positional nudge breaks ties
/// early in the search.
const PST_NUDGE_WEIGHT: i32 = 6;

/// Most-valuable-victim, least-valuable-attacker. Victim dominates so a
/// pawn taking a queen sorts above a queen taking a rook.
fn mvv_lva(pos: &Position, mv: Move) -> i32 {
    let victim = if mv.kind() == crate::moves::MoveKind::EnPassant {
        PieceType::Pawn.value()
    } else if mv.is_capture() {
        pos.piece_on(mv.to()).piece_type().value()
    } else {
        // Queen promotion without a capture.
        0
    };
    let attacker = pos.piece_on(mv.from()).piece_type().value();
    victim * 16 - attacker / 10
}

/// Scores a full move list for the main search. `distant_killer` is the
/// primary killer from two plies up, still likely relevant at this ply.
#[allow(clippy::too_many_arguments)]
pub fn score_moves(
    pos: &Position,
    list: &mut MoveList,
    tt_move: Move,
    killers: [Move; 2],
    distant_killer: Move,
    counter: Move,
    history: &SearchHistory,
    prev: Option<PieceMove>,
) {
    let us = pos.side_to_move();
    let phase = eval::game_phase(pos);
    for sm in list.as_mut_slice() {
        let mv = sm.mv;
        sm.value = if mv == tt_move {
            TT_MOVE_SCORE
        } else if mv.is_tactical() {
            let base = if see::see_ge(pos, mv, 0) {
                WINNING_CAPTURE_BASE
            } else {
                LOSING_CAPTURE_BASE
            };
            let recapture = match prev {
                Some(p) if mv.to() == p.to => RECAPTURE_BONUS,
                _ => 0,
            };
            base + mvv_lva(pos, mv) + recapture
        } else if mv == killers[0] {
            KILLER_0_SCORE
        } else if mv == killers[1] {
            KILLER_1_SCORE
        } else if mv == distant_killer {
            DISTANT_KILLER_SCORE
        } else if mv == counter {
            COUNTER_MOVE_SCORE
        } else {
            let piece = pos.piece_on(mv.from());
            let nudge = PST_NUDGE_WEIGHT
                * eval::pst_delta(piece.piece_type(), us, mv.from(), mv.to(), phase);
            history.quiet_score(us, prev, piece, mv) + nudge
        };
    }
}

/// Scores a captures-only list for quiescence: hash move first, then pure
/// MVV-LVA. SEE filtering happens in the quiescence loop itself.
pub fn score_captures(pos: &Position, list: &mut MoveList, tt_move: Move) {
    for sm in list.as_mut_slice() {
        sm.value = if sm.mv == tt_move {
            TT_MOVE_SCORE
        } else {
            mvv_lva(pos, sm.mv)
        };
    }
}
