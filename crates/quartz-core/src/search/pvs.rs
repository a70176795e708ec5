//! Principal variation search with quiescence.
//!
//! Fail-soft negamax over copy-make positions. The first move at a PV
//! node gets the full window; every later move is probed with a null
//! window, reduced when late and quiet, and re-searched on a fail high.
//! Pruning decisions are factored into named predicates so each bears
//! its own preconditions.

use arrayvec::ArrayVec;
use std::sync::OnceLock;

use crate::constants::{
    MAX_PLY, SCORE_DRAW, SCORE_INF, SCORE_MATE_IN_MAX_PLY, SCORE_NONE,
};
use crate::eval;
use crate::move_list::MoveList;
use crate::movegen;
use crate::moves::Move;
use crate::piece::Piece;
use crate::position::Position;
use crate::search::history::{PieceMove, stat_bonus};
use crate::search::node_type::{NodeType, NonPV, PV};
use crate::search::ordering;
use crate::search::search_context::SearchContext;
use crate::see;
use crate::transposition_table::Bound;
use crate::types::{Depth, Score, is_mate_score, mate_in, mated_in, score_from_tt, score_to_tt};

const RAZOR_MARGIN_PER_DEPTH: Score = 200;
const RAZOR_MAX_DEPTH: Depth = 3;

const STATIC_NULL_MARGIN_PER_DEPTH: Score = 80;
const STATIC_NULL_IMPROVING_BONUS: Score = 40;
const STATIC_NULL_MAX_DEPTH: Depth = 6;

const NULL_MOVE_MIN_DEPTH: Depth = 3;

const PROBCUT_MIN_DEPTH: Depth = 5;
const PROBCUT_MARGIN: Score = 150;

const SINGULAR_MIN_DEPTH: Depth = 8;

const FUTILITY_MAX_DEPTH: Depth = 6;
const FUTILITY_BASE: Score = 100;
const FUTILITY_PER_DEPTH: Score = 150;

const QS_DELTA_MARGIN: Score = 200;

fn lmr_reduction(depth: Depth, move_count: usize) -> Depth {
    static TABLE: OnceLock<Box<[[u8; 64]; 64]>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut t = Box::new([[0u8; 64]; 64]);
        for d in 1..64 {
            for m in 1..64 {
                let r = 0.5 + (d as f64).ln() * (m as f64).ln() / 2.4;
                t[d][m] = r as u8;
            }
        }
        t
    });
    table[depth.clamp(0, 63) as usize][move_count.min(63)] as Depth
}

/// Razoring: hopeless positions near the horizon drop straight into
/// quiescence instead of expanding the full move list.
fn razoring_applies(depth: Depth, static_eval: Score, alpha: Score) -> bool {
    depth <= RAZOR_MAX_DEPTH
        && static_eval != SCORE_NONE
        && static_eval + RAZOR_MARGIN_PER_DEPTH * depth < alpha
        && !is_mate_score(alpha)
}

/// Static null move (reverse futility): a position so far above beta
/// that giving the opponent a free tempo still fails high.
fn static_null_move(depth: Depth, static_eval: Score, beta: Score, improving: bool) -> Option<Score> {
    if depth <= STATIC_NULL_MAX_DEPTH
        && static_eval != SCORE_NONE
        && !is_mate_score(beta)
        && static_eval
            - STATIC_NULL_MARGIN_PER_DEPTH * depth
            + if improving { STATIC_NULL_IMPROVING_BONUS } else { 0 }
            >= beta
    {
        Some(static_eval)
    } else {
        None
    }
}

/// Null move pruning preconditions. Requires non-pawn material for the
/// side to move; in pawn endings zugzwang makes the free tempo wrong.
fn null_move_applies(
    pos: &Position,
    ctx: &SearchContext,
    ply: usize,
    depth: Depth,
    static_eval: Score,
    beta: Score,
) -> bool {
    depth >= NULL_MOVE_MIN_DEPTH
        && static_eval != SCORE_NONE
        && static_eval >= beta
        && !is_mate_score(beta)
        && pos.has_non_pawn_material(pos.side_to_move())
        && (ply == 0 || ctx.stack(ply - 1).current_move.is_some())
}

pub fn search<NT: NodeType>(
    ctx: &mut SearchContext,
    pos: &Position,
    ply: usize,
    mut depth: Depth,
    mut alpha: Score,
    mut beta: Score,
    cut_node: bool,
) -> Score {
    if depth <= 0 {
        return qsearch::<NT>(ctx, pos, ply, alpha, beta);
    }
    if ctx.should_abort() {
        return SCORE_DRAW;
    }
    if NT::PV_NODE {
        ctx.clear_pv(ply);
    }

    // Draws by rule. The root is never scored here.
    if ply > 0 {
        if pos.halfmove_clock() >= 100
            || pos.is_insufficient_material()
            || ctx.is_repetition(pos.hash(), pos.halfmove_clock())
        {
            return SCORE_DRAW;
        }
        if ply >= MAX_PLY - 1 {
            return eval::evaluate(pos, &ctx.pawn_cache);
        }

        // Mate distance pruning: even a forced mate from here cannot
        // improve on a shorter mate already found.
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(mate_in(ply + 1));
        if alpha >= beta {
            return alpha;
        }
    }

    let excluded = ctx.stack(ply).excluded_move;
    let tt_entry = if excluded.is_some() {
        None
    } else {
        ctx.tt.probe(pos.hash())
    };

    let mut tt_move = Move::NONE;
    if let Some(data) = tt_entry {
        if movegen::is_pseudo_legal(pos, data.mv) {
            tt_move = data.mv;
        }
        let tt_score = score_from_tt(data.score, ply);
        if !NT::PV_NODE
            && data.depth >= depth
            && tt_score != SCORE_NONE
            && data.should_cut(beta)
            && pos.halfmove_clock() < 90
        {
            return tt_score;
        }
    }

    let in_check = pos.in_check();

    let static_eval = if in_check {
        SCORE_NONE
    } else {
        match tt_entry {
            Some(data) if data.eval != SCORE_NONE => data.eval,
            _ => eval::evaluate(pos, &ctx.pawn_cache),
        }
    };
    ctx.stack_mut(ply).static_eval = static_eval;

    let improving = !in_check
        && ply >= 2
        && ctx.stack(ply - 2).static_eval != SCORE_NONE
        && static_eval > ctx.stack(ply - 2).static_eval;

    // Whole-node pruning. Only speculative at non-PV nodes, never while
    // in check, and never inside a singular verification search.
    if !NT::PV_NODE && !in_check && excluded.is_none() && ply > 0 {
        if razoring_applies(depth, static_eval, alpha) {
            let score = qsearch::<NonPV>(ctx, pos, ply, alpha, alpha + 1);
            if score < alpha {
                return score;
            }
        }

        if let Some(score) = static_null_move(depth, static_eval, beta, improving) {
            return score;
        }

        if null_move_applies(pos, ctx, ply, depth, static_eval, beta) {
            let r = 3 + depth / 4;
            let mut child = *pos;
            child.apply_null_move();
            ctx.update(ply, pos.hash(), Move::NONE, Piece::None);
            let score = -search::<NonPV>(
                ctx,
                &child,
                ply + 1,
                depth - 1 - r,
                -beta,
                -beta + 1,
                !cut_node,
            );
            ctx.undo(ply);
            if score >= beta {
                // Do not trust unproven mates from a null search.
                return if is_mate_score(score) { beta } else { score };
            }
        }

        if let Some(score) = probcut(ctx, pos, ply, depth, beta, static_eval, tt_move) {
            return score;
        }
    }

    // Without a hash move a deep search mostly rediscovers ordering;
    // shrink and let the re-visit come back with one.
    if depth >= 4 && tt_move == Move::NONE && (NT::PV_NODE || cut_node) {
        depth -= 1;
    }

    let prev = previous_move(ctx, ply);
    let killers = ctx.history.killers(ply);
    let distant_killer = if ply >= 2 { ctx.history.killers(ply - 2)[0] } else { Move::NONE };
    let counter = ctx.history.counter_move(prev);

    let mut list = MoveList::new();
    movegen::generate_moves(pos, &mut list);
    ordering::score_moves(
        pos,
        &mut list,
        tt_move,
        killers,
        distant_killer,
        counter,
        &ctx.history,
        prev,
    );

    ctx.stack_mut(ply + 1).excluded_move = Move::NONE;

    let mut best_score = -SCORE_INF;
    let mut best_move = Move::NONE;
    let mut move_count = 0usize;
    let mut quiets_tried: ArrayVec<(Piece, Move), 64> = ArrayVec::new();
    let mut cursor = 0;

    while let Some(sm) = list.pick_best(cursor) {
        cursor += 1;
        let mv = sm.mv;
        if mv == excluded {
            continue;
        }

        let piece = pos.piece_on(mv.from());
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }
        move_count += 1;
        let gives_check = child.in_check();
        let is_quiet = !mv.is_tactical();

        // Shallow move-level pruning, once one legal move is banked.
        if !NT::PV_NODE && best_score > -SCORE_MATE_IN_MAX_PLY && !in_check && !gives_check {
            if is_quiet
                && depth <= 4
                && move_count > (3 + depth * depth) as usize
            {
                continue;
            }
            if is_quiet
                && depth <= FUTILITY_MAX_DEPTH
                && static_eval != SCORE_NONE
                && static_eval + FUTILITY_BASE + FUTILITY_PER_DEPTH * depth <= alpha
            {
                continue;
            }
            if depth <= 8 {
                let threshold = if is_quiet { -50 * depth } else { -100 * depth };
                if !see::see_ge(pos, mv, threshold) {
                    continue;
                }
            }
        }

        let extension = extension_for(ctx, pos, ply, depth, mv, tt_move, tt_entry, gives_check, beta);
        let new_depth = depth - 1 + extension;

        ctx.tt.prefetch(child.hash());
        ctx.update(ply, pos.hash(), mv, piece);

        let mut score;
        if move_count == 1 {
            score = if NT::PV_NODE {
                -search::<PV>(ctx, &child, ply + 1, new_depth, -beta, -alpha, false)
            } else {
                -search::<NonPV>(ctx, &child, ply + 1, new_depth, -beta, -alpha, !cut_node)
            };
        } else {
            // Late move reduction, then the re-search ladder.
            let mut r = 0;
            if depth >= 3 && move_count > 3 && is_quiet && !in_check && !gives_check {
                r = lmr_reduction(depth, move_count);
                if !improving {
                    r += 1;
                }
                if cut_node {
                    r += 1;
                }
                if NT::PV_NODE {
                    r -= 1;
                }
                r = r.clamp(0, new_depth - 1);
            }

            score = -search::<NonPV>(
                ctx,
                &child,
                ply + 1,
                new_depth - r,
                -alpha - 1,
                -alpha,
                true,
            );
            if score > alpha && r > 0 {
                score = -search::<NonPV>(
                    ctx,
                    &child,
                    ply + 1,
                    new_depth,
                    -alpha - 1,
                    -alpha,
                    !cut_node,
                );
            }
            if NT::PV_NODE && score > alpha && score < beta {
                score = -search::<PV>(ctx, &child, ply + 1, new_depth, -beta, -alpha, false);
            }
        }

        ctx.undo(ply);

        if ctx.time.is_aborted() {
            return SCORE_DRAW;
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                best_move = mv;
                if NT::PV_NODE {
                    ctx.update_pv(ply, mv);
                }
                if score >= beta {
                    break;
                }
                alpha = score;
            }
        }

        if is_quiet && !quiets_tried.is_full() {
            quiets_tried.push((piece, mv));
        }
    }

    if move_count == 0 {
        // All moves illegal (or excluded): mated, stalemated, or a
        // singular verification with nothing else to try.
        return if excluded.is_some() {
            alpha
        } else if in_check {
            mated_in(ply)
        } else {
            SCORE_DRAW
        };
    }

    if best_score >= beta && best_move.is_some() && !best_move.is_tactical() {
        let bonus = stat_bonus(depth);
        ctx.history.update_killers(ply, best_move);
        ctx.history.update_counter_move(prev, best_move);
        let cutoff_piece = pos.piece_on(best_move.from());
        ctx.history.update_quiet_stats(
            pos.side_to_move(),
            prev,
            (cutoff_piece, best_move),
            quiets_tried.as_slice(),
            bonus,
        );
    }

    if excluded.is_none() {
        let bound = if best_score >= beta {
            Bound::Lower
        } else if NT::PV_NODE && best_move.is_some() {
            Bound::Exact
        } else {
            Bound::Upper
        };
        ctx.tt.store(
            pos.hash(),
            best_move,
            score_to_tt(best_score, ply),
            static_eval,
            depth,
            bound,
            NT::PV_NODE,
            in_check,
        );
    }

    best_score
}

fn previous_move(ctx: &SearchContext, ply: usize) -> Option<PieceMove> {
    if ply == 0 {
        return None;
    }
    let record = ctx.stack(ply - 1);
    if record.current_move.is_some() {
        Some(PieceMove {
            piece: record.moved_piece,
            to: record.current_move.to(),
        })
    } else {
        None
    }
}

/// Probcut: when a shallow search already beats beta by a safety
/// margin, a tactical refutation almost certainly exists at full depth.
fn probcut(
    ctx: &mut SearchContext,
    pos: &Position,
    ply: usize,
    depth: Depth,
    beta: Score,
    static_eval: Score,
    tt_move: Move,
) -> Option<Score> {
    if depth < PROBCUT_MIN_DEPTH || is_mate_score(beta) || static_eval == SCORE_NONE {
        return None;
    }
    let rbeta = beta + PROBCUT_MARGIN;

    let mut list = MoveList::new();
    movegen::generate_captures(pos, &mut list);
    ordering::score_captures(pos, &mut list, tt_move);

    let mut cursor = 0;
    while let Some(sm) = list.pick_best(cursor) {
        cursor += 1;
        let mv = sm.mv;
        // Only captures that could plausibly recover the margin.
        if !see::see_ge(pos, mv, rbeta - static_eval) {
            continue;
        }
        let piece = pos.piece_on(mv.from());
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }
        ctx.update(ply, pos.hash(), mv, piece);
        let mut score = -qsearch::<NonPV>(ctx, &child, ply + 1, -rbeta, -rbeta + 1);
        if score >= rbeta {
            score = -search::<NonPV>(
                ctx,
                &child,
                ply + 1,
                depth - 4,
                -rbeta,
                -rbeta + 1,
                false,
            );
        }
        ctx.undo(ply);
        if ctx.time.is_aborted() {
            return Some(SCORE_DRAW);
        }
        if score >= rbeta {
            return Some(score);
        }
    }
    None
}

/// Search extensions: checks, singular hash moves, recaptures, and
/// castling, capped at one ply total.
#[allow(clippy::too_many_arguments)]
fn extension_for(
    ctx: &mut SearchContext,
    pos: &Position,
    ply: usize,
    depth: Depth,
    mv: Move,
    tt_move: Move,
    tt_entry: Option<crate::transposition_table::TTData>,
    gives_check: bool,
    beta: Score,
) -> Depth {
    if gives_check {
        return 1;
    }

    // Singular extension: the hash move alone beats a lowered bound,
    // so the node hangs on this one move and deserves extra depth.
    if depth >= SINGULAR_MIN_DEPTH
        && mv == tt_move
        && ply > 0
        && ctx.stack(ply).excluded_move == Move::NONE
        && !is_mate_score(beta)
    {
        if let Some(data) = tt_entry {
            let tt_score = score_from_tt(data.score, ply);
            if data.depth >= depth - 3
                && data.bound != Bound::Upper
                && !is_mate_score(tt_score)
            {
                let singular_beta = tt_score - 2 * depth;
                ctx.stack_mut(ply).excluded_move = mv;
                let score = search::<NonPV>(
                    ctx,
                    pos,
                    ply,
                    (depth - 1) / 2,
                    singular_beta - 1,
                    singular_beta,
                    true,
                );
                ctx.stack_mut(ply).excluded_move = Move::NONE;
                if score < singular_beta {
                    return 1;
                }
            }
        }
    }

    if mv.is_castle() {
        return 1;
    }

    // Recapture on the square that was just captured on.
    if ply > 0 && mv.is_capture() {
        let last = ctx.stack(ply - 1).current_move;
        if last.is_some() && last.is_capture() && last.to() == mv.to() {
            return 1;
        }
    }

    0
}

pub fn qsearch<NT: NodeType>(
    ctx: &mut SearchContext,
    pos: &Position,
    ply: usize,
    mut alpha: Score,
    beta: Score,
) -> Score {
    if ctx.should_abort() {
        return SCORE_DRAW;
    }
    if NT::PV_NODE {
        ctx.clear_pv(ply);
    }

    if pos.halfmove_clock() >= 100
        || pos.is_insufficient_material()
        || ctx.is_repetition(pos.hash(), pos.halfmove_clock())
    {
        return SCORE_DRAW;
    }
    if ply >= MAX_PLY - 1 {
        return eval::evaluate(pos, &ctx.pawn_cache);
    }

    let tt_entry = ctx.tt.probe(pos.hash());
    let mut tt_move = Move::NONE;
    if let Some(data) = tt_entry {
        if movegen::is_pseudo_legal(pos, data.mv) {
            tt_move = data.mv;
        }
        let tt_score = score_from_tt(data.score, ply);
        if !NT::PV_NODE && tt_score != SCORE_NONE && data.should_cut(beta) {
            return tt_score;
        }
    }

    let in_check = pos.in_check();

    let mut best_score = -SCORE_INF;
    let static_eval = if in_check {
        SCORE_NONE
    } else {
        let eval = match tt_entry {
            Some(data) if data.eval != SCORE_NONE => data.eval,
            _ => eval::evaluate(pos, &ctx.pawn_cache),
        };
        // Stand pat: the side to move may decline all captures.
        if eval >= beta {
            return eval;
        }
        if eval > alpha {
            alpha = eval;
        }
        best_score = eval;
        eval
    };

    let mut list = MoveList::new();
    if in_check {
        // Evasions: every legal move, tactical or not.
        movegen::generate_moves(pos, &mut list);
    } else {
        movegen::generate_captures(pos, &mut list);
    }
    ordering::score_captures(pos, &mut list, tt_move);

    let mut best_move = Move::NONE;
    let mut move_count = 0usize;
    let mut cursor = 0;

    while let Some(sm) = list.pick_best(cursor) {
        cursor += 1;
        let mv = sm.mv;

        if !in_check {
            // Delta pruning: even winning this victim outright cannot
            // lift the score back to alpha.
            if static_eval != SCORE_NONE && mv.is_capture() {
                let victim = if mv.kind() == crate::moves::MoveKind::EnPassant {
                    crate::piece::PieceType::Pawn.value()
                } else {
                    pos.piece_on(mv.to()).piece_type().value()
                };
                if static_eval + victim + QS_DELTA_MARGIN <= alpha && !mv.is_promotion() {
                    continue;
                }
            }
            // Losing exchanges do not rescue a position at the horizon.
            if !see::see_ge(pos, mv, 0) {
                continue;
            }
        }

        let piece = pos.piece_on(mv.from());
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }
        move_count += 1;

        ctx.update(ply, pos.hash(), mv, piece);
        let score = -qsearch::<NT>(ctx, &child, ply + 1, -beta, -alpha);
        ctx.undo(ply);

        if ctx.time.is_aborted() {
            return SCORE_DRAW;
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                best_move = mv;
                if NT::PV_NODE {
                    ctx.update_pv(ply, mv);
                }
                if score >= beta {
                    break;
                }
                alpha = score;
            }
        }
    }

    if in_check && move_count == 0 {
        return mated_in(ply);
    }

    let bound = if best_score >= beta {
        Bound::Lower
    } else {
        Bound::Upper
    };
    // Quiescence entries take depth 0, below any main search store.
    ctx.tt.store(
        pos.hash(),
        best_move,
        score_to_tt(best_score, ply),
        static_eval,
        0,
        bound,
        NT::PV_NODE,
        in_check,
    );

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::PawnCache;
    use crate::search::time_control::{TimeControlMode, TimeManager};
    use crate::transposition_table::TranspositionTable;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn context(pos: &Position) -> SearchContext {
        let abort = Arc::new(AtomicBool::new(false));
        SearchContext::new(
            pos,
            Vec::new(),
            Arc::new(TranspositionTable::new(1)),
            Arc::new(PawnCache::new(8)),
            Arc::new(TimeManager::new(TimeControlMode::Infinite, abort, pos.game_ply())),
        )
    }

    fn search_pv(pos: &Position, depth: Depth) -> (Score, Vec<Move>) {
        let mut ctx = context(pos);
        let score = search::<PV>(&mut ctx, pos, 0, depth, -SCORE_INF, SCORE_INF, false);
        (score, ctx.pv_line(0))
    }

    #[test]
    fn test_finds_mate_in_one() {
        let pos: Position = "6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1".parse().unwrap();
        let (score, pv) = search_pv(&pos, 4);
        assert_eq!(score, mate_in(1));
        assert_eq!(pv[0].to(), crate::square::Square::E8);
    }

    #[test]
    fn test_mated_position_scores_mated() {
        // Back-rank mate already delivered; black to move has no escape.
        let pos: Position = "R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1".parse().unwrap();
        let (score, _) = search_pv(&pos, 2);
        assert_eq!(score, mated_in(0));
    }

    #[test]
    fn test_stalemate_scores_draw() {
        let pos: Position = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let (score, _) = search_pv(&pos, 3);
        assert_eq!(score, SCORE_DRAW);
    }

    #[test]
    fn test_qsearch_resolves_hanging_queen() {
        // White to move wins the undefended queen on d5, landing in a
        // pawn-up king endgame rather than sitting a queen down.
        let pos: Position = "k7/8/8/3q4/4P3/8/8/K7 w - - 0 1".parse().unwrap();
        let mut ctx = context(&pos);
        let score = qsearch::<PV>(&mut ctx, &pos, 0, -SCORE_INF, SCORE_INF);
        assert!(score > 50);
        assert!(score < 500);
    }

    #[test]
    fn test_null_window_fail_soft() {
        let pos = Position::startpos();
        let mut ctx = context(&pos);
        // A null window far below the real score must fail high.
        let score = search::<NonPV>(&mut ctx, &pos, 0, 3, -500, -499, false);
        assert!(score >= -499);
        // And far above it must fail low.
        let mut ctx = context(&pos);
        let score = search::<NonPV>(&mut ctx, &pos, 0, 3, 499, 500, false);
        assert!(score <= 499);
    }

    #[test]
    fn test_deeper_search_not_worse_at_forced_win() {
        // KQ vs K: any reasonable depth sees a decisive advantage.
        let pos: Position = "4k3/8/8/8/8/8/8/Q3K3 w - - 0 1".parse().unwrap();
        let (shallow, _) = search_pv(&pos, 2);
        let (deep, _) = search_pv(&pos, 6);
        assert!(shallow > 700);
        assert!(deep > 700);
    }

    #[test]
    fn test_repetition_scored_as_draw() {
        // Perpetual-check shuffle: with only kings and queens shuffling,
        // search must not claim progress forever.
        let pos: Position = "4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let (score, _) = search_pv(&pos, 5);
        assert_eq!(score, SCORE_DRAW);
    }

    #[test]
    fn test_lmr_table_monotonic() {
        assert!(lmr_reduction(20, 40) >= lmr_reduction(3, 4));
        assert_eq!(lmr_reduction(1, 1), 0);
    }
}
