//! Iterative deepening driver.
//!
//! Runs the root move loop depth by depth, narrowing each iteration
//! with an aspiration window centered on the running average score.
//! Helper threads follow a staggered depth schedule so the pool does
//! not burn every core on the same iteration.

use std::cmp::Reverse;

use crate::constants::{MAX_PLY, SCORE_DRAW, SCORE_INF};
use crate::moves::Move;
use crate::position::Position;
use crate::search::node_type::{NonPV, PV};
use crate::search::pvs;
use crate::search::search_context::SearchContext;
use crate::search::search_result::{SearchProgress, SearchResult};
use crate::search::time_control::{SearchDifficulty, TimeControlMode};
use crate::types::{Depth, Score, mated_in};

const ASPIRATION_MIN_DEPTH: Depth = 4;
const INITIAL_ASPIRATION_DELTA: Score = 16;

/// Depth of the pre-search difficulty scout.
const SCOUT_DEPTH: Depth = 4;

/// Score gap at scout depth that marks one move as clearly best.
const EASY_MOVE_MARGIN: Score = 200;

/// Depth skip schedule for helper threads, indexed by
/// `(thread_idx - 1) % 20`. Half the helpers sit one iteration ahead of
/// the main thread at any point, seeding the shared table.
const SKIP_SIZE: [Depth; 20] = [1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4];
const SKIP_PHASE: [Depth; 20] = [0, 1, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 0, 1, 2, 3, 4, 5, 6, 7];

fn helper_skips_depth(thread_idx: usize, root_depth: Depth, game_ply: usize) -> bool {
    if thread_idx == 0 {
        return false;
    }
    let i = (thread_idx - 1) % SKIP_SIZE.len();
    ((root_depth + game_ply as Depth + SKIP_PHASE[i]) / SKIP_SIZE[i]) % 2 != 0
}

/// Searches `pos` to increasing depths until a limit fires, returning
/// the outcome of the last fully completed iteration.
pub fn iterative_deepening(ctx: &mut SearchContext, pos: &Position) -> SearchResult {
    if ctx.root_moves_count() == 0 {
        let score = if pos.in_check() {
            mated_in(0)
        } else {
            SCORE_DRAW
        };
        return SearchResult {
            score,
            best_move: None,
            n_nodes: ctx.n_nodes,
            pv_line: Vec::new(),
            depth: 0,
        };
    }

    let multi_pv = ctx.multi_pv.min(ctx.root_moves_count());
    let max_depth = ctx.depth_limit.unwrap_or(MAX_PLY as Depth - 1);
    let is_main = ctx.thread_idx == 0;

    let mut result = SearchResult {
        score: -SCORE_INF,
        best_move: None,
        n_nodes: 0,
        pv_line: Vec::new(),
        depth: 0,
    };
    let mut last_best_move = Move::NONE;
    let mut root_depth: Depth = 0;

    // On a running clock, a cheap scout can free up time for the rest
    // of the game before the real deepening starts.
    if is_main && matches!(ctx.time.mode(), TimeControlMode::Clock { .. }) {
        let difficulty = scout_difficulty(ctx, pos);
        ctx.time.set_difficulty(difficulty);
    }

    while root_depth < max_depth && !ctx.time.is_aborted() {
        root_depth += 1;
        if helper_skips_depth(ctx.thread_idx, root_depth, ctx.root_game_ply) {
            continue;
        }

        ctx.reset_root_move_searched();
        ctx.root_moves
            .sort_by_key(|rm| Reverse(rm.previous_score));

        for pv_idx in 0..multi_pv {
            aspiration_search(ctx, pos, root_depth);
            if ctx.time.is_aborted() {
                break;
            }

            let best = match ctx.get_best_root_move(true) {
                Some(rm) => rm,
                None => break,
            };
            ctx.mark_root_move_searched(best.mv);

            if is_main {
                ctx.notify_progress(SearchProgress {
                    depth: root_depth,
                    sel_depth: ctx.sel_depth,
                    multipv_index: pv_idx,
                    score: best.score,
                    pv_line: best.pv.clone(),
                    n_nodes: ctx.n_nodes,
                    elapsed_ms: ctx.time.elapsed_ms(),
                    hashfull: ctx.tt.hashfull(),
                });
            }
        }

        if ctx.time.is_aborted() {
            break;
        }
        ctx.completed_depth = root_depth;

        if let Some(best) = ctx.get_best_root_move(false) {
            result = SearchResult {
                score: best.score,
                best_move: Some(best.mv),
                n_nodes: ctx.n_nodes,
                pv_line: best.pv.clone(),
                depth: root_depth,
            };

            if is_main {
                let pv_changed = last_best_move.is_some() && best.mv != last_best_move;
                ctx.time.try_extend_time(best.score, pv_changed, root_depth);
                last_best_move = best.mv;
                if !ctx.time.should_continue_iteration() {
                    ctx.time.signal_abort();
                    break;
                }
            }
        }

        #[cfg(feature = "cluster")]
        if is_main {
            if let Some(cluster) = ctx.cluster.clone() {
                cluster.sync_tt(&ctx.tt);
                if cluster.stop_requested() {
                    ctx.time.signal_abort();
                    break;
                }
            }
        }
    }

    #[cfg(feature = "cluster")]
    if is_main {
        if let Some(cluster) = &ctx.cluster {
            if cluster.is_main_rank() {
                cluster.request_stop();
            }
            cluster.finish();
        }
    }

    result.n_nodes = ctx.n_nodes;
    if result.best_move.is_none() {
        // Aborted before any iteration finished: fall back to whatever
        // root ordering put first so a move is always produced.
        if let Some(rm) = ctx.get_best_root_move(false) {
            result.best_move = Some(rm.mv);
            result.pv_line = rm.pv.clone();
        }
    }
    result
}

/// Looks at the root before deepening starts: a single legal move is
/// forced, and a move whose shallow full-width score clears every
/// alternative by [`EASY_MOVE_MARGIN`] is easy. The two wide-window
/// passes also leave every root move seeded with a real score.
fn scout_difficulty(ctx: &mut SearchContext, pos: &Position) -> SearchDifficulty {
    if ctx.root_moves_count() == 1 {
        return SearchDifficulty::Forced;
    }

    let best_score = root_search(ctx, pos, SCOUT_DEPTH, -SCORE_INF, SCORE_INF);
    let best_mv = match ctx.get_best_root_move(true) {
        Some(rm) => rm.mv,
        None => return SearchDifficulty::Normal,
    };
    ctx.mark_root_move_searched(best_mv);
    let runner_up = root_search(ctx, pos, SCOUT_DEPTH, -SCORE_INF, SCORE_INF);

    if ctx.time.is_aborted() || best_score <= -SCORE_INF || runner_up <= -SCORE_INF {
        return SearchDifficulty::Normal;
    }
    if best_score - runner_up >= EASY_MOVE_MARGIN {
        SearchDifficulty::Easy
    } else {
        SearchDifficulty::Normal
    }
}

/// Runs one root iteration inside a widening window. Fail lows pull
/// beta toward the midpoint, fail highs pull alpha, and delta grows by
/// half on every re-search.
fn aspiration_search(ctx: &mut SearchContext, pos: &Position, root_depth: Depth) {
    let mut delta = INITIAL_ASPIRATION_DELTA;
    // Root moves are sorted by the previous iteration's ranking, so the
    // first unsearched one is this line's candidate.
    let prev = ctx
        .root_moves
        .iter()
        .find(|rm| !rm.searched)
        .map(|rm| rm.average_score)
        .unwrap_or(-SCORE_INF);

    let (mut alpha, mut beta) = if root_depth >= ASPIRATION_MIN_DEPTH && prev != -SCORE_INF {
        (
            (prev - delta).max(-SCORE_INF),
            (prev + delta).min(SCORE_INF),
        )
    } else {
        (-SCORE_INF, SCORE_INF)
    };

    loop {
        let best = root_search(ctx, pos, root_depth, alpha, beta);
        if ctx.time.is_aborted() {
            return;
        }
        if best <= alpha {
            beta = (alpha + beta) / 2;
            alpha = (best - delta).max(-SCORE_INF);
        } else if best >= beta {
            alpha = (alpha + beta) / 2;
            beta = (best + delta).min(SCORE_INF);
        } else {
            return;
        }
        delta += delta / 2;
    }
}

/// The root move loop. Only moves not claimed by an earlier multi-PV
/// line take part; the first gets the full window, the rest a null
/// window with a PV re-search on improvement.
fn root_search(
    ctx: &mut SearchContext,
    pos: &Position,
    depth: Depth,
    alpha: Score,
    beta: Score,
) -> Score {
    let moves: Vec<Move> = ctx
        .root_moves
        .iter()
        .filter(|rm| !rm.searched)
        .map(|rm| rm.mv)
        .collect();

    let mut best_score = -SCORE_INF;
    let mut alpha = alpha;
    let mut move_count = 0usize;

    for mv in moves {
        move_count += 1;
        let piece = pos.piece_on(mv.from());
        let mut child = *pos;
        if !child.apply_move(mv) {
            continue;
        }

        ctx.tt.prefetch(child.hash());
        ctx.update(0, pos.hash(), mv, piece);

        let mut score;
        if move_count == 1 {
            score = -pvs::search::<PV>(ctx, &child, 1, depth - 1, -beta, -alpha, false);
        } else {
            score = -pvs::search::<NonPV>(ctx, &child, 1, depth - 1, -alpha - 1, -alpha, true);
            if score > alpha && score < beta {
                score = -pvs::search::<PV>(ctx, &child, 1, depth - 1, -beta, -alpha, false);
            }
        }

        ctx.undo(0);

        if ctx.time.is_aborted() {
            return best_score;
        }

        ctx.update_root_move(mv, score, move_count, alpha);

        if score > best_score {
            best_score = score;
            if score > alpha {
                if score >= beta {
                    break;
                }
                alpha = score;
            }
        }
    }

    // Re-rank so the next window and the next multi-PV line see the
    // freshest scores first.
    ctx.root_moves.sort_by_key(|rm| Reverse(rm.score));

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::PawnCache;
    use crate::search::time_control::{TimeControlMode, TimeManager};
    use crate::square::Square;
    use crate::transposition_table::TranspositionTable;
    use crate::types::mate_in;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn context(pos: &Position, depth: Depth) -> SearchContext {
        let abort = Arc::new(AtomicBool::new(false));
        let mut time = TimeManager::new(TimeControlMode::Infinite, abort, pos.game_ply());
        time.start();
        let mut ctx = SearchContext::new(
            pos,
            Vec::new(),
            Arc::new(TranspositionTable::new(4)),
            Arc::new(PawnCache::new(10)),
            Arc::new(time),
        );
        ctx.depth_limit = Some(depth);
        ctx
    }

    #[test]
    fn test_mate_in_one_found() {
        let pos: Position = "6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1".parse().unwrap();
        let mut ctx = context(&pos, 5);
        let result = iterative_deepening(&mut ctx, &pos);
        assert_eq!(result.score, mate_in(1));
        let best = result.best_move.unwrap();
        assert_eq!(best.from(), Square::E1);
        assert_eq!(best.to(), Square::E8);
    }

    #[test]
    fn test_checkmated_root_has_no_move() {
        let pos: Position = "R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1".parse().unwrap();
        let mut ctx = context(&pos, 3);
        let result = iterative_deepening(&mut ctx, &pos);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, mated_in(0));
    }

    #[test]
    fn test_stalemate_root_scores_draw() {
        let pos: Position = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let mut ctx = context(&pos, 3);
        let result = iterative_deepening(&mut ctx, &pos);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, SCORE_DRAW);
    }

    #[test]
    fn test_depth_limit_respected() {
        let pos = Position::startpos();
        let mut ctx = context(&pos, 4);
        let result = iterative_deepening(&mut ctx, &pos);
        assert_eq!(result.depth, 4);
        assert!(result.best_move.is_some());
        assert_eq!(result.pv_line[0], result.best_move.unwrap());
    }

    #[test]
    fn test_multi_pv_reports_distinct_lines() {
        use std::sync::Mutex;

        let pos = Position::startpos();
        let mut ctx = context(&pos, 3);
        ctx.multi_pv = 3;
        let lines: Arc<Mutex<Vec<Move>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        ctx.callback = Some(Arc::new(move |p: SearchProgress| {
            sink.lock().unwrap().push(p.pv_line[0]);
        }));
        iterative_deepening(&mut ctx, &pos);

        let lines = lines.lock().unwrap();
        // The last iteration reported three different first moves.
        let last: Vec<Move> = lines[lines.len() - 3..].to_vec();
        assert_eq!(last.len(), 3);
        assert!(last[0] != last[1] && last[1] != last[2] && last[0] != last[2]);
    }

    #[test]
    fn test_scout_detects_forced_move() {
        // Black is in check with a single legal reply.
        let pos: Position = "k6R/8/2K5/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let mut ctx = context(&pos, 5);
        assert_eq!(scout_difficulty(&mut ctx, &pos), SearchDifficulty::Forced);
    }

    #[test]
    fn test_scout_flags_clear_best_move() {
        // Taking the hanging queen dwarfs every alternative.
        let pos: Position = "k7/8/8/3q4/4P3/8/8/K6R w - - 0 1".parse().unwrap();
        let mut ctx = context(&pos, 8);
        assert_eq!(scout_difficulty(&mut ctx, &pos), SearchDifficulty::Easy);
    }

    #[test]
    fn test_scout_keeps_open_positions_normal() {
        let pos = Position::startpos();
        let mut ctx = context(&pos, 8);
        assert_eq!(scout_difficulty(&mut ctx, &pos), SearchDifficulty::Normal);
    }

    #[test]
    fn test_helper_skip_schedule() {
        // The main thread never skips.
        for d in 1..30 {
            assert!(!helper_skips_depth(0, d, 0));
        }
        // Helper threads skip alternating bands of depths.
        let skipped: Vec<Depth> = (1..10)
            .filter(|&d| helper_skips_depth(1, d, 0))
            .collect();
        assert!(!skipped.is_empty());
        assert!(skipped.len() < 9);
    }

    #[test]
    fn test_node_limit_aborts() {
        let pos = Position::startpos();
        let mut ctx = context(&pos, 30);
        ctx.node_limit = Some(5_000);
        let result = iterative_deepening(&mut ctx, &pos);
        assert!(result.best_move.is_some());
        // Polling granularity allows a small overshoot only.
        assert!(result.n_nodes < 200_000);
    }
}
