use std::sync::Arc;

use crate::constants::{MAX_PLY, SCORE_INF};
use crate::eval::PawnCache;
use crate::move_list::MoveList;
use crate::movegen;
use crate::moves::Move;
use crate::piece::Piece;
use crate::position::Position;
use crate::search::SearchProgressCallback;
use crate::search::history::SearchHistory;
use crate::search::root_move::RootMove;
use crate::search::search_result::SearchProgress;
use crate::search::time_control::TimeManager;
use crate::transposition_table::TranspositionTable;
use crate::types::{Depth, Score};

/// Per-ply search state.
#[derive(Clone, Copy)]
pub struct StackRecord {
    pub pv: [Move; MAX_PLY],
    pub current_move: Move,
    pub moved_piece: Piece,
    pub static_eval: Score,
    /// Move excluded by a singular verification search at this ply.
    pub excluded_move: Move,
}

impl StackRecord {
    fn empty() -> StackRecord {
        StackRecord {
            pv: [Move::NONE; MAX_PLY],
            current_move: Move::NONE,
            moved_piece: Piece::None,
            static_eval: 0,
            excluded_move: Move::NONE,
        }
    }
}

/// All mutable state one search thread carries through the tree.
pub struct SearchContext {
    pub n_nodes: u64,
    pub sel_depth: usize,
    pub thread_idx: usize,
    pub multi_pv: usize,
    pub tt: Arc<TranspositionTable>,
    pub pawn_cache: Arc<PawnCache>,
    pub history: SearchHistory,
    pub root_moves: Vec<RootMove>,
    pub time: Arc<TimeManager>,
    pub node_limit: Option<u64>,
    pub depth_limit: Option<Depth>,
    pub callback: Option<Arc<SearchProgressCallback>>,
    /// Cross-process coordinator; driven from the main thread only.
    #[cfg(feature = "cluster")]
    pub cluster: Option<Arc<crate::cluster::ClusterCoordinator>>,
    pub completed_depth: Depth,
    /// Game ply of the root position, for the helper thread depth skip
    /// schedule.
    pub root_game_ply: usize,
    /// Position hashes of everything played before the current node:
    /// the game history first, then the search path.
    hash_history: Vec<u64>,
    stack: [StackRecord; MAX_PLY],
}

impl SearchContext {
    pub fn new(
        root: &Position,
        game_history: Vec<u64>,
        tt: Arc<TranspositionTable>,
        pawn_cache: Arc<PawnCache>,
        time: Arc<TimeManager>,
    ) -> SearchContext {
        SearchContext {
            n_nodes: 0,
            sel_depth: 0,
            thread_idx: 0,
            multi_pv: 1,
            tt,
            pawn_cache,
            history: SearchHistory::new(),
            root_moves: Self::create_root_moves(root),
            time,
            node_limit: None,
            depth_limit: None,
            callback: None,
            #[cfg(feature = "cluster")]
            cluster: None,
            completed_depth: 0,
            root_game_ply: root.game_ply(),
            hash_history: game_history,
            stack: [StackRecord::empty(); MAX_PLY],
        }
    }

    fn create_root_moves(root: &Position) -> Vec<RootMove> {
        let mut list = MoveList::new();
        movegen::generate_moves(root, &mut list);
        let mut root_moves = Vec::with_capacity(list.len());
        for mv in list.iter() {
            let mut child = *root;
            if child.apply_move(mv) {
                root_moves.push(RootMove::new(mv));
            }
        }
        root_moves
    }

    #[inline]
    pub fn increment_nodes(&mut self) {
        self.n_nodes += 1;
    }

    /// Periodic time and node limit poll. Returns true when the search
    /// must unwind.
    #[inline]
    pub fn should_abort(&self) -> bool {
        if self.time.is_aborted() {
            return true;
        }
        if self.n_nodes & 2047 == 0 {
            if self.time.check_time() {
                return true;
            }
            if let Some(limit) = self.node_limit {
                if self.n_nodes >= limit {
                    self.time.signal_abort();
                    return true;
                }
            }
        }
        false
    }

    #[inline]
    pub fn stack(&self, ply: usize) -> &StackRecord {
        &self.stack[ply]
    }

    #[inline]
    pub fn stack_mut(&mut self, ply: usize) -> &mut StackRecord {
        &mut self.stack[ply]
    }

    /// Records the move played at `ply` and appends the parent position
    /// to the repetition history.
    #[inline]
    pub fn update(&mut self, ply: usize, hash: u64, mv: Move, piece: Piece) {
        self.stack[ply].current_move = mv;
        self.stack[ply].moved_piece = piece;
        self.hash_history.push(hash);
        self.increment_nodes();
        if ply + 1 > self.sel_depth {
            self.sel_depth = ply + 1;
        }
    }

    #[inline]
    pub fn undo(&mut self, ply: usize) {
        self.stack[ply].current_move = Move::NONE;
        self.stack[ply].moved_piece = Piece::None;
        self.hash_history.pop();
    }

    /// Whether the position with `hash` already occurred within the
    /// fifty-move window. A single earlier occurrence counts as a draw:
    /// if the engine can force a second repetition it can force a third.
    pub fn is_repetition(&self, hash: u64, halfmove_clock: u16) -> bool {
        let len = self.hash_history.len();
        let lookback = (halfmove_clock as usize).min(len);
        let mut dist = 4;
        while dist <= lookback {
            if self.hash_history[len - dist] == hash {
                return true;
            }
            dist += 2;
        }
        false
    }

    /// Prepends `mv` at `ply` to the child's PV, teacher-copy-up style.
    pub fn update_pv(&mut self, ply: usize, mv: Move) {
        self.stack[ply].pv[0] = mv;
        let mut idx = 0;
        while idx + 1 < MAX_PLY && self.stack[ply + 1].pv[idx].is_some() {
            self.stack[ply].pv[idx + 1] = self.stack[ply + 1].pv[idx];
            idx += 1;
        }
        if idx + 1 < MAX_PLY {
            self.stack[ply].pv[idx + 1] = Move::NONE;
        }
    }

    pub fn clear_pv(&mut self, ply: usize) {
        self.stack[ply].pv[0] = Move::NONE;
    }

    pub fn pv_line(&self, ply: usize) -> Vec<Move> {
        self.stack[ply]
            .pv
            .iter()
            .take_while(|mv| mv.is_some())
            .copied()
            .collect()
    }

    pub fn update_root_move(&mut self, mv: Move, score: Score, move_count: usize, alpha: Score) {
        let is_pv = move_count == 1 || score > alpha;
        if is_pv {
            self.update_pv(0, mv);
        }

        let pv = if is_pv { self.pv_line(0) } else { Vec::new() };
        let rm = self
            .root_moves
            .iter_mut()
            .find(|rm| rm.mv == mv)
            .unwrap_or_else(|| panic!("unknown root move {mv}"));
        rm.update_average(score);

        if is_pv {
            rm.score = score;
            rm.pv = pv;
        } else {
            // Keep sorted below every properly searched move.
            rm.score = -SCORE_INF * 2;
        }
    }

    pub fn get_best_root_move(&self, skip_searched: bool) -> Option<RootMove> {
        if skip_searched {
            self.root_moves
                .iter()
                .filter(|rm| !rm.searched)
                .max_by_key(|rm| rm.score)
                .cloned()
        } else {
            self.root_moves.iter().max_by_key(|rm| rm.score).cloned()
        }
    }

    pub fn mark_root_move_searched(&mut self, mv: Move) {
        if let Some(rm) = self.root_moves.iter_mut().find(|rm| rm.mv == mv) {
            rm.searched = true;
        }
    }

    pub fn reset_root_move_searched(&mut self) {
        for rm in self.root_moves.iter_mut() {
            rm.searched = false;
            rm.previous_score = rm.score;
            rm.score = -SCORE_INF;
        }
    }

    pub fn notify_progress(&self, progress: SearchProgress) {
        if let Some(ref callback) = self.callback {
            callback(progress);
        }
    }

    pub fn root_moves_count(&self) -> usize {
        self.root_moves.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;
    use crate::search::time_control::TimeControlMode;
    use crate::square::Square;
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

    #[test]
    fn test_root_moves_are_legal_moves() {
        let pos = Position::startpos();
        let ctx = context(&pos);
        assert_eq!(ctx.root_moves_count(), 20);
    }

    #[test]
    fn test_update_pv_copies_child_line() {
        let pos = Position::startpos();
        let mut ctx = context(&pos);
        let e4 = Move::new(Square::E2, Square::E4, MoveKind::DoublePush);
        let e5 = Move::new(Square::E7, Square::E5, MoveKind::DoublePush);
        let nf3 = Move::new(Square::G1, Square::F3, MoveKind::Quiet);

        ctx.update_pv(2, nf3);
        ctx.update_pv(1, e5);
        ctx.update_pv(0, e4);
        assert_eq!(ctx.pv_line(0), vec![e4, e5, nf3]);
    }

    #[test]
    fn test_repetition_detected_at_distance_four() {
        let pos = Position::startpos();
        let mut ctx = context(&pos);
        let hash = 0xABCD;
        // Simulated shuffle: the same position four plies back.
        ctx.update(0, hash, Move::NONE, Piece::None);
        ctx.update(1, 1, Move::NONE, Piece::None);
        ctx.update(2, 2, Move::NONE, Piece::None);
        ctx.update(3, 3, Move::NONE, Piece::None);
        assert!(ctx.is_repetition(hash, 50));
        // Outside the fifty-move window nothing matches.
        assert!(!ctx.is_repetition(hash, 3));
        // Unwinding clears the history.
        ctx.undo(3);
        ctx.undo(2);
        ctx.undo(1);
        ctx.undo(0);
        assert!(!ctx.is_repetition(hash, 50));
    }

    #[test]
    fn test_best_root_move_skips_searched() {
        let pos = Position::startpos();
        let mut ctx = context(&pos);
        let first = ctx.root_moves[0].mv;
        let second = ctx.root_moves[1].mv;
        ctx.root_moves[0].score = 100;
        ctx.root_moves[1].score = 50;
        assert_eq!(ctx.get_best_root_move(false).unwrap().mv, first);
        ctx.mark_root_move_searched(first);
        assert_eq!(ctx.get_best_root_move(true).unwrap().mv, second);
    }
}
