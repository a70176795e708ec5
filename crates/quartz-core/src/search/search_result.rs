use crate::moves::Move;
use crate::types::{Depth, Score};

/// Final outcome of a search, aggregated across helper threads.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub score: Score,
    pub best_move: Option<Move>,
    pub n_nodes: u64,
    pub pv_line: Vec<Move>,
    pub depth: Depth,
}

/// Per-iteration report delivered through the progress callback after
/// each completed depth. Scores from aborted iterations are never
/// reported.
#[derive(Clone, Debug)]
pub struct SearchProgress {
    pub depth: Depth,
    pub sel_depth: usize,
    pub multipv_index: usize,
    pub score: Score,
    pub pv_line: Vec<Move>,
    pub n_nodes: u64,
    pub elapsed_ms: u64,
    pub hashfull: usize,
}
