pub mod history;
pub mod node_type;
pub mod options;
pub mod ordering;
pub mod pvs;
pub mod root;
pub mod root_move;
pub mod search_context;
pub mod search_result;
pub mod threading;
pub mod time_control;

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::constants::MAX_THREADS;
use crate::eval::PawnCache;
use crate::position::Position;
use crate::search::threading::ThreadPool;
use crate::search::time_control::{TimeControlMode, TimeManager};
use crate::transposition_table::TranspositionTable;
use crate::types::Depth;

pub use options::SearchOptions;
pub use search_result::{SearchProgress, SearchResult};

/// Type alias for search progress callback
pub type SearchProgressCallback = dyn Fn(SearchProgress) + Send + Sync + 'static;

/// Pawn structure cache size as a power of two, per thread pool.
const PAWN_CACHE_BITS: u32 = 16;

/// Limit on one search, from the `go` command.
#[derive(Clone, Copy, Debug)]
pub enum SearchConstraint {
    /// Search until aborted.
    Infinite,
    /// Spend exactly this long on the move.
    MoveTime { time_per_move_ms: u64 },
    /// Divide a running clock over the rest of the game.
    Clock {
        remaining_ms: u64,
        increment_ms: u64,
        moves_to_go: Option<u32>,
    },
    /// Stop after completing this iteration depth.
    Depth(Depth),
    /// Stop after roughly this many nodes.
    Nodes(u64),
}

/// Task structure passed to search threads.
pub struct SearchTask {
    pub pos: Position,
    pub game_history: Vec<u64>,
    pub tt: Arc<TranspositionTable>,
    pub pawn_cache: Arc<PawnCache>,
    pub time: Arc<TimeManager>,
    pub multi_pv: usize,
    pub depth_limit: Option<Depth>,
    pub node_limit: Option<u64>,
    pub callback: Option<Arc<SearchProgressCallback>>,
    #[cfg(feature = "cluster")]
    pub cluster: Option<Arc<crate::cluster::ClusterCoordinator>>,
}

impl SearchTask {
    /// Copy of the task for a helper thread. Helpers share everything
    /// but never report progress; only the main thread speaks, and only
    /// the main thread talks to peer processes.
    pub fn helper_copy(&self) -> SearchTask {
        SearchTask {
            pos: self.pos,
            game_history: self.game_history.clone(),
            tt: self.tt.clone(),
            pawn_cache: self.pawn_cache.clone(),
            time: self.time.clone(),
            multi_pv: self.multi_pv,
            depth_limit: self.depth_limit,
            node_limit: None,
            callback: None,
            #[cfg(feature = "cluster")]
            cluster: None,
        }
    }
}

/// Main search engine structure: owns the transposition table, the
/// pawn cache, and the thread pool, and turns go-command constraints
/// into running searches.
pub struct Search {
    tt: Arc<TranspositionTable>,
    pawn_cache: Arc<PawnCache>,
    threads: Arc<ThreadPool>,
    multi_pv: usize,
    #[cfg(feature = "cluster")]
    cluster: Option<Arc<crate::cluster::ClusterCoordinator>>,
}

impl Search {
    pub fn new(options: &SearchOptions) -> Search {
        let n_threads = options.n_threads.clamp(1, MAX_THREADS);
        crate::init();

        Search {
            tt: Arc::new(TranspositionTable::new(options.tt_mb_size)),
            pawn_cache: Arc::new(PawnCache::new(PAWN_CACHE_BITS)),
            threads: ThreadPool::new(n_threads),
            multi_pv: options.multi_pv,
            #[cfg(feature = "cluster")]
            cluster: None,
        }
    }

    /// Attaches a process-group coordinator; subsequent searches trade
    /// transposition entries and stop signals with peer ranks.
    #[cfg(feature = "cluster")]
    pub fn set_cluster(&mut self, cluster: Arc<crate::cluster::ClusterCoordinator>) {
        self.cluster = Some(cluster);
    }

    /// Drops learned state between games.
    pub fn new_game(&self) {
        self.tt.clear();
        self.pawn_cache.clear();
        self.threads.clear_search();
    }

    /// Resets only the per-thread heuristic tables, keeping the
    /// transposition table warm for the next search in the same game.
    pub fn clear_search(&self) {
        self.threads.clear_search();
    }

    pub fn set_tt_size(&mut self, mb_size: usize) {
        self.tt = Arc::new(TranspositionTable::new(mb_size));
    }

    pub fn set_threads(&mut self, n_threads: usize) {
        self.threads = ThreadPool::new(n_threads.clamp(1, MAX_THREADS));
    }

    pub fn set_multi_pv(&mut self, multi_pv: usize) {
        self.multi_pv = multi_pv.max(1);
    }

    /// Starts a search without blocking. The result arrives on the
    /// returned channel; call [`Search::abort`] to stop early.
    pub fn start_thinking(
        &self,
        pos: &Position,
        game_history: Vec<u64>,
        constraint: SearchConstraint,
        callback: Option<Arc<SearchProgressCallback>>,
    ) -> Receiver<SearchResult> {
        let (mode, depth_limit, node_limit) = match constraint {
            SearchConstraint::Infinite => (TimeControlMode::Infinite, None, None),
            SearchConstraint::MoveTime { time_per_move_ms } => {
                (TimeControlMode::MoveTime { time_per_move_ms }, None, None)
            }
            SearchConstraint::Clock {
                remaining_ms,
                increment_ms,
                moves_to_go,
            } => (
                TimeControlMode::Clock {
                    remaining_ms,
                    increment_ms,
                    moves_to_go,
                },
                None,
                None,
            ),
            SearchConstraint::Depth(depth) => (TimeControlMode::Infinite, Some(depth), None),
            SearchConstraint::Nodes(nodes) => (TimeControlMode::Infinite, None, Some(nodes)),
        };

        let mut time = TimeManager::new(mode, self.threads.abort_flag(), pos.game_ply());
        time.start();

        let task = SearchTask {
            pos: *pos,
            game_history,
            tt: self.tt.clone(),
            pawn_cache: self.pawn_cache.clone(),
            time: Arc::new(time),
            multi_pv: self.multi_pv,
            depth_limit,
            node_limit,
            callback,
            #[cfg(feature = "cluster")]
            cluster: self.cluster.clone(),
        };

        self.threads.start_thinking(task)
    }

    /// Blocking search, mainly for bench and tests.
    pub fn run(
        &self,
        pos: &Position,
        game_history: Vec<u64>,
        constraint: SearchConstraint,
        callback: Option<Arc<SearchProgressCallback>>,
    ) -> SearchResult {
        let receiver = self.start_thinking(pos, game_history, constraint, callback);
        receiver.recv().unwrap_or(SearchResult {
            score: 0,
            best_move: None,
            n_nodes: 0,
            pv_line: Vec::new(),
            depth: 0,
        })
    }

    pub fn abort(&self) {
        self.threads.abort_search();
    }

    pub fn is_aborted(&self) -> bool {
        self.threads.is_aborted()
    }

    pub fn wait_for_think_finished(&self) {
        self.threads.wait_for_think_finished();
    }

    pub fn tt_hashfull(&self) -> usize {
        self.tt.hashfull()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mate_in;

    #[test]
    fn test_run_mate_in_one() {
        let search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
        let pos: Position = "6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1".parse().unwrap();
        let result = search.run(&pos, Vec::new(), SearchConstraint::Depth(5), None);
        assert_eq!(result.score, mate_in(1));
    }

    #[test]
    fn test_move_time_returns_promptly() {
        use std::time::Instant;

        let search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
        let pos = Position::startpos();
        let started = Instant::now();
        let result = search.run(
            &pos,
            Vec::new(),
            SearchConstraint::MoveTime {
                time_per_move_ms: 100,
            },
            None,
        );
        assert!(result.best_move.is_some());
        assert!(started.elapsed().as_millis() < 2_000);
    }

    #[test]
    fn test_progress_callback_receives_iterations() {
        use std::sync::Mutex;

        let search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
        let pos = Position::startpos();
        let depths: Arc<Mutex<Vec<Depth>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&depths);
        let callback: Arc<SearchProgressCallback> = Arc::new(move |p: SearchProgress| {
            sink.lock().unwrap().push(p.depth);
        });
        search.run(
            &pos,
            Vec::new(),
            SearchConstraint::Depth(4),
            Some(callback),
        );

        let depths = depths.lock().unwrap();
        assert_eq!(*depths, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_game_history_repetition_draw() {
        // The same position occurred twice before; any shuffle back is
        // an immediate draw the search must see.
        let pos: Position = "4k3/8/8/8/8/8/8/4K2R w - - 8 5".parse().unwrap();
        let search = Search::new(&SearchOptions::new(4).with_threads(Some(1)));
        // Simulate a history where the current position repeats.
        let history = vec![pos.hash(), 1, 2, 3, pos.hash(), 4, 5, 6];
        let result = search.run(&pos, history, SearchConstraint::Depth(3), None);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_abort_infinite_search() {
        let search = Search::new(&SearchOptions::new(4).with_threads(Some(2)));
        let pos = Position::startpos();
        let receiver = search.start_thinking(&pos, Vec::new(), SearchConstraint::Infinite, None);
        std::thread::sleep(std::time::Duration::from_millis(100));
        search.abort();
        let result = receiver.recv().unwrap();
        assert!(result.best_move.is_some());
        assert!(result.pv_line.first().is_some());
        search.wait_for_think_finished();
    }
}
