//! Reference: https://github.com/official-stockfish/Stockfish/blob/5b555525d2f9cbff446b7461d1317948e8e21cd1/src/thread.cpp

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{JoinHandle, sleep};

use crate::search::SearchTask;
use crate::search::history::SearchHistory;
use crate::search::root;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;

/// A worker thread in the pool. Every thread searches the same root
/// position independently; coordination happens only through the shared
/// transposition table and the abort flag.
pub struct Thread {
    /// Mutex used with the condition variable for thread sleeping.
    mutex_for_sleep_condition: Mutex<()>,

    /// Condition variable for waking up idle threads.
    sleep_condition: std::sync::Condvar,

    /// Unique index of this thread in the pool.
    idx: usize,

    /// Weak reference to the thread pool this thread belongs to.
    pool: Weak<ThreadPool>,

    /// Shared flag indicating if the engine is thinking.
    thinking: Arc<AtomicBool>,

    /// Work for the next wake-up, set by the main thread.
    task: Mutex<Option<SearchTask>>,

    /// Outcome of the last search this thread ran.
    result: Mutex<Option<SearchResult>>,

    /// Heuristic tables carried between searches within one game.
    /// Decayed, not cleared, so move ordering stays warm.
    history: Mutex<SearchHistory>,

    /// Flag indicating if the thread has completed initialization.
    ready: AtomicBool,

    /// Flag indicating if this thread is currently searching.
    searching: AtomicBool,

    /// Flag signaling the thread to exit.
    exit: AtomicBool,
}

impl Thread {
    fn new(idx: usize, thinking: Arc<AtomicBool>, pool: Weak<ThreadPool>) -> Thread {
        Thread {
            mutex_for_sleep_condition: Mutex::new(()),
            sleep_condition: std::sync::Condvar::new(),
            idx,
            pool,
            thinking,
            task: Mutex::new(None),
            result: Mutex::new(None),
            history: Mutex::new(SearchHistory::new()),
            ready: AtomicBool::new(false),
            searching: AtomicBool::new(false),
            exit: AtomicBool::new(false),
        }
    }

    /// Wake up this thread when there is work to do.
    fn notify_one(&self) {
        let _lock = self.mutex_for_sleep_condition.lock();
        self.sleep_condition.notify_one();
    }

    fn run_task(&self, task: SearchTask) -> SearchResult {
        let mut ctx = SearchContext::new(
            &task.pos,
            task.game_history,
            task.tt,
            task.pawn_cache,
            task.time,
        );
        ctx.thread_idx = self.idx;
        ctx.multi_pv = task.multi_pv;
        ctx.depth_limit = task.depth_limit;
        ctx.node_limit = task.node_limit;
        ctx.callback = task.callback;
        #[cfg(feature = "cluster")]
        {
            ctx.cluster = task.cluster;
        }

        std::mem::swap(&mut ctx.history, &mut *self.history.lock().unwrap());
        ctx.history.decay();

        let result = root::iterative_deepening(&mut ctx, &task.pos);

        std::mem::swap(&mut ctx.history, &mut *self.history.lock().unwrap());
        result
    }

    /// Helper thread loop: sleep until a search starts, run the
    /// assigned task, publish the result, go back to sleep.
    fn idle_loop(self: &Arc<Self>) {
        while !self.exit.load(Ordering::Acquire) {
            if self.searching.load(Ordering::Acquire) {
                let task = self.task.lock().unwrap().take();
                if let Some(task) = task {
                    let result = self.run_task(task);
                    *self.result.lock().unwrap() = Some(result);
                }
                self.searching.store(false, Ordering::Release);
            }

            if !self.thinking.load(Ordering::Acquire) {
                let lock = self.mutex_for_sleep_condition.lock().unwrap();
                self.ready.store(true, Ordering::Release);
                let _guard = self
                    .sleep_condition
                    .wait_while(lock, |_| {
                        !self.exit.load(Ordering::Acquire)
                            && !self.thinking.load(Ordering::Acquire)
                    })
                    .unwrap();
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Main thread message processing loop.
    fn main_thread_loop(self: Arc<Self>, receiver: Arc<Mutex<Receiver<Message>>>) {
        while !self.exit.load(Ordering::Acquire) {
            let message = {
                let receiver = receiver.lock().unwrap();
                receiver.recv()
            };
            match message {
                Ok(Message::StartThinking(task, result_sender)) => {
                    self.searching.store(true, Ordering::Release);
                    let pool = match self.pool.upgrade() {
                        Some(pool) => pool,
                        None => break,
                    };

                    let result = pool.search_root(&self, task);

                    self.searching.store(false, Ordering::Release);
                    self.thinking.store(false, Ordering::Release);
                    let _ = result_sender.send(result);
                }
                Ok(Message::Exit) | Err(_) => {
                    self.exit.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }
}

/// Messages that can be sent to the main thread.
enum Message {
    /// Start a new search with the given task and return results via the sender.
    StartThinking(SearchTask, Sender<SearchResult>),

    /// Signal the thread to exit.
    Exit,
}

/// Thread pool for Lazy SMP search.
pub struct ThreadPool {
    /// Collection of all threads in the pool.
    threads: Vec<Arc<Thread>>,

    /// Join handles for thread cleanup on shutdown.
    thread_handles: Vec<JoinHandle<()>>,

    /// Number of threads in the pool.
    pub size: usize,

    /// Global flag indicating if the engine is thinking.
    thinking: Arc<AtomicBool>,

    /// Channel sender for sending messages to the main thread.
    sender: Arc<Sender<Message>>,

    /// Channel receiver for the main thread (protected by mutex).
    receiver: Arc<Mutex<Receiver<Message>>>,

    /// Flag for aborting the current search, shared with every
    /// thread's time manager.
    abort_flag: Arc<AtomicBool>,
}

impl ThreadPool {
    pub fn new(n_threads: usize) -> Arc<ThreadPool> {
        Arc::new_cyclic(|weak| {
            let (sender, receiver) = std::sync::mpsc::channel();

            let mut pool = ThreadPool {
                threads: Vec::new(),
                thread_handles: Vec::new(),
                size: n_threads.max(1),
                thinking: Arc::new(AtomicBool::new(false)),
                sender: Arc::new(sender),
                receiver: Arc::new(Mutex::new(receiver)),
                abort_flag: Arc::new(AtomicBool::new(false)),
            };

            pool.init(weak);
            pool
        })
    }

    fn init(&mut self, pool: &Weak<ThreadPool>) {
        self.create_main_thread(pool);
        self.create_worker_threads(pool);
        self.wait_for_threads_ready();
    }

    fn create_main_thread(&mut self, pool: &Weak<ThreadPool>) {
        let main_thread = Arc::new(Thread::new(0, self.thinking.clone(), pool.clone()));
        let main_thread_clone = main_thread.clone();
        let receiver_clone = self.receiver.clone();

        let handle = std::thread::spawn(move || main_thread_clone.main_thread_loop(receiver_clone));

        self.threads.push(main_thread);
        self.thread_handles.push(handle);
    }

    fn create_worker_threads(&mut self, pool: &Weak<ThreadPool>) {
        for i in 1..self.size {
            let thread = Arc::new(Thread::new(i, self.thinking.clone(), pool.clone()));
            let thread_clone = thread.clone();

            let handle = std::thread::spawn(move || thread_clone.idle_loop());

            self.threads.push(thread);
            self.thread_handles.push(handle);
        }
    }

    fn wait_for_threads_ready(&self) {
        self.main().ready.store(true, Ordering::Release);

        while !self.all_threads_ready() {
            sleep(std::time::Duration::from_millis(10));
        }
    }

    fn all_threads_ready(&self) -> bool {
        self.threads
            .iter()
            .all(|thread| thread.ready.load(Ordering::Relaxed))
    }

    /// Shut down the thread pool and wait for all threads to exit.
    fn exit(&mut self) {
        for thread in &self.threads {
            let lock = thread.mutex_for_sleep_condition.lock();
            thread.exit.store(true, Ordering::Release);
            drop(lock);

            thread.notify_one();
        }

        let _ = self.sender.send(Message::Exit);

        for thread_handle in self.thread_handles.drain(..) {
            thread_handle.join().expect("Thread panicked");
        }

        self.threads.clear();
    }

    /// Runs one search across the whole pool: every thread gets a copy
    /// of the task, the main thread searches in the caller's context,
    /// then the deepest result wins.
    fn search_root(self: &Arc<Self>, main: &Arc<Thread>, task: SearchTask) -> SearchResult {
        task.tt.new_search();

        for thread in self.threads.iter().skip(1) {
            *thread.result.lock().unwrap() = None;
            *thread.task.lock().unwrap() = Some(task.helper_copy());
            thread.searching.store(true, Ordering::Release);
        }
        self.notify_all();

        let main_result = main.run_task(task);

        // The main thread is done; pull every helper out of its tree.
        self.abort_search();
        self.wait_for_workers();

        let mut best = main_result;
        for thread in self.threads.iter().skip(1) {
            if let Some(result) = thread.result.lock().unwrap().take() {
                best.n_nodes += result.n_nodes;
                let better = result.best_move.is_some()
                    && (result.depth > best.depth
                        || (result.depth == best.depth && result.score > best.score));
                if better {
                    let n_nodes = best.n_nodes;
                    best = result;
                    best.n_nodes = n_nodes;
                }
            }
        }
        best
    }

    fn wait_for_workers(&self) {
        for thread in self.threads.iter().skip(1) {
            while thread.searching.load(Ordering::Acquire) {
                std::thread::yield_now();
            }
        }
    }

    /// Start a new search task on the thread pool. The result arrives
    /// on the returned channel once every thread has finished.
    pub fn start_thinking(&self, task: SearchTask) -> Receiver<SearchResult> {
        let (result_sender, result_receiver) = std::sync::mpsc::channel();

        self.reset_abort_flag();

        self.thinking.store(true, Ordering::Release);
        let _ = self
            .sender
            .send(Message::StartThinking(task, result_sender));

        result_receiver
    }

    pub fn main(&self) -> &Arc<Thread> {
        &self.threads[0]
    }

    pub fn notify_all(&self) {
        for thread in &self.threads {
            thread.notify_one();
        }
    }

    /// Wait for the current search to complete.
    pub fn wait_for_think_finished(&self) {
        while self.thinking.load(Ordering::Acquire) {
            sleep(std::time::Duration::from_millis(5));
        }
    }

    /// Signal all threads to abort the current search.
    pub fn abort_search(&self) {
        self.abort_flag.store(true, Ordering::Release);
    }

    pub fn reset_abort_flag(&self) {
        self.abort_flag.store(false, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }

    /// The abort flag every search's time manager polls.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        self.abort_flag.clone()
    }

    /// Resets every thread's heuristic tables for a new game.
    pub fn clear_search(&self) {
        for thread in &self.threads {
            thread.history.lock().unwrap().clear();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::PawnCache;
    use crate::position::Position;
    use crate::search::time_control::{TimeControlMode, TimeManager};
    use crate::transposition_table::TranspositionTable;

    fn task(pool: &Arc<ThreadPool>, fen: &str, depth: i32) -> SearchTask {
        let pos: Position = fen.parse().unwrap();
        let mut time = TimeManager::new(
            TimeControlMode::Infinite,
            pool.abort_flag(),
            pos.game_ply(),
        );
        time.start();
        SearchTask {
            pos,
            game_history: Vec::new(),
            tt: Arc::new(TranspositionTable::new(4)),
            pawn_cache: Arc::new(PawnCache::new(10)),
            time: Arc::new(time),
            multi_pv: 1,
            depth_limit: Some(depth),
            node_limit: None,
            callback: None,
            #[cfg(feature = "cluster")]
            cluster: None,
        }
    }

    #[test]
    fn test_pool_runs_search_and_shuts_down() {
        let pool = ThreadPool::new(2);
        let task = task(&pool, "6k1/5ppp/8/8/8/8/8/4R1K1 w - - 0 1", 5);
        let receiver = pool.start_thinking(task);
        let result = receiver.recv().unwrap();
        assert_eq!(result.score, crate::types::mate_in(1));
        pool.wait_for_think_finished();
    }

    #[test]
    fn test_pool_reusable_across_searches() {
        let pool = ThreadPool::new(1);
        for _ in 0..2 {
            let task = task(
                &pool,
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
                3,
            );
            let receiver = pool.start_thinking(task);
            let result = receiver.recv().unwrap();
            assert!(result.best_move.is_some());
            pool.wait_for_think_finished();
        }
    }

    #[test]
    fn test_abort_stops_long_search() {
        let pool = ThreadPool::new(2);
        let task = task(
            &pool,
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
            60,
        );
        let receiver = pool.start_thinking(task);
        sleep(std::time::Duration::from_millis(100));
        pool.abort_search();
        let result = receiver.recv().unwrap();
        assert!(result.best_move.is_some());
    }
}
