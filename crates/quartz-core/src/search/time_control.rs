//! Time control management for timed games.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::types::{Depth, Score};

/// Safety buffer in milliseconds to avoid time forfeit.
const TIME_BUFFER_MS: u64 = 50;

/// Smallest budget ever allocated to a move.
const MIN_TARGET_MS: u64 = 20;

/// Hard limit as a multiple of the per-move target.
const HARD_LIMIT_FACTOR: u64 = 7;

/// Depth threshold after which PV/score instability becomes meaningful.
const MIN_STABILITY_CHECK_DEPTH: Depth = 8;

/// Score drop in centipawns that triggers an emergency extension.
const SCORE_DROP_THRESHOLD: Score = 30;

/// Additional time granted on instability (fraction of the base target).
const EXTENSION_RATIO: f64 = 0.5;

/// Maximum number of incremental time extensions allowed per move.
const MAX_EXTENSION_STEPS: u8 = 3;

/// Fraction of the target below which iterations always continue.
const MIN_PERCENT: u64 = 45;

/// Estimated moves remaining when the opponent's clock gives no hint.
/// Starts at 17 and settles toward 5 as the game ages.
fn estimate_moves_left(game_ply: usize) -> u64 {
    17 - (game_ply as u64 / 15).min(12)
}

/// How committal the position looked to the pre-search scout: a sole
/// legal move, one clearly best move, or a genuine choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDifficulty {
    /// Exactly one legal move; thinking longer cannot change it.
    Forced = 0,
    /// One move clearly outscores every alternative at shallow depth.
    Easy = 1,
    #[default]
    Normal = 2,
}

impl SearchDifficulty {
    fn from_u8(raw: u8) -> SearchDifficulty {
        match raw {
            0 => SearchDifficulty::Forced,
            1 => SearchDifficulty::Easy,
            _ => SearchDifficulty::Normal,
        }
    }
}

/// Time control mode for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControlMode {
    /// No time limit.
    #[default]
    Infinite,

    /// Fixed time per move.
    MoveTime { time_per_move_ms: u64 },

    /// Running clock, optionally with an increment per move and a known
    /// number of moves to the next control.
    Clock {
        remaining_ms: u64,
        increment_ms: u64,
        moves_to_go: Option<u32>,
    },
}

/// Manages time allocation and tracking during search.
#[derive(Debug)]
pub struct TimeManager {
    /// Time control mode for the current search.
    mode: TimeControlMode,

    /// Start time of the current search.
    start_time: Instant,

    /// Minimum time to use before considering stopping (milliseconds).
    min_time_ms: AtomicU64,

    /// Maximum time allowed for this move (milliseconds).
    /// Search must stop before this time is reached.
    max_time_ms: AtomicU64,

    /// Baseline maximum time for the current move before any extensions.
    base_max_time_ms: AtomicU64,

    /// Absolute hard limit for this move (remaining time - buffer).
    /// Neither initial allocation nor extensions can exceed this.
    hard_time_limit_ms: AtomicU64,

    /// Number of extension steps already applied this move.
    extension_steps: AtomicU8,

    /// Difficulty reported by the pre-search scout, as a raw
    /// [`SearchDifficulty`] discriminant.
    difficulty: AtomicU8,

    /// Reference to the abort flag for signaling search termination.
    abort_flag: Arc<AtomicBool>,

    /// Previous iteration's score (for detecting score drops).
    prev_score: Mutex<Option<Score>>,
}

impl TimeManager {
    /// Creates a new TimeManager.
    ///
    /// # Panics
    ///
    /// Panics when `mode` carries a clock with no time on it; a budget
    /// cannot be computed and continuing would forfeit silently.
    pub fn new(mode: TimeControlMode, abort_flag: Arc<AtomicBool>, game_ply: usize) -> Self {
        let (min_ms, max_ms, hard_limit_ms) = Self::calculate_time_limits(mode, game_ply);

        if is_debug_enabled() {
            eprintln!(
                "[TimeManager] New: mode={:?}, ply={}, min={}ms, max={}ms, hard_limit={}ms",
                mode, game_ply, min_ms, max_ms, hard_limit_ms
            );
        }

        TimeManager {
            mode,
            start_time: Instant::now(),
            min_time_ms: AtomicU64::new(min_ms),
            max_time_ms: AtomicU64::new(max_ms),
            base_max_time_ms: AtomicU64::new(max_ms),
            hard_time_limit_ms: AtomicU64::new(hard_limit_ms),
            extension_steps: AtomicU8::new(0),
            difficulty: AtomicU8::new(SearchDifficulty::Normal as u8),
            abort_flag,
            prev_score: Mutex::new(None),
        }
    }

    /// Calculates min, max, and hard time limits for the move.
    fn calculate_time_limits(mode: TimeControlMode, game_ply: usize) -> (u64, u64, u64) {
        match mode {
            TimeControlMode::Infinite => (u64::MAX, u64::MAX, u64::MAX),

            TimeControlMode::MoveTime { time_per_move_ms } => {
                let available = time_per_move_ms
                    .saturating_sub(TIME_BUFFER_MS)
                    .max(MIN_TARGET_MS);
                (available, available, available)
            }

            TimeControlMode::Clock {
                remaining_ms,
                increment_ms,
                moves_to_go,
            } => {
                if remaining_ms == 0 {
                    panic!("time control specifies a clock with no remaining time");
                }
                let usable = remaining_ms.saturating_sub(TIME_BUFFER_MS).max(MIN_TARGET_MS);
                let moves_left = match moves_to_go {
                    Some(n) => (n as u64).max(1),
                    None => estimate_moves_left(game_ply),
                };
                let target = (usable / moves_left + increment_ms)
                    .clamp(MIN_TARGET_MS, usable);
                let hard = (target * HARD_LIMIT_FACTOR).min(usable);
                let min = (target * MIN_PERCENT / 100).max(MIN_TARGET_MS / 2);
                (min, target, hard)
            }
        }
    }

    /// Starts the timer for a new search.
    pub fn start(&mut self) {
        self.start_time = Instant::now();
        self.extension_steps.store(0, Ordering::Relaxed);
        self.difficulty.store(SearchDifficulty::Normal as u8, Ordering::Relaxed);
        let current_max = self.base_max_time_ms.load(Ordering::Relaxed);
        self.max_time_ms.store(current_max, Ordering::Relaxed);
        *self.prev_score.lock().unwrap() = None;
    }

    /// Records the scouted difficulty and, on a running clock, shrinks
    /// the budget for positions that do not merit a full think.
    pub fn set_difficulty(&self, difficulty: SearchDifficulty) {
        self.difficulty.store(difficulty as u8, Ordering::Relaxed);
        if !matches!(self.mode, TimeControlMode::Clock { .. }) {
            return;
        }
        let divisor = match difficulty {
            SearchDifficulty::Forced => 8,
            SearchDifficulty::Easy => 2,
            SearchDifficulty::Normal => return,
        };
        let base = self.base_max_time_ms.load(Ordering::Relaxed);
        let reduced = (base / divisor).max(MIN_TARGET_MS);
        self.base_max_time_ms.store(reduced, Ordering::Relaxed);
        self.max_time_ms.store(reduced, Ordering::Relaxed);
        let min = self.min_time_ms.load(Ordering::Relaxed).min(reduced);
        self.min_time_ms.store(min, Ordering::Relaxed);

        if is_debug_enabled() {
            eprintln!(
                "[TimeManager] Difficulty {:?}: max reduced to {}ms",
                difficulty, reduced
            );
        }
    }

    pub fn difficulty(&self) -> SearchDifficulty {
        SearchDifficulty::from_u8(self.difficulty.load(Ordering::Relaxed))
    }

    /// Returns the elapsed time in milliseconds since search started.
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Checks if the search has exceeded the maximum time limit.
    #[inline]
    pub fn is_time_up(&self) -> bool {
        if self.mode == TimeControlMode::Infinite {
            return false;
        }
        self.elapsed_ms() >= self.max_time_ms.load(Ordering::Relaxed)
    }

    /// Checks if we should start another iteration. A new iteration
    /// rarely completes in less than half the time of the previous one,
    /// so stopping early here saves time that would be wasted on an
    /// aborted depth.
    pub fn should_continue_iteration(&self) -> bool {
        if self.mode == TimeControlMode::Infinite {
            return true;
        }

        let elapsed = self.elapsed_ms();
        if elapsed < self.min_time_ms.load(Ordering::Relaxed) {
            return true;
        }

        let should_continue = (elapsed as f64 * 1.5) < self.max_ms() as f64;
        if !should_continue && is_debug_enabled() {
            eprintln!(
                "[TimeManager] Stopping iteration: elapsed={}ms, max={}ms",
                elapsed,
                self.max_ms()
            );
        }

        should_continue
    }

    /// Attempts to extend the search time when the search becomes
    /// unstable: the score dropped sharply or the best move changed at
    /// a depth where that is meaningful.
    pub fn try_extend_time(&self, current_score: Score, pv_changed: bool, depth: Depth) -> bool {
        if self.mode == TimeControlMode::Infinite {
            *self.prev_score.lock().unwrap() = Some(current_score);
            return false;
        }

        let used_steps = self.extension_steps.load(Ordering::Relaxed);
        if used_steps >= MAX_EXTENSION_STEPS {
            *self.prev_score.lock().unwrap() = Some(current_score);
            return false;
        }

        let should_extend = {
            let mut prev_guard = self.prev_score.lock().unwrap();
            let prev = *prev_guard;
            *prev_guard = Some(current_score); // Always update

            match prev {
                Some(p) if current_score < p - SCORE_DROP_THRESHOLD => true,
                _ => pv_changed && depth >= MIN_STABILITY_CHECK_DEPTH,
            }
        };

        if !should_extend {
            return false;
        }

        self.apply_extension(used_steps)
    }

    fn apply_extension(&self, used_steps: u8) -> bool {
        let base_max = self.base_max_time_ms.load(Ordering::Relaxed);
        let hard_limit = self.hard_time_limit_ms.load(Ordering::Relaxed);
        let old_max = self.max_time_ms.load(Ordering::Relaxed);

        let extension_amount = ((base_max as f64) * EXTENSION_RATIO) as u64;
        let target_max = base_max.saturating_add(extension_amount).min(hard_limit);

        if old_max >= target_max {
            return false;
        }

        let remaining_steps = (MAX_EXTENSION_STEPS - used_steps) as u64;
        let remaining_budget = target_max.saturating_sub(old_max);
        let step_increment = remaining_budget.div_ceil(remaining_steps);

        if step_increment == 0 {
            return false;
        }

        let new_max = old_max.saturating_add(step_increment).min(target_max);
        self.max_time_ms.store(new_max, Ordering::Relaxed);
        self.extension_steps.fetch_add(1, Ordering::Release);

        if is_debug_enabled() {
            eprintln!(
                "[TimeManager] Time extended (step {}/{}): old={}ms, new={}ms, limit={}ms",
                used_steps + 1,
                MAX_EXTENSION_STEPS,
                old_max,
                new_max,
                hard_limit
            );
        }

        true
    }

    /// Signals the search to abort due to time-out.
    pub fn signal_abort(&self) {
        self.abort_flag.store(true, Ordering::Release);
    }

    /// Checks if abort has been signaled.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }

    /// Checks time and signals abort if time is up.
    #[inline]
    pub fn check_time(&self) -> bool {
        if self.is_time_up() {
            if !self.is_aborted() {
                if is_debug_enabled() {
                    eprintln!(
                        "[TimeManager] Time up! elapsed={}ms, max={}ms",
                        self.elapsed_ms(),
                        self.max_ms()
                    );
                }
                self.signal_abort();
            }
            true
        } else {
            false
        }
    }

    /// Returns the current time control mode.
    pub fn mode(&self) -> TimeControlMode {
        self.mode
    }

    pub fn min_ms(&self) -> u64 {
        self.min_time_ms.load(Ordering::Relaxed)
    }

    pub fn max_ms(&self) -> u64 {
        self.max_time_ms.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        if self.mode == TimeControlMode::Infinite {
            None
        } else {
            Some(self.start_time + Duration::from_millis(self.max_ms()))
        }
    }
}

fn is_debug_enabled() -> bool {
    static DEBUG: OnceLock<bool> = OnceLock::new();
    *DEBUG.get_or_init(|| {
        let env_var = std::env::var("QUARTZ_DEBUG_TIME").unwrap_or_default();
        env_var == "1" || env_var.to_lowercase() == "true"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(mode: TimeControlMode, ply: usize) -> TimeManager {
        TimeManager::new(mode, Arc::new(AtomicBool::new(false)), ply)
    }

    #[test]
    fn test_moves_left_heuristic() {
        assert_eq!(estimate_moves_left(0), 17);
        assert_eq!(estimate_moves_left(30), 15);
        assert_eq!(estimate_moves_left(150), 7);
        // Never drops below five moves.
        assert_eq!(estimate_moves_left(400), 5);
    }

    #[test]
    fn test_infinite_never_times_out() {
        let tm = manager(TimeControlMode::Infinite, 0);
        assert!(!tm.is_time_up());
        assert!(tm.should_continue_iteration());
        assert!(!tm.check_time());
    }

    #[test]
    fn test_movetime_reserves_buffer() {
        let tm = manager(TimeControlMode::MoveTime { time_per_move_ms: 1000 }, 0);
        assert_eq!(tm.max_ms(), 950);
    }

    #[test]
    fn test_movetime_clamps_tiny_budget() {
        let tm = manager(TimeControlMode::MoveTime { time_per_move_ms: 10 }, 0);
        assert_eq!(tm.max_ms(), MIN_TARGET_MS);
    }

    #[test]
    fn test_clock_allocation_with_movestogo() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 10_050,
                increment_ms: 0,
                moves_to_go: Some(10),
            },
            0,
        );
        assert_eq!(tm.max_ms(), 1000);
        let hard = tm.hard_time_limit_ms.load(Ordering::Relaxed);
        assert_eq!(hard, 7000);
    }

    #[test]
    fn test_clock_hard_limit_capped_by_remaining() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 1050,
                increment_ms: 0,
                moves_to_go: Some(2),
            },
            0,
        );
        // 7x target would exceed the clock; the cap holds it under it.
        let hard = tm.hard_time_limit_ms.load(Ordering::Relaxed);
        assert!(hard <= 1000);
    }

    #[test]
    fn test_increment_added_to_target() {
        let without = manager(
            TimeControlMode::Clock {
                remaining_ms: 60_000,
                increment_ms: 0,
                moves_to_go: None,
            },
            0,
        );
        let with = manager(
            TimeControlMode::Clock {
                remaining_ms: 60_000,
                increment_ms: 1000,
                moves_to_go: None,
            },
            0,
        );
        assert_eq!(with.max_ms(), without.max_ms() + 1000);
    }

    #[test]
    #[should_panic(expected = "no remaining time")]
    fn test_empty_clock_is_fatal() {
        manager(
            TimeControlMode::Clock {
                remaining_ms: 0,
                increment_ms: 0,
                moves_to_go: None,
            },
            0,
        );
    }

    #[test]
    fn test_extension_steps_capped() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 100_000,
                increment_ms: 0,
                moves_to_go: Some(10),
            },
            0,
        );
        let base = tm.max_ms();
        let mut grants = 0;
        for i in 0..10 {
            if tm.try_extend_time(-1000 * i, false, 20) {
                grants += 1;
            }
        }
        assert_eq!(grants, MAX_EXTENSION_STEPS as i32);
        assert!(tm.max_ms() > base);
        let hard = tm.hard_time_limit_ms.load(Ordering::Relaxed);
        assert!(tm.max_ms() <= hard);
    }

    #[test]
    fn test_pv_change_extends_only_at_depth() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 100_000,
                increment_ms: 0,
                moves_to_go: Some(10),
            },
            0,
        );
        assert!(!tm.try_extend_time(0, true, 2));
        assert!(tm.try_extend_time(0, true, MIN_STABILITY_CHECK_DEPTH));
    }

    #[test]
    fn test_difficulty_shrinks_clock_budget() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 10_050,
                increment_ms: 0,
                moves_to_go: Some(10),
            },
            0,
        );
        assert_eq!(tm.max_ms(), 1000);
        tm.set_difficulty(SearchDifficulty::Easy);
        assert_eq!(tm.max_ms(), 500);
        assert_eq!(tm.difficulty(), SearchDifficulty::Easy);
        assert!(tm.min_ms() <= tm.max_ms());
    }

    #[test]
    fn test_forced_budget_floors_at_minimum() {
        let tm = manager(
            TimeControlMode::Clock {
                remaining_ms: 200,
                increment_ms: 0,
                moves_to_go: Some(10),
            },
            0,
        );
        tm.set_difficulty(SearchDifficulty::Forced);
        assert_eq!(tm.max_ms(), MIN_TARGET_MS);
    }

    #[test]
    fn test_difficulty_ignored_for_fixed_move_time() {
        let tm = manager(TimeControlMode::MoveTime { time_per_move_ms: 1000 }, 0);
        tm.set_difficulty(SearchDifficulty::Forced);
        // A fixed per-move budget is a promise to the caller.
        assert_eq!(tm.max_ms(), 950);
        assert_eq!(tm.difficulty(), SearchDifficulty::Forced);
    }

    #[test]
    fn test_check_time_signals_abort_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let tm = TimeManager::new(
            TimeControlMode::MoveTime { time_per_move_ms: 1 },
            flag.clone(),
            0,
        );
        std::thread::sleep(Duration::from_millis(25));
        assert!(tm.check_time());
        assert!(flag.load(Ordering::Relaxed));
    }
}
