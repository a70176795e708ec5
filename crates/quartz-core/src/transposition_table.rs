//! Lockless shared transposition table.
//!
//! Each entry is two `AtomicU64` words written without synchronization.
//! The key word carries the high half of the hash combined with an
//! XOR-fold of the data word, so a probe that observes a torn pair
//! (key from one store, data from another) fails verification instead
//! of returning corrupt data.

use std::mem;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use aligned_vec::{AVec, ConstAlign};
use cfg_if::cfg_if;

use crate::moves::Move;
use crate::types::{Depth, Score};

/// Bound type for transposition table entries.
///
/// Indicates the relationship between the stored score and the actual
/// position value:
/// - `None`: No valid entry
/// - `Lower`: Score is a lower bound (fail-high occurred)
/// - `Upper`: Score is an upper bound (fail-low)
/// - `Exact`: Score is the exact minimax value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    Lower = 1,
    Upper = 2,
    Exact = 3,
}

impl Bound {
    #[inline]
    fn from_u8(value: u8) -> Bound {
        debug_assert!(value < 4);
        unsafe { std::mem::transmute(value) }
    }
}

#[derive(Default)]
struct TTEntry {
    key: AtomicU64,
    data: AtomicU64,
}

impl TTEntry {
    // Bit layout of the data word.
    const MOVE_SHIFT: i32 = 0;
    const MOVE_MASK: u64 = 0xFFFF;

    const SCORE_SHIFT: i32 = 16;
    const SCORE_MASK: u64 = 0xFFFF;

    const EVAL_SHIFT: i32 = 32;
    const EVAL_MASK: u64 = 0xFFFF;

    const DEPTH_SHIFT: i32 = 48;
    const DEPTH_MASK: u64 = 0xFF;

    const BOUND_SHIFT: i32 = 56;
    const BOUND_MASK: u64 = 0x3;

    const PV_SHIFT: i32 = 58;
    const CHECK_SHIFT: i32 = 59;

    const GENERATION_SHIFT: i32 = 60;
    const GENERATION_MASK: u64 = 0xF;

    const KEY_HIGH_MASK: u64 = 0xFFFF_FFFF_0000_0000;

    /// Folds the data word into 32 bits for key verification.
    #[inline]
    fn fold(data: u64) -> u64 {
        (data ^ (data >> 32)) as u32 as u64
    }

    #[allow(clippy::too_many_arguments)]
    fn pack(
        mv: Move,
        score: Score,
        eval: Score,
        depth: u8,
        bound: Bound,
        is_pv: bool,
        was_in_check: bool,
        generation: u8,
    ) -> u64 {
        (mv.raw() as u64)
            | (((score as i16 as u16) as u64) << Self::SCORE_SHIFT)
            | (((eval as i16 as u16) as u64) << Self::EVAL_SHIFT)
            | ((depth as u64) << Self::DEPTH_SHIFT)
            | ((bound as u64) << Self::BOUND_SHIFT)
            | ((is_pv as u64) << Self::PV_SHIFT)
            | ((was_in_check as u64) << Self::CHECK_SHIFT)
            | (((generation & Self::GENERATION_MASK as u8) as u64) << Self::GENERATION_SHIFT)
    }

    #[inline]
    fn unpack(data: u64) -> TTData {
        TTData {
            mv: Move::from_raw(((data >> Self::MOVE_SHIFT) & Self::MOVE_MASK) as u16),
            score: ((data >> Self::SCORE_SHIFT) & Self::SCORE_MASK) as u16 as i16 as Score,
            eval: ((data >> Self::EVAL_SHIFT) & Self::EVAL_MASK) as u16 as i16 as Score,
            depth: ((data >> Self::DEPTH_SHIFT) & Self::DEPTH_MASK) as Depth,
            bound: Bound::from_u8(((data >> Self::BOUND_SHIFT) & Self::BOUND_MASK) as u8),
            is_pv: (data >> Self::PV_SHIFT) & 1 != 0,
            was_in_check: (data >> Self::CHECK_SHIFT) & 1 != 0,
            generation: ((data >> Self::GENERATION_SHIFT) & Self::GENERATION_MASK) as u8,
        }
    }

    /// Verified load. Returns the data word only when the key word
    /// matches both the probing hash and the data's own fold.
    #[inline]
    fn load(&self, key: u64) -> Option<u64> {
        let stored_key = self.key.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        if data != 0 && stored_key == (key & Self::KEY_HIGH_MASK) | Self::fold(data) {
            Some(data)
        } else {
            None
        }
    }

    #[inline]
    fn save(&self, key: u64, data: u64) {
        self.key.store((key & Self::KEY_HIGH_MASK) | Self::fold(data), Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }
}

/// Data stored in and retrieved from transposition table entries.
#[derive(Clone, Copy, Debug)]
pub struct TTData {
    /// Best move found during search; must be re-validated against the
    /// probing position before use.
    pub mv: Move,
    /// Search score, still in table encoding (mate scores relative to
    /// the storing node).
    pub score: Score,
    /// Static evaluation at the storing node.
    pub eval: Score,
    /// Search depth at which this position was evaluated. Quiescence
    /// entries store depth 0.
    pub depth: Depth,
    /// Bound type
    pub bound: Bound,
    /// Whether the storing node was on the principal variation
    pub is_pv: bool,
    /// Whether the side to move was in check at the storing node
    pub was_in_check: bool,
    /// Generation counter at the time of storing
    pub generation: u8,
}

impl TTData {
    /// Determines whether the stored score is usable for a cutoff
    /// against `beta` given its bound type.
    #[inline]
    pub fn should_cut(&self, beta: Score) -> bool {
        let bound = if self.score >= beta {
            Bound::Lower as u8
        } else {
            Bound::Upper as u8
        };
        (self.bound as u8 & bound) != 0
    }
}

/// The main transposition table structure.
pub struct TranspositionTable {
    entries: AVec<TTEntry, ConstAlign<32>>,
    mask: u64,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Initializes the table with the largest power-of-two entry count
    /// fitting in `mb_size` megabytes.
    pub fn new(mb_size: usize) -> Self {
        let entry_count = Self::entry_count_for(mb_size);
        TranspositionTable {
            entries: AVec::from_iter(32, (0..entry_count).map(|_| TTEntry::default())),
            mask: entry_count as u64 - 1,
            generation: AtomicU8::new(0),
        }
    }

    fn entry_count_for(mb_size: usize) -> usize {
        let bytes = mb_size.max(1) * 1024 * 1024;
        let count = bytes / mem::size_of::<TTEntry>();
        // Previous power of two keeps indexing a single mask.
        1 << (usize::BITS - 1 - count.leading_zeros())
    }

    /// Replaces the table with one of the new size, dropping all entries.
    pub fn resize(&mut self, mb_size: usize) {
        *self = TranspositionTable::new(mb_size);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Clears all entries in the transposition table.
    pub fn clear(&self) {
        for entry in self.entries.iter() {
            entry.key.store(0, Ordering::Relaxed);
            entry.data.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Advances the generation counter. Called once per `go` command;
    /// entries from earlier searches stay probeable but stop counting
    /// toward occupancy.
    pub fn new_search(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(current.wrapping_add(1) & TTEntry::GENERATION_MASK as u8, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Prefetches the entry for `key` into cache ahead of the probe.
    #[inline]
    pub fn prefetch(&self, key: u64) {
        cfg_if! {
            if #[cfg(target_arch = "x86_64")] {
                unsafe {
                    let index = (key & self.mask) as usize;
                    let addr = self.entries.as_ptr().add(index) as *const i8;
                    std::arch::x86_64::_mm_prefetch(addr, std::arch::x86_64::_MM_HINT_T0);
                }
            } else {
                let _ = key;
            }
        }
    }

    #[inline]
    pub fn probe(&self, key: u64) -> Option<TTData> {
        let index = (key & self.mask) as usize;
        self.entries[index].load(key).map(TTEntry::unpack)
    }

    /// Stores an entry, unconditionally replacing whatever occupied the
    /// slot.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        key: u64,
        mv: Move,
        score: Score,
        eval: Score,
        depth: Depth,
        bound: Bound,
        is_pv: bool,
        was_in_check: bool,
    ) {
        let index = (key & self.mask) as usize;
        let depth = depth.clamp(0, TTEntry::DEPTH_MASK as Depth) as u8;
        let data = TTEntry::pack(
            mv,
            score,
            eval,
            depth,
            bound,
            is_pv,
            was_in_check,
            self.generation(),
        );
        self.entries[index].save(key, data);
    }

    /// Collects up to `max_entries` verified entries at or above
    /// `min_depth` for export to cluster peers. The reconstructed key
    /// carries the stored high bits plus the slot index, which lands the
    /// entry in the same slot of any equally sized peer table.
    #[cfg(feature = "cluster")]
    pub fn export_batch(&self, min_depth: Depth, max_entries: usize) -> Vec<(u64, u64)> {
        let mut batch = Vec::with_capacity(max_entries);
        for (index, entry) in self.entries.iter().enumerate() {
            if batch.len() == max_entries {
                break;
            }
            let data = entry.data.load(Ordering::Relaxed);
            if data == 0 {
                continue;
            }
            let stored_key = entry.key.load(Ordering::Relaxed);
            if (stored_key as u32 as u64) != TTEntry::fold(data) {
                continue;
            }
            if TTEntry::unpack(data).depth < min_depth {
                continue;
            }
            batch.push(((stored_key & TTEntry::KEY_HIGH_MASK) | index as u64, data));
        }
        batch
    }

    /// Merges a peer entry, unconditionally overwriting the slot.
    #[cfg(feature = "cluster")]
    pub fn import_entry(&self, key: u64, data: u64) {
        let index = (key & self.mask) as usize;
        self.entries[index].save(key, data);
    }

    /// Estimated table occupancy in permille, sampled over the first
    /// thousand entries. Only current-generation entries count.
    pub fn hashfull(&self) -> usize {
        let current = self.generation();
        let sample = self.entries.len().min(1000);
        let used = self.entries[..sample]
            .iter()
            .filter(|entry| {
                let data = entry.data.load(Ordering::Relaxed);
                data != 0 && TTEntry::unpack(data).generation == current
            })
            .count();
        used * 1000 / sample
    }
}
