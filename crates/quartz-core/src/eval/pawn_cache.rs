use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Score;

const KEY_MASK: u64 = 0xFFFFFFFFFFFF;
const SCORE_MASK: u64 = 0xFFFF;
const SCORE_BITS: u32 = 16;

/// Hash table caching pawn structure scores, keyed by the pawn/king hash.
/// Bit layout of each entry (AtomicU64):
/// - key:        48 bits (bit position 16-63)
/// - score:      16 bits (bit position 0-15) 2's complement signed integer
///
/// Entries are single words, so concurrent readers can never observe a
/// torn key/score pair.
pub struct PawnCache {
    table: Box<[AtomicU64]>,
    mask: u64,
}

impl PawnCache {
    /// `size` is log2 of the number of entries.
    pub fn new(size: u32) -> Self {
        let size = 1 << size;
        let mask = size as u64 - 1;

        let mut table = Vec::with_capacity(size);
        for _ in 0..size {
            table.push(AtomicU64::new(0));
        }

        PawnCache {
            table: table.into_boxed_slice(),
            mask,
        }
    }

    pub fn store(&self, key: u64, score: Score) {
        let index = self.index(key);
        let value = Self::pack(key, score);
        self.table[index].store(value, Ordering::Relaxed);
    }

    /// Returns the cached score when the stored key matches exactly.
    pub fn probe(&self, key: u64) -> Option<Score> {
        let index = self.index(key);
        let entry = self.table[index].load(Ordering::Relaxed);

        if entry == 0 {
            return None;
        }

        let (entry_key, score) = Self::unpack(entry);
        if entry_key == key & KEY_MASK {
            Some(score)
        } else {
            None
        }
    }

    pub fn clear(&self) {
        for entry in self.table.iter() {
            entry.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key.rotate_left(SCORE_BITS) & self.mask) as usize
    }

    #[inline]
    fn pack(key: u64, score: Score) -> u64 {
        let key_bits = (key & KEY_MASK) << SCORE_BITS;
        let score_bits = score as u64 & SCORE_MASK;

        key_bits | score_bits
    }

    #[inline]
    fn unpack(value: u64) -> (u64, Score) {
        let key = value >> SCORE_BITS;
        let score = (value & SCORE_MASK) as u16 as i16 as Score;

        (key, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_probe() {
        let cache = PawnCache::new(8);
        cache.store(0xDEAD_BEEF_1234, 42);
        assert_eq!(cache.probe(0xDEAD_BEEF_1234), Some(42));
        assert_eq!(cache.probe(0xDEAD_BEEF_5678), None);
    }

    #[test]
    fn test_negative_scores_round_trip() {
        let cache = PawnCache::new(8);
        cache.store(0x1111, -250);
        assert_eq!(cache.probe(0x1111), Some(-250));
        cache.store(0x2222, -1);
        assert_eq!(cache.probe(0x2222), Some(-1));
    }

    #[test]
    fn test_colliding_keys_overwrite() {
        let cache = PawnCache::new(4);
        // Same slot, different high key bits.
        let a = 0x0000_0000_0001;
        let b = a | (1 << 40);
        cache.store(a, 10);
        cache.store(b, 20);
        assert_eq!(cache.probe(a), None);
        assert_eq!(cache.probe(b), Some(20));
    }

    #[test]
    fn test_clear() {
        let cache = PawnCache::new(4);
        cache.store(0x3333, 7);
        cache.clear();
        assert_eq!(cache.probe(0x3333), None);
    }
}
