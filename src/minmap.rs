//! Bounded min-value map used by fixed-size SHARDS sampling.
//!
//! Keeps at most `capacity` `(score, key)` pairs with the smallest scores,
//! indexed both by key (hash map) and by `(score, key)` order (ordered set).
//! When full, inserting a score strictly below the current maximum expels the
//! pair holding that maximum; a score equal to the maximum is rejected.
//!
//! In the profiler the key is an object id and the score its seeded hash, so
//! the map materializes "the `capacity` objects with the smallest hashes seen
//! so far": the adaptive sample of fixed-size SHARDS.

use std::collections::BTreeSet;

use hashbrown::HashMap;

/// Bounded map of the smallest-scored keys.
#[derive(Debug, Clone, Default)]
pub struct MinValueMap {
    capacity: usize,
    set: BTreeSet<(u64, u64)>,
    map: HashMap<u64, u64>,
}

impl MinValueMap {
    /// Map holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            set: BTreeSet::new(),
            map: HashMap::with_capacity(capacity.min(1 << 20)),
        }
    }

    /// Number of held entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// True when nothing is held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// True once `capacity` entries are held.
    #[inline]
    pub fn full(&self) -> bool {
        self.set.len() >= self.capacity
    }

    /// True if `key` is currently held.
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.map.contains_key(&key)
    }

    /// Largest held score, or `None` when empty.
    #[inline]
    pub fn max_score(&self) -> Option<u64> {
        self.set.iter().next_back().map(|&(score, _)| score)
    }

    /// Offer `(key, score)`.
    ///
    /// - Held key: its score is updated in place, nothing is evicted.
    /// - Room left: the pair is inserted.
    /// - Full and `score` strictly below the maximum: the pair holding the
    ///   maximum is expelled and its key returned.
    /// - Otherwise the offer is rejected.
    pub fn insert(&mut self, key: u64, score: u64) -> Option<u64> {
        if let Some(old) = self.map.get_mut(&key) {
            let prev = *old;
            if prev != score {
                self.set.remove(&(prev, key));
                self.set.insert((score, key));
                *old = score;
            }
            return None;
        }
        if self.set.len() < self.capacity {
            self.map.insert(key, score);
            self.set.insert((score, key));
            return None;
        }
        let &(max_score, max_key) = self.set.iter().next_back()?;
        if score < max_score {
            self.set.remove(&(max_score, max_key));
            self.map.remove(&max_key);
            self.map.insert(key, score);
            self.set.insert((score, key));
            return Some(max_key);
        }
        None
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.set.clear();
        self.map.clear();
    }
}
