//! Hash sets of small integer tuples with stable insertion slots.
//!
//! The simulation partitioner stores its incidence relations between blocks and labels
//! in these sets. Besides ordinary membership queries,
//! it needs to walk over all tuples that were inserted between two points in time.
//! Entries are therefore kept in a flat storage vector in insertion order,
//! and the hash table only holds chains of indices into that vector.
//! A caller that records [`position()`](TupleSet::position) before and after
//! inserting a group of tuples can later iterate exactly that group with
//! [`range()`](TupleSet::range), similar to a row of a CSR matrix.

use std::fmt;
use std::iter::FusedIterator;

/// Set of 3-tuples, e.g. `(block, label, block)`.
pub type TripleSet = TupleSet<3>;
/// Set of 2-tuples.
pub type PairSet = TupleSet<2>;

// Odd multipliers for the components of a tuple, one per position.
const HASH_WEIGHTS: [usize; 4] = [0x9e37_79b1, 0x85eb_ca77, 0xc2b2_ae3d, 0x27d4_eb2f];

#[derive(Debug, Clone, Copy)]
struct Slot<const N: usize> {
    key: [usize; N],
    // Next slot in the same bucket chain
    next: Option<usize>,
    removed: bool,
}

/// Set of `N`-tuples of `usize` with amortized O(1) insertion, lookup and removal.
///
/// Removing a tuple only marks its slot as a tombstone, the storage is not reclaimed
/// until the set is cleared. Tombstones are skipped by all iterators and are dropped from
/// the bucket chains whenever the table grows.
#[derive(Clone)]
pub struct TupleSet<const N: usize> {
    slots: Vec<Slot<N>>,
    table: Vec<Option<usize>>,
    removed: usize,
}

impl<const N: usize> TupleSet<N> {
    /// Number of hash buckets allocated by [`new()`](TupleSet::new).
    pub const INITIAL_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::INITIAL_CAPACITY)
    }

    /// Create an empty set with at least `capacity` buckets.
    /// The bucket count is always rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        TupleSet {
            slots: Vec::new(),
            table: vec![None; capacity.max(1).next_power_of_two()],
            removed: 0,
        }
    }

    /// Number of tuples in the set, not counting removed ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len() - self.removed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of storage slots handed out since the last [`clear()`](TupleSet::clear),
    /// including those of removed tuples.
    ///
    /// The next inserted tuple will occupy exactly this slot.
    #[inline]
    pub fn position(&self) -> usize {
        self.slots.len()
    }

    /// Number of hash buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    #[inline]
    fn bucket(&self, key: &[usize; N]) -> usize {
        let mut h: usize = 0;
        for (i, &k) in key.iter().enumerate() {
            h = h.wrapping_add(k.wrapping_mul(HASH_WEIGHTS[i % HASH_WEIGHTS.len()]));
        }
        h ^= h >> 15;
        h = h.wrapping_mul(0x2c1b_3c6d);
        h ^= h >> 12;
        h & (self.table.len() - 1)
    }

    fn find_slot(&self, key: &[usize; N]) -> Option<usize> {
        let mut cursor = self.table[self.bucket(key)];
        while let Some(idx) = cursor {
            let slot = &self.slots[idx];
            if slot.key == *key {
                return Some(idx);
            }
            cursor = slot.next;
        }
        None
    }

    /// Returns `true` if `key` is in the set.
    #[inline]
    pub fn contains(&self, key: [usize; N]) -> bool {
        self.find_slot(&key).is_some()
    }

    /// Add `key` to the set. Does nothing if it is already present.
    ///
    /// Returns `true` if the tuple was newly inserted.
    pub fn insert(&mut self, key: [usize; N]) -> bool {
        if self.find_slot(&key).is_some() {
            return false;
        }
        if 4 * self.len() >= 3 * self.table.len() {
            self.grow();
        }
        let bucket = self.bucket(&key);
        let idx = self.slots.len();
        self.slots.push(Slot {
            key,
            next: self.table[bucket],
            removed: false,
        });
        self.table[bucket] = Some(idx);
        true
    }

    /// Remove `key` from the set.
    ///
    /// Returns `true` if the tuple was present.
    pub fn remove(&mut self, key: [usize; N]) -> bool {
        let bucket = self.bucket(&key);
        let mut prev: Option<usize> = None;
        let mut cursor = self.table[bucket];
        while let Some(idx) = cursor {
            if self.slots[idx].key == key {
                let next = self.slots[idx].next;
                match prev {
                    Some(p) => self.slots[p].next = next,
                    None => self.table[bucket] = next,
                }
                let slot = &mut self.slots[idx];
                slot.next = None;
                slot.removed = true;
                self.removed += 1;
                return true;
            }
            prev = cursor;
            cursor = self.slots[idx].next;
        }
        false
    }

    /// Remove all tuples. Keeps the bucket table, so capacity is not lost.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.table.fill(None);
        self.removed = 0;
    }

    // Double the bucket table and relink all live slots.
    fn grow(&mut self) {
        let new_len = (self.table.len() * 2).next_power_of_two();
        self.table = vec![None; new_len];
        for idx in 0..self.slots.len() {
            if self.slots[idx].removed {
                continue;
            }
            let bucket = self.bucket(&self.slots[idx].key);
            self.slots[idx].next = self.table[bucket];
            self.table[bucket] = Some(idx);
        }
    }

    /// Iterate over all tuples in insertion order.
    pub fn iter(&self) -> Iter<'_, N> {
        self.range(0, self.slots.len())
    }

    /// Iterate over the tuples stored in slots `start .. end`, in insertion order.
    /// Removed tuples are skipped.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > self.position()`.
    pub fn range(&self, start: usize, end: usize) -> Iter<'_, N> {
        Iter {
            slots: self.slots[start..end].iter(),
        }
    }
}

impl<const N: usize> Default for TupleSet<N> {
    fn default() -> Self {
        TupleSet::new()
    }
}

impl<const N: usize> fmt::Debug for TupleSet<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, const N: usize> IntoIterator for &'a TupleSet<N> {
    type Item = [usize; N];
    type IntoIter = Iter<'a, N>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a contiguous range of storage slots of a [`TupleSet`].
#[derive(Debug, Clone)]
pub struct Iter<'a, const N: usize> {
    slots: std::slice::Iter<'a, Slot<N>>,
}

impl<'a, const N: usize> Iterator for Iter<'a, N> {
    type Item = [usize; N];

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref()
            .find(|slot| !slot.removed)
            .map(|slot| slot.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

impl<'a, const N: usize> FusedIterator for Iter<'a, N> {}
