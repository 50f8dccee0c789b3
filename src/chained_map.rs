//! ChainedHashMap: separate chaining over lazily created `Chain` buckets.

use crate::chain::Chain;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use thiserror::Error;

pub const DEFAULT_CAPACITY: usize = 16;
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// An operation was handed an absent key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("key must not be absent")]
pub struct InvalidKey;

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash: u64, // captured at insertion, reused on resize
    pub(crate) key: K,
    pub(crate) value: V,
}

pub(crate) type Bucket<K, V> = Option<Chain<Entry<K, V>>>;

/// Bucket for `hash` in a table of `capacity` slots.
///
/// The modulus is `capacity - 1`, so the last slot is never addressed once
/// `capacity > 1`. Stored data depends on this exact arithmetic; resizing
/// uses the same function against the new capacity.
#[inline]
pub(crate) fn bucket_index(hash: u64, capacity: usize) -> usize {
    if capacity == 1 {
        0
    } else {
        (hash % (capacity as u64 - 1)) as usize
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Box<[Bucket<K, V>]> {
    (0..capacity).map(|_| None).collect()
}

pub struct ChainedHashMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    buckets: Box<[Bucket<K, V>]>,
    len: usize,
    load_factor: f32,
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V> Default for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    /// A zero capacity is raised to one slot.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            buckets: empty_buckets(capacity.max(1)),
            len: 0,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }

    /// Replace the resize threshold ratio.
    ///
    /// # Panics
    /// If `load_factor` is not finite or not positive.
    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        assert!(
            load_factor.is_finite() && load_factor > 0.0,
            "load factor must be finite and positive, got {load_factor}"
        );
        self.load_factor = load_factor;
        self
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    #[cfg(test)]
    pub(crate) fn buckets_for_test(&self) -> &[Bucket<K, V>] {
        &self.buckets
    }

    /// Insert `key -> value`, or overwrite the value if `key` is present.
    /// Only a fresh insertion can grow the table.
    pub fn put(&mut self, key: K, value: V) {
        let hash = self.make_hash(&key);
        let idx = bucket_index(hash, self.capacity());
        let chain = self.buckets[idx].get_or_insert_with(Chain::new);
        if let Some(entry) = chain.find_mut(|e| e.hash == hash && e.key == key) {
            entry.value = value;
            return;
        }
        chain.append(Entry { hash, key, value });
        self.len += 1;
        if self.len as f64 >= self.capacity() as f64 * f64::from(self.load_factor) {
            self.resize();
        }
    }

    /// `None` when `key` is missing.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_entry(key).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let idx = bucket_index(hash, self.capacity());
        self.buckets[idx]
            .as_mut()?
            .find_mut(|e| e.hash == hash && e.key.borrow() == key)
            .map(|e| &mut e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_entry(key).is_some()
    }

    /// Drop the entry for `key` if present; a missing key is a no-op.
    pub fn remove<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let idx = bucket_index(hash, self.capacity());
        let Some(chain) = self.buckets[idx].as_mut() else {
            return;
        };
        if chain
            .remove_where(|e| e.hash == hash && e.key.borrow() == key)
            .is_some()
        {
            self.len -= 1;
        }
    }

    /// `put` for callers holding a possibly absent key.
    pub fn try_put(&mut self, key: Option<K>, value: V) -> Result<(), InvalidKey> {
        let key = key.ok_or(InvalidKey)?;
        self.put(key, value);
        Ok(())
    }

    pub fn try_get<Q>(&self, key: Option<&Q>) -> Result<Option<&V>, InvalidKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let key = key.ok_or(InvalidKey)?;
        Ok(self.get(key))
    }

    pub fn try_remove<Q>(&mut self, key: Option<&Q>) -> Result<(), InvalidKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let key = key.ok_or(InvalidKey)?;
        self.remove(key);
        Ok(())
    }

    fn find_entry<Q>(&self, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        self.buckets[bucket_index(hash, self.capacity())]
            .as_ref()?
            .find(|e| e.hash == hash && e.key.borrow() == key)
    }

    /// Double the bucket array and move every entry to its bucket under the
    /// new capacity. Uses stored hashes only; `K: Hash` is not invoked.
    fn resize(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let old = core::mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        for entry in old.into_vec().into_iter().flatten().flatten() {
            let idx = bucket_index(entry.hash, new_capacity);
            self.buckets[idx]
                .get_or_insert_with(Chain::new)
                .append(entry);
        }
        tracing::debug!(
            len = self.len,
            old_capacity,
            new_capacity,
            "resized bucket array"
        );
    }
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedHashMap")
            .field("len", &self.len)
            .field("capacity", &self.buckets.len())
            .field("load_factor", &self.load_factor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::hash::Hasher;
    use std::rc::Rc;

    // Hash code of a `u64` key is the key itself, making bucket placement
    // predictable in tests.
    #[derive(Clone, Default)]
    struct IdentityBuildHasher;
    #[derive(Default)]
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher::default()
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for b in bytes {
                self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(*b));
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    fn identity_map<V>() -> ChainedHashMap<u64, V, IdentityBuildHasher> {
        ChainedHashMap::with_hasher(IdentityBuildHasher)
    }

    fn chain_lens<K, V, S>(m: &ChainedHashMap<K, V, S>) -> Vec<usize> {
        m.buckets
            .iter()
            .map(|b| b.as_ref().map_or(0, |c| c.len()))
            .collect()
    }

    /// Invariant: `len` equals the sum of every chain's count.
    fn assert_len_matches_chains<K, V, S>(m: &ChainedHashMap<K, V, S>)
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        assert_eq!(chain_lens(m).iter().sum::<usize>(), m.len());
    }

    /// Invariant: capacity 1 always maps to slot 0; otherwise the modulus is
    /// `capacity - 1`.
    #[test]
    fn bucket_index_uses_capacity_minus_one() {
        assert_eq!(bucket_index(12345, 1), 0);
        assert_eq!(bucket_index(15, 16), 0);
        assert_eq!(bucket_index(16, 16), 1);
        assert_eq!(bucket_index(14, 16), 14);
        assert_eq!(bucket_index(u64::MAX, 2), 0);
    }

    /// Invariant: buckets are created lazily and the last slot stays unused.
    #[test]
    fn chains_created_lazily_and_last_slot_unreachable() {
        let mut m = identity_map();
        assert!(m.buckets.iter().all(Option::is_none));
        for k in 0..10u64 {
            m.put(k + 5, k);
        }
        assert_eq!(m.capacity(), 16);
        assert!(m.buckets[15].is_none());
        // 15 % 15 == 0, not slot 15
        m.put(15, 0);
        assert!(m.buckets[15].is_none());
        assert_eq!(m.buckets[0].as_ref().map(|c| c.len()), Some(1));
        assert_len_matches_chains(&m);
    }

    /// Invariant: keys congruent modulo `capacity - 1` share one chain, both
    /// stay retrievable, and removing one leaves the other intact.
    #[test]
    fn colliding_keys_share_chain() {
        let mut m = identity_map();
        m.put(1, "one");
        m.put(16, "sixteen");
        assert_eq!(chain_lens(&m)[1], 2);
        assert_eq!(m.get(&1), Some(&"one"));
        assert_eq!(m.get(&16), Some(&"sixteen"));

        m.remove(&1);
        assert_eq!(m.get(&1), None);
        assert_eq!(m.get(&16), Some(&"sixteen"));
        assert_eq!(chain_lens(&m)[1], 1);
        assert_len_matches_chains(&m);
    }

    /// Invariant: the table doubles exactly when len reaches
    /// `capacity * load_factor` after a fresh insertion.
    #[test]
    fn resize_triggers_at_threshold() {
        let mut m = identity_map();
        for k in 0..11u64 {
            m.put(k, k);
        }
        assert_eq!(m.capacity(), 16);
        m.put(11, 11);
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.len(), 12);
        for k in 0..12u64 {
            assert_eq!(m.get(&k), Some(&k));
        }
        assert_len_matches_chains(&m);
    }

    /// Invariant: an update never counts toward the threshold.
    #[test]
    fn update_does_not_resize() {
        let mut m = identity_map();
        for k in 0..11u64 {
            m.put(k, 0);
        }
        for _ in 0..5 {
            m.put(3, 1);
        }
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.len(), 11);
        assert_eq!(m.get(&3), Some(&1));
    }

    /// Invariant: after a resize every entry sits in the bucket computed
    /// from its stored hash against the new capacity.
    #[test]
    fn resize_places_entries_by_stored_hash() {
        let mut m = identity_map();
        for k in 0..40u64 {
            m.put(k * 7, k);
        }
        let cap = m.capacity();
        assert!(cap > 16);
        for (i, b) in m.buckets.iter().enumerate() {
            if let Some(chain) = b {
                for e in chain.iter() {
                    assert_eq!(e.hash, e.key);
                    assert_eq!(bucket_index(e.hash, cap), i);
                }
            }
        }
        assert!(m.buckets[cap - 1].is_none());
        assert_len_matches_chains(&m);
    }

    /// Invariant: a zero capacity is raised to one and the table still works,
    /// growing by doubling.
    #[test]
    fn zero_capacity_becomes_one() {
        let mut m: ChainedHashMap<u64, u64> = ChainedHashMap::with_capacity(0);
        assert_eq!(m.capacity(), 1);
        m.put(1, 1);
        assert_eq!(m.capacity(), 2);
        m.put(2, 2);
        assert_eq!(m.capacity(), 4);
        assert_eq!(m.get(&1), Some(&1));
        assert_eq!(m.get(&2), Some(&2));
    }

    /// Invariant: a custom load factor moves the threshold.
    #[test]
    fn custom_load_factor_threshold() {
        let mut m = identity_map().with_load_factor(0.5);
        for k in 0..7u64 {
            m.put(k, ());
        }
        assert_eq!(m.capacity(), 16);
        m.put(7, ());
        assert_eq!(m.capacity(), 32);
    }

    #[test]
    #[should_panic(expected = "load factor must be finite and positive")]
    fn non_positive_load_factor_panics() {
        let _ = identity_map::<()>().with_load_factor(0.0);
    }

    /// Invariant: absent keys are rejected before any mutation.
    #[test]
    fn absent_keys_rejected_without_mutation() {
        let mut m = identity_map();
        m.put(1, "one");
        assert_eq!(m.try_put(None, "x"), Err(InvalidKey));
        assert_eq!(m.try_get::<u64>(None), Err(InvalidKey));
        assert_eq!(m.try_remove::<u64>(None), Err(InvalidKey));
        assert_eq!(m.len(), 1);
        assert_eq!(chain_lens(&m).iter().sum::<usize>(), 1);
        assert_eq!(m.try_get(Some(&1)), Ok(Some(&"one")));
    }

    /// Invariant: removing from an existing chain that lacks the key leaves
    /// len and the chain unchanged.
    #[test]
    fn remove_missing_from_populated_chain() {
        let mut m = identity_map();
        m.put(2, ());
        m.remove(&17); // same bucket as 2
        assert_eq!(m.len(), 1);
        assert_eq!(chain_lens(&m)[2], 1);
    }

    // Key that records every `Hash` and `Eq` call made on it.
    #[derive(Clone)]
    struct CountingKey {
        id: u64,
        hashes: Rc<Cell<usize>>,
        eqs: Rc<Cell<usize>>,
    }
    impl Hash for CountingKey {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.hashes.set(self.hashes.get() + 1);
            self.id.hash(state);
        }
    }
    impl PartialEq for CountingKey {
        fn eq(&self, other: &Self) -> bool {
            self.eqs.set(self.eqs.get() + 1);
            self.id == other.id
        }
    }
    impl Eq for CountingKey {}

    /// Invariant: each put hashes its key exactly once and resizing reuses the
    /// stored hashes; keys whose hashes differ are never compared with `Eq`.
    #[test]
    fn resize_reuses_stored_hash_and_hash_check_precedes_eq() {
        let hashes = Rc::new(Cell::new(0));
        let eqs = Rc::new(Cell::new(0));
        let key = |id| CountingKey {
            id,
            hashes: hashes.clone(),
            eqs: eqs.clone(),
        };
        let mut m = ChainedHashMap::with_hasher(IdentityBuildHasher);

        // 16 shares bucket 1 with 1 at capacity 16, different hashes
        for id in [1, 16, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11] {
            m.put(key(id), id);
        }
        assert_eq!(m.capacity(), 32, "twelfth put resizes");
        assert_eq!(hashes.get(), 12);
        assert_eq!(eqs.get(), 0);

        // 32 shares bucket 1 with 1 at capacity 32 (modulus 31)
        assert_eq!(m.get(&key(32)), None);
        assert_eq!(hashes.get(), 13);
        assert_eq!(eqs.get(), 0);

        // equal hash: equality decides, once
        m.put(key(1), 100);
        assert_eq!(hashes.get(), 14);
        assert_eq!(eqs.get(), 1);
        assert_eq!(m.get(&key(1)), Some(&100));
        assert_eq!(eqs.get(), 2);
        assert_eq!(m.len(), 12);
    }

    #[test]
    fn debug_reports_shape() {
        let mut m = identity_map();
        m.put(1, 1);
        let s = format!("{m:?}");
        assert!(s.contains("len: 1"));
        assert!(s.contains("capacity: 16"));
    }
}
