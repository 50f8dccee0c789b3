//! chained-hashmap: a single-threaded, separate-chaining map whose buckets
//! are singly linked chains.
//!
//! Internal Design:
//!
//! Summary
//! - Layers:
//!   - Chain<T>: insertion-ordered singly linked sequence with tail
//!     append, first-match removal, and a forward-only cursor.
//!   - ChainedHashMap<K, V, S>: fixed-length array of optional chains,
//!     an entry count, and a load-factor threshold that triggers a full
//!     redistribution into a doubled array.
//!
//! Constraints
//! - Single-threaded and unsynchronized; mutation requires `&mut`.
//! - Unique keys: `put` on a present key overwrites its value in place.
//! - Capacity only grows, always by doubling. There is no shrinking and
//!   no iteration over the map itself.
//! - Chains are created on first insertion into a bucket and are never
//!   dropped individually; a resize replaces the whole array.
//!
//! Indexing
//! - `index = 0` when capacity is 1, else `hash % (capacity - 1)`. The
//!   last slot is therefore never used. Insertion, lookup, removal and
//!   resize all use the same function, so entries stay reachable.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its `u64` hash, taken once at insertion. Lookups
//!   compare stored hashes before keys; resizing reuses stored hashes and
//!   never calls `K: Hash`.
//!
//! Chain storage
//! - Nodes live in a per-chain `SlotMap`; links are generational keys, so
//!   the chain needs no unsafe pointer juggling and stale links cannot
//!   alias recycled nodes.
//!
//! Absent keys
//! - Keys cannot be null in safe Rust. Callers holding an optional key use
//!   `try_put`/`try_get`/`try_remove`, which fail with `InvalidKey` before
//!   touching the structure.
//!
//! Absent values
//! - Use `V = Option<T>` to store absent values. `get` then returns
//!   `Some(&None)` for such an entry; flattening that result loses the
//!   distinction from a missing key, and `contains_key` recovers it.

pub mod chain;
pub mod chained_map;
mod chained_map_proptest;

// Public surface
pub use chain::{Chain, ExhaustedIteration, IntoIter, Iter};
pub use chained_map::{ChainedHashMap, InvalidKey};
