#![cfg(test)]

// Model-based property tests for ChainedHashMap kept inside the crate so
// they can inspect bucket placement directly.

use crate::chained_map::{bucket_index, ChainedHashMap};
use proptest::prelude::*;
use std::collections::HashMap;
use std::hash::BuildHasher;

// Key pool indices shrink toward earlier keys; op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Missing(String),
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<Op>)> {
    (
        0usize..=8,
        proptest::collection::vec("[a-z]{0,4}", 1..=24),
    )
        .prop_flat_map(|(cap, pool)| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Put(i, v)),
                2 => idx.clone().prop_map(Op::Remove),
                2 => idx.prop_map(Op::Get),
                1 => "[A-Z]{1,3}".prop_map(Op::Missing),
            ];
            (
                Just(cap),
                Just(pool),
                proptest::collection::vec(op, 1..120),
            )
        })
}

fn check_structure<S: BuildHasher>(
    m: &ChainedHashMap<String, i32, S>,
) -> Result<(), TestCaseError> {
    // every stored hash lands where the indexing function says
    let cap = m.capacity();
    let mut total = 0;
    for (i, b) in m.buckets_for_test().iter().enumerate() {
        if let Some(chain) = b {
            total += chain.len();
            for e in chain.iter() {
                prop_assert_eq!(bucket_index(e.hash, cap), i);
            }
        }
    }
    prop_assert_eq!(total, m.len());
    if cap > 1 {
        prop_assert!(m.buckets_for_test()[cap - 1].is_none());
    }
    prop_assert!(m.len() as f64 <= cap as f64 * f64::from(m.load_factor()));
    Ok(())
}

proptest! {
    #[test]
    fn prop_matches_std_hashmap((cap, pool, ops) in arb_scenario()) {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::with_capacity(cap);
        let mut model: HashMap<String, i32> = HashMap::new();
        let mut last_cap = m.capacity();

        for op in ops {
            match op {
                Op::Put(i, v) => {
                    m.put(pool[i].clone(), v);
                    model.insert(pool[i].clone(), v);
                    for (k, v) in &model {
                        prop_assert_eq!(m.get(k), Some(v));
                    }
                }
                Op::Remove(i) => {
                    m.remove(pool[i].as_str());
                    model.remove(&pool[i]);
                    prop_assert_eq!(m.get(pool[i].as_str()), None);
                }
                Op::Get(i) => {
                    prop_assert_eq!(m.get(pool[i].as_str()), model.get(&pool[i]));
                    prop_assert_eq!(m.contains_key(pool[i].as_str()), model.contains_key(&pool[i]));
                }
                Op::Missing(s) => {
                    // pool keys are lowercase only
                    prop_assert_eq!(m.get(&s), None);
                    let before = m.len();
                    m.remove(&s);
                    prop_assert_eq!(m.len(), before);
                }
            }
            prop_assert_eq!(m.len(), model.len());
            prop_assert!(m.capacity() >= last_cap, "capacity never shrinks");
            prop_assert!(m.capacity() == last_cap || m.capacity() == last_cap * 2);
            last_cap = m.capacity();
            check_structure(&m)?;
        }
    }

    #[test]
    fn prop_update_keeps_len((pool, vals) in (
        proptest::collection::hash_set("[a-z]{1,6}", 1..40),
        proptest::collection::vec(any::<i32>(), 1..5),
    )) {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        for v in &vals {
            for k in &pool {
                m.put(k.clone(), *v);
            }
            prop_assert_eq!(m.len(), pool.len());
        }
        let last = *vals.last().unwrap();
        for k in &pool {
            prop_assert_eq!(m.get(k.as_str()), Some(&last));
        }
    }
}
