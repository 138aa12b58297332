//! Property-Based Tests for the LRU Module
//!
//! Uses proptest to check capacity accounting and eviction order.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::lru::{LruManager, RecencyIndex};
use crate::store::Store;
use crate::stores::MemStore;

// == Test Configuration ==
const TEST_CAPACITY: i64 = 200;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..80)
}

#[derive(Debug, Clone)]
enum LruOp {
    Put { key: String, value: Vec<u8> },
    Get { key: String },
    Del { key: String },
}

fn lru_op_strategy() -> impl Strategy<Value = LruOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy()).prop_map(|(key, value)| LruOp::Put { key, value }),
        1 => key_strategy().prop_map(|key| LruOp::Get { key }),
        1 => key_strategy().prop_map(|key| LruOp::Del { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Tracked bytes plus remaining capacity always equal the configured total,
    // and the wrapped store never holds a key the index forgot about.
    #[test]
    fn prop_capacity_accounting(ops in prop::collection::vec(lru_op_strategy(), 1..60)) {
        tokio_test::block_on(async {
            let mem = Arc::new(MemStore::new());
            let lru = LruManager::new(TEST_CAPACITY, mem.clone());
            let ctx = Context::background();

            for op in ops {
                match op {
                    LruOp::Put { key, value } => lru.put(&ctx, &key, &value).await.unwrap(),
                    LruOp::Get { key } => { lru.get(&ctx, &key).await.unwrap(); }
                    LruOp::Del { key } => lru.del(&ctx, &key).await.unwrap(),
                }
                assert_eq!(lru.tracked_bytes() + lru.capacity(), TEST_CAPACITY);
            }

            assert_eq!(mem.len(), lru.num_items());
        });
    }

    // After pruning, whatever survives is at least as recent as whatever was
    // evicted.
    #[test]
    fn prop_eviction_is_lru(sizes in prop::collection::vec(1usize..40, 2..30)) {
        tokio_test::block_on(async {
            let mem = Arc::new(MemStore::new());
            let lru = LruManager::new(TEST_CAPACITY, mem.clone());
            let ctx = Context::background();

            for (i, size) in sizes.iter().enumerate() {
                lru.put(&ctx, &format!("k{i}"), &vec![1u8; *size]).await.unwrap();
            }

            let alive: Vec<usize> = (0..sizes.len())
                .filter(|i| mem.contains(&format!("k{i}")))
                .collect();
            if let Some(first_alive) = alive.first() {
                prop_assert!(alive.iter().copied().eq(*first_alive..sizes.len()));
            }
            Ok(())
        })?;
    }

    // The index's size ledger agrees with a plain map model.
    #[test]
    fn prop_index_matches_model(ops in prop::collection::vec((key_strategy(), 0i64..50), 1..80)) {
        let mut index = RecencyIndex::new();
        let mut model: HashMap<String, i64> = HashMap::new();

        for (key, size) in ops {
            let previous = index.touch(&key, size);
            prop_assert_eq!(previous, model.insert(key, size));
        }

        prop_assert_eq!(index.len(), model.len());
        prop_assert_eq!(index.total_size(), model.values().sum::<i64>());
    }
}
