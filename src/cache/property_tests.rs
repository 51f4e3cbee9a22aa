//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check that the primary map and the expiry index stay in
//! step under arbitrary operation sequences.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{ExpiringCache, SweepContext};

// == Strategies ==
/// Small key space so puts, deletes and overwrites collide often
fn key_strategy() -> impl Strategy<Value = u8> {
    0u8..16
}

/// Offsets in seconds from "now"; a narrow range forces shared buckets
fn offset_strategy() -> impl Strategy<Value = i64> {
    -5i64..5
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u8, value: u32, offset: i64 },
    Delete { key: u8 },
    Evict,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<u32>(), offset_strategy())
            .prop_map(|(key, value, offset)| CacheOp::Put { key, value, offset }),
        2 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => Just(CacheOp::Evict),
    ]
}

/// Anchor far from the wall clock so the expired/live split is fixed per test
fn expiry_for(offset: i64) -> DateTime<Utc> {
    let anchor = if offset < 0 {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
    } else {
        Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap()
    };
    anchor + Duration::seconds(offset)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Every stored key sits in exactly the bucket of its current expiry and
    // no bucket is ever left empty.
    #[test]
    fn prop_index_stays_consistent(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let cache = ExpiringCache::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value, offset } => cache.put(key, value, expiry_for(offset)),
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Evict => {
                    cache.evict_expired_keys(&SweepContext::background());
                }
            }
            cache.assert_consistent();
        }
    }

    // The cache behaves like a plain map filtered by expiry, and a sweep
    // removes exactly the expired part of it.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let cache = ExpiringCache::new();
        let mut model: HashMap<u8, (u32, i64)> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value, offset } => {
                    cache.put(key, value, expiry_for(offset));
                    model.insert(key, (value, offset));
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.remove(&key).is_some());
                }
                CacheOp::Evict => {
                    let expected = model.values().filter(|(_, offset)| *offset < 0).count() as u64;
                    model.retain(|_, (_, offset)| *offset >= 0);
                    prop_assert_eq!(cache.evict_expired_keys(&SweepContext::background()), expected);
                }
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        for key in 0u8..16 {
            let expected = model
                .get(&key)
                .filter(|(_, offset)| *offset >= 0)
                .map(|(value, _)| *value);
            prop_assert_eq!(cache.get(&key), expected);
        }
    }

    // A sweep leaves no expired entries and never touches live ones,
    // whatever order they were inserted in.
    #[test]
    fn prop_sweep_splits_expired_from_live(
        offsets in prop::collection::vec(-50i64..50, 1..200)
    ) {
        let cache = ExpiringCache::new();
        for (i, offset) in offsets.iter().enumerate() {
            cache.put(i, *offset, expiry_for(*offset));
        }

        let expired = offsets.iter().filter(|offset| **offset < 0).count();
        let live_buckets = {
            let mut live: Vec<_> = offsets.iter().filter(|offset| **offset >= 0).collect();
            live.sort();
            live.dedup();
            live.len()
        };

        prop_assert_eq!(cache.evict_expired_keys(&SweepContext::background()), expired as u64);
        prop_assert_eq!(cache.len(), offsets.len() - expired);
        prop_assert_eq!(cache.bucket_count(), live_buckets);
        cache.assert_consistent();
    }
}
