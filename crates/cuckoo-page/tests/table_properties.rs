#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Property tests for cuckoo table operations
//!
//! Each case binds fresh 8 MiB pages, so case counts are kept low.

use cuckoo_page::{CuckooTable, InsertStatus, MAX_VALUE, RemoveStatus, new_buffer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn config() -> ProptestConfig {
    ProptestConfig::with_cases(24)
}

/// Distinct keys paired with storable values.
fn associations(max: usize) -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::btree_map(any::<u64>(), 1u64..=MAX_VALUE, 1..max)
        .prop_map(|map| map.into_iter().collect())
}

/// Keys confined to a handful of buckets in both sub-tables, forcing
/// displacement chains.
fn crowded_keys(max: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::btree_set(
        (0u64..4, 0u64..4, any::<u32>())
            .prop_map(|(first, second, tag)| (u64::from(tag) << 32) | (second << 16) | first),
        1..max,
    )
    .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn inserted_values_are_found(pairs in associations(300)) {
        let mut words = new_buffer();
        let mut table = CuckooTable::new(&mut *words).unwrap();

        for &(key, value) in &pairs {
            prop_assert_eq!(table.insert(key, value).unwrap(), InsertStatus::Inserted);
        }
        for &(key, value) in &pairs {
            prop_assert_eq!(table.lookup(key), vec![value]);
        }
        prop_assert_eq!(table.len(), pairs.len());
    }

    #[test]
    fn removed_values_are_gone(pairs in associations(200), keep in any::<prop::sample::Index>()) {
        let mut words = new_buffer();
        let mut table = CuckooTable::new(&mut *words).unwrap();
        for &(key, value) in &pairs {
            table.insert(key, value).unwrap();
        }

        let kept = keep.index(pairs.len());
        for (i, &(key, value)) in pairs.iter().enumerate() {
            if i != kept {
                prop_assert_eq!(table.remove(key, value).unwrap(), RemoveStatus::Removed);
                prop_assert!(table.lookup(key).is_empty());
            }
        }

        let (key, value) = pairs[kept];
        prop_assert_eq!(table.lookup(key), vec![value]);
        prop_assert_eq!(table.len(), 1);
    }

    #[test]
    fn displacement_never_loses_associations(keys in crowded_keys(120)) {
        let mut words = new_buffer();
        let mut table = CuckooTable::new(&mut *words).unwrap();

        let mut attempted = Vec::new();
        for (i, &key) in keys.iter().enumerate() {
            let value = i as u64 + 1;
            attempted.push((key, value));
            if table.insert(key, value).unwrap() == InsertStatus::Full {
                break;
            }
        }

        let overflow = table.overflow();
        for &(key, value) in &attempted {
            let found = table.lookup(key).contains(&value);
            let held = overflow == Some((key, value));
            prop_assert!(found != held, "{key:#x} found={found} held={held}");
        }
        prop_assert_eq!(table.len(), attempted.len());
    }

    #[test]
    fn split_preserves_content_and_order(pairs in associations(300)) {
        let mut source = new_buffer();
        let mut lower_words = new_buffer();
        let mut upper_words = new_buffer();

        let mut table = CuckooTable::new(&mut *source).unwrap();
        for &(key, value) in &pairs {
            table.insert(key, value).unwrap();
        }

        let mut lower = CuckooTable::new(&mut *lower_words).unwrap();
        let mut upper = CuckooTable::new(&mut *upper_words).unwrap();
        let divider = table.split(&mut lower, &mut upper).unwrap();
        let boundary = (divider.key, divider.value);

        let n = pairs.len();
        prop_assert_eq!(lower.len(), n / 2);
        prop_assert_eq!(upper.len(), n - n / 2);
        prop_assert!(lower.iter().all(|pair| pair < boundary));
        prop_assert!(upper.iter().all(|pair| pair >= boundary));
        prop_assert_eq!(upper.lookup(divider.key), vec![divider.value]);

        let original: BTreeSet<_> = pairs.iter().copied().collect();
        let combined: BTreeSet<_> = lower.iter().chain(upper.iter()).collect();
        prop_assert_eq!(combined, original);
        prop_assert_eq!(table.len(), n);
    }
}

#[test]
fn fills_to_full_under_random_load() {
    let mut words = new_buffer();
    let mut table = CuckooTable::new(&mut *words).unwrap();

    // Low 32 bits from a multiplicative sequence spread keys over buckets.
    let mut inserted = 0usize;
    let mut key = 0u64;
    loop {
        key = key.wrapping_add(0x9E37_79B9_7F4A_7C15);
        match table.insert(key, 1).unwrap() {
            InsertStatus::Inserted => inserted += 1,
            InsertStatus::Full => break,
        }
        assert!(inserted <= cuckoo_page::TABLE_CAPACITY, "never reported full");
    }

    assert!(table.is_full());
    assert_eq!(table.len(), inserted + 1);
    assert!(table.insert(key.wrapping_add(1), 1).is_err());

    let stats = table.stats();
    assert_eq!(stats.resident(), inserted);
    assert!(stats.load_factor() > 0.5, "load factor {}", stats.load_factor());
}
