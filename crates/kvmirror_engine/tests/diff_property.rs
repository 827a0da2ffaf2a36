//! Property tests for the divergence diff.

use kvmirror_engine::{SyncConfig, Synchronizer};
use kvmirror_protocol::{ETag, KvSyncRequest};
use kvmirror_store::{MemoryStore, PayloadCodec, VersionedRecord};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Unit;

impl PayloadCodec for Unit {
    fn parse(_value: &serde_json::Value) -> Result<Self, String> {
        Ok(Unit)
    }
}

fn tags() -> impl Strategy<Value = BTreeMap<String, ETag>> {
    // A handful of keys and tags keeps the intersection interesting.
    prop::collection::btree_map("[a-f]", 1u64..6, 0..10)
}

proptest! {
    #[test]
    fn diff_classifies_every_key_exactly_once(belief in tags(), local in tags()) {
        let store = MemoryStore::new();
        store.seed(
            local
                .iter()
                .map(|(key, e_tag)| VersionedRecord::new(key.clone(), *e_tag, Unit)),
        );
        let sync = Synchronizer::new(Arc::new(store), SyncConfig::new("io", "r"));

        let response = sync
            .handle_sync(&KvSyncRequest {
                service: "io".into(),
                kvs: belief.clone(),
            })
            .unwrap();

        let expected_changed: BTreeMap<String, ETag> = belief
            .iter()
            .filter_map(|(key, requested)| match local.get(key) {
                Some(stored) if stored != requested => Some((key.clone(), *stored)),
                _ => None,
            })
            .collect();
        let expected_missing: BTreeMap<String, ETag> = belief
            .iter()
            .filter(|(key, _)| !local.contains_key(*key))
            .map(|(key, requested)| (key.clone(), *requested))
            .collect();
        let expected_additional: BTreeMap<String, ETag> = local
            .iter()
            .filter(|(key, _)| !belief.contains_key(*key))
            .map(|(key, stored)| (key.clone(), *stored))
            .collect();

        prop_assert_eq!(&response.changed, &expected_changed);
        prop_assert_eq!(&response.missing, &expected_missing);
        prop_assert_eq!(&response.additional, &expected_additional);

        // Keys agreeing on both sides appear in none of the three maps.
        for (key, requested) in &belief {
            if local.get(key) == Some(requested) {
                prop_assert!(!response.changed.contains_key(key));
                prop_assert!(!response.missing.contains_key(key));
                prop_assert!(!response.additional.contains_key(key));
            }
        }
    }

    #[test]
    fn diff_of_identical_sides_is_in_sync(side in tags()) {
        let store = MemoryStore::new();
        store.seed(
            side.iter()
                .map(|(key, e_tag)| VersionedRecord::new(key.clone(), *e_tag, Unit)),
        );
        let sync = Synchronizer::new(Arc::new(store), SyncConfig::new("io", "r"));

        let response = sync
            .handle_sync(&KvSyncRequest {
                service: "io".into(),
                kvs: side,
            })
            .unwrap();

        prop_assert!(response.is_in_sync());
    }
}
