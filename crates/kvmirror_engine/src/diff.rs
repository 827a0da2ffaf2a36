//! Sync-handler: computes the divergence diff against the authority belief.

use crate::error::SyncResult;
use crate::sync::Synchronizer;
use kvmirror_protocol::{ETag, KvSyncRequest, KvSyncResponse};
use kvmirror_store::{PayloadCodec, RecordStore};
use std::collections::BTreeMap;
use tracing::debug;

impl<P, S> Synchronizer<P, S>
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
{
    /// Reports local divergence from the authority's belief.
    ///
    /// Pure read, no mutation: one pass over a commit-consistent key → e-tag
    /// index classifies every key as `changed` (both sides, differing tags,
    /// local tag reported), `missing` (belief only, requested tag reported)
    /// or `additional` (local only, local tag reported). Keys with equal
    /// tags appear in none of the three.
    ///
    /// If an orphan policy hook is installed it is invoked with the
    /// `additional` keys; the hook observes only and its failures are
    /// isolated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Store`] if the snapshot read fails.
    pub fn handle_sync(&self, request: &KvSyncRequest) -> SyncResult<KvSyncResponse> {
        let local: BTreeMap<String, ETag> = self
            .store
            .load_all()?
            .into_iter()
            .map(|record| (record.key, record.e_tag))
            .collect();

        let mut response = KvSyncResponse::default();

        for (key, requested) in &request.kvs {
            match local.get(key) {
                Some(stored) if stored != requested => {
                    response.changed.insert(key.clone(), *stored);
                }
                Some(_) => {}
                None => {
                    response.missing.insert(key.clone(), *requested);
                }
            }
        }

        for (key, stored) in &local {
            if !request.kvs.contains_key(key) {
                response.additional.insert(key.clone(), *stored);
            }
        }

        debug!(
            service = %request.service,
            changed = response.changed.len(),
            missing = response.missing.len(),
            additional = response.additional.len(),
            "computed divergence diff"
        );

        let orphaned: Vec<String> = response.additional.keys().cloned().collect();
        self.notify_orphans(&orphaned);

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use kvmirror_store::{MemoryStore, VersionedRecord};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Unit;

    impl PayloadCodec for Unit {
        fn parse(_value: &serde_json::Value) -> Result<Self, String> {
            Ok(Unit)
        }
    }

    type Sync = Synchronizer<Unit, MemoryStore<Unit>>;

    fn synchronizer(rows: &[(&str, u64)]) -> Sync {
        let store = MemoryStore::new();
        store.seed(
            rows.iter()
                .map(|(key, e_tag)| VersionedRecord::new(*key, *e_tag, Unit)),
        );
        Synchronizer::new(Arc::new(store), SyncConfig::new("io", "r"))
    }

    fn belief(kvs: &[(&str, u64)]) -> KvSyncRequest {
        KvSyncRequest {
            service: "io".into(),
            kvs: kvs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn missing_key_reports_requested_tag() {
        // Local {"a": 1}, belief {"a": 1, "b": 2}.
        let sync = synchronizer(&[("a", 1)]);
        let response = sync.handle_sync(&belief(&[("a", 1), ("b", 2)])).unwrap();

        assert!(response.changed.is_empty());
        assert_eq!(response.missing.get("b"), Some(&2));
        assert_eq!(response.missing.len(), 1);
        assert!(response.additional.is_empty());
    }

    #[test]
    fn changed_key_reports_local_tag() {
        let sync = synchronizer(&[("a", 5)]);
        let response = sync.handle_sync(&belief(&[("a", 9)])).unwrap();

        assert_eq!(response.changed.get("a"), Some(&5));
        assert!(response.missing.is_empty());
        assert!(response.additional.is_empty());
    }

    #[test]
    fn additional_key_reports_local_tag() {
        let sync = synchronizer(&[("a", 1), ("extra", 7)]);
        let response = sync.handle_sync(&belief(&[("a", 1)])).unwrap();

        assert!(response.changed.is_empty());
        assert!(response.missing.is_empty());
        assert_eq!(response.additional.get("extra"), Some(&7));
    }

    #[test]
    fn equal_tags_appear_nowhere() {
        let sync = synchronizer(&[("a", 1), ("b", 2)]);
        let response = sync.handle_sync(&belief(&[("a", 1), ("b", 2)])).unwrap();
        assert!(response.is_in_sync());
    }

    #[test]
    fn diff_does_not_mutate_the_store() {
        let sync = synchronizer(&[("a", 1)]);
        sync.handle_sync(&belief(&[("b", 2)])).unwrap();

        assert_eq!(sync.store().len(), 1);
        assert_eq!(sync.store().get("a").unwrap().unwrap().e_tag, 1);
    }

    #[test]
    fn orphan_hook_receives_additional_keys() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let store = MemoryStore::new();
        store.seed([
            VersionedRecord::new("kept", 1, Unit),
            VersionedRecord::new("orphan", 2, Unit),
        ]);
        let sync: Sync = Synchronizer::new(Arc::new(store), SyncConfig::new("io", "r"))
            .with_orphan_hook(Box::new(move |keys| {
                sink.lock().extend(keys.iter().cloned());
            }));

        sync.handle_sync(&belief(&[("kept", 1)])).unwrap();
        assert_eq!(*seen.lock(), vec!["orphan".to_string()]);

        // No orphans: the hook is not invoked again.
        sync.handle_sync(&belief(&[("kept", 1), ("orphan", 2)]))
            .unwrap();
        assert_eq!(seen.lock().len(), 1);
    }
}
