//! In-memory record store.

use crate::error::{StoreError, StoreResult};
use crate::record::{PayloadCodec, VersionedRecord};
use crate::store::{RecordStore, RecordTxn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory record store with staged transactions.
///
/// Suitable for unit and integration tests, and for hosts that do not need
/// their mirror to survive a restart (the authority re-pushes everything on
/// reconnect anyway).
///
/// # Thread Safety
///
/// All access goes through one mutex, held for the whole transaction; a
/// transaction therefore observes and commits against a consistent snapshot.
pub struct MemoryStore<P> {
    rows: Mutex<BTreeMap<String, VersionedRecord<P>>>,
    fail_commits: AtomicBool,
}

impl<P: PayloadCodec> MemoryStore<P> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Writes records directly, bypassing transaction bookkeeping.
    ///
    /// Useful for seeding test fixtures.
    pub fn seed(&self, records: impl IntoIterator<Item = VersionedRecord<P>>) {
        let mut rows = self.rows.lock();
        for record in records {
            rows.insert(record.key.clone(), record);
        }
    }

    /// Returns the number of committed rows.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Returns true if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Makes every subsequent commit fail with a backend error.
    ///
    /// Simulates transaction-level persistence failure in tests.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl<P: PayloadCodec> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryTxn<P> {
    staged: BTreeMap<String, VersionedRecord<P>>,
}

impl<P: PayloadCodec> RecordTxn<P> for MemoryTxn<P> {
    fn get(&self, key: &str) -> Option<VersionedRecord<P>> {
        self.staged.get(key).cloned()
    }

    fn delete(&mut self, key: &str) -> bool {
        self.staged.remove(key).is_some()
    }

    fn insert(&mut self, record: VersionedRecord<P>) -> StoreResult<()> {
        if self.staged.contains_key(&record.key) {
            return Err(StoreError::DuplicateKey {
                key: record.key.clone(),
            });
        }
        self.staged.insert(record.key.clone(), record);
        Ok(())
    }
}

impl<P: PayloadCodec> RecordStore<P> for MemoryStore<P> {
    fn get(&self, key: &str) -> StoreResult<Option<VersionedRecord<P>>> {
        Ok(self.rows.lock().get(key).cloned())
    }

    fn load_all(&self) -> StoreResult<Vec<VersionedRecord<P>>> {
        Ok(self.rows.lock().values().cloned().collect())
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn RecordTxn<P>) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let mut rows = self.rows.lock();
        let mut txn = MemoryTxn {
            staged: rows.clone(),
        };
        f(&mut txn)?;

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::backend("commit failed"));
        }

        *rows = txn.staged;
        Ok(())
    }
}
