//! Record store trait definitions.

use crate::error::StoreResult;
use crate::record::{PayloadCodec, VersionedRecord};

/// The row-level persistence seam the synchronizer writes through.
///
/// Implementations are **opaque row stores**: one row per record, keyed
/// uniquely, with no understanding of sync semantics. The synchronizer owns
/// all mutation timing; the store owns storage and transactions.
///
/// # Invariants
///
/// - `get` and `load_all` observe only committed state
/// - `load_all` returns a commit-consistent snapshot
/// - `transaction` applies all staged changes atomically, or none on any
///   error exit
/// - Implementations must be `Send + Sync`; an inbound write can race an
///   in-flight diff
pub trait RecordStore<P: PayloadCodec>: Send + Sync {
    /// Reads the committed record for `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<VersionedRecord<P>>>;

    /// Reads a commit-consistent snapshot of all records.
    fn load_all(&self) -> StoreResult<Vec<VersionedRecord<P>>>;

    /// Runs `f` inside a scoped transaction.
    ///
    /// Changes staged through the [`RecordTxn`] become visible atomically
    /// when `f` returns `Ok`. Any `Err` discards all staged changes and is
    /// returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a backend error if the commit itself
    /// fails.
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn RecordTxn<P>) -> StoreResult<()>,
    ) -> StoreResult<()>;
}

/// A scoped transaction over the record table.
///
/// Reads observe the staged state, so earlier operations in the same
/// transaction are visible to later ones.
pub trait RecordTxn<P: PayloadCodec> {
    /// Reads the staged record for `key`, if any.
    fn get(&self, key: &str) -> Option<VersionedRecord<P>>;

    /// Deletes the staged record for `key`. Returns true if a row existed.
    fn delete(&mut self, key: &str) -> bool;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::DuplicateKey`] if a row with the same
    /// key is already staged; replacement is delete-then-insert.
    fn insert(&mut self, record: VersionedRecord<P>) -> StoreResult<()>;
}
