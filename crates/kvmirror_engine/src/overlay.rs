//! Debug overlay: fixed entries injected after every successful handshake.

use crate::error::SyncResult;
use crate::sync::Synchronizer;
use kvmirror_protocol::DEBUG_ETAG_BASE;
use kvmirror_store::{PayloadCodec, RecordStore, VersionedRecord};
use tracing::{info, warn};

impl<P, S> Synchronizer<P, S>
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
{
    /// Applies the configured debug overlay entries.
    ///
    /// Runs after every successful resync handshake. Each entry replaces any
    /// normal-keyed row under the same key and is tagged from the reserved
    /// [`DEBUG_ETAG_BASE`] namespace, so debug data always wins and never
    /// collides with authority-issued tags. Entries whose payload does not
    /// parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Store`] if the overlay transaction fails.
    pub fn apply_overlay(&self) -> SyncResult<()> {
        if self.config.debug_entries.is_empty() {
            return Ok(());
        }

        let entries = &self.config.debug_entries;
        let mut applied = 0usize;
        self.store.transaction(&mut |txn| {
            applied = 0;
            for (index, (key, value)) in entries.iter().enumerate() {
                let payload = match P::parse(value) {
                    Ok(payload) => payload,
                    Err(reason) => {
                        warn!(%key, %reason, "skipping unparseable debug entry");
                        continue;
                    }
                };
                txn.delete(key);
                txn.insert(VersionedRecord::new(
                    key.clone(),
                    DEBUG_ETAG_BASE + index as u64,
                    payload,
                ))?;
                applied += 1;
            }
            Ok(())
        })?;

        info!(applied, "applied debug overlay");
        Ok(())
    }
}
