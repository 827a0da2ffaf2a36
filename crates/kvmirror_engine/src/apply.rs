//! Set-handler: applies batches of authority-pushed writes.

use crate::error::SyncResult;
use crate::sync::Synchronizer;
use kvmirror_protocol::{KvSetRequest, KvSetResponse, SetErrorKind, SetOutcome};
use kvmirror_store::{PayloadCodec, RecordStore, VersionedRecord};
use std::collections::HashMap;
use tracing::debug;

impl<P, S> Synchronizer<P, S>
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
{
    /// Applies a batch of remote writes.
    ///
    /// Each item is judged independently against the staged transaction
    /// state: the stored e-tag must equal `previous_e_tag` (an absent row
    /// matches only an absent `previous_e_tag`). Rejected items are reported
    /// per key and never block the rest of the batch. All accepted items
    /// commit atomically in one transaction.
    ///
    /// After a successful commit the change hook fires for keys whose
    /// comparison value actually differs; hook failures are logged and never
    /// affect the committed result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Store`] if the transaction itself fails;
    /// the whole batch rolls back.
    pub fn handle_set(&self, request: &KvSetRequest) -> SyncResult<KvSetResponse> {
        let mut outcomes: Vec<SetOutcome> = Vec::with_capacity(request.items.len());
        // (key, comparison value before, comparison value after)
        let mut staged: Vec<(String, Option<String>, Option<String>)> = Vec::new();

        self.store.transaction(&mut |txn| {
            outcomes.clear();
            staged.clear();

            for item in &request.items {
                let current = txn.get(&item.key);

                // Deleting an absent row is an already-satisfied delete.
                if item.is_delete() && current.is_none() {
                    outcomes.push(SetOutcome::ok(&item.key));
                    continue;
                }

                let tag_matches = match (&current, item.previous_e_tag) {
                    (Some(row), Some(previous)) => row.e_tag == previous,
                    (None, None) => true,
                    _ => false,
                };
                if !tag_matches {
                    debug!(
                        key = %item.key,
                        current = ?current.as_ref().map(|r| r.e_tag),
                        expected = ?item.previous_e_tag,
                        "rejecting item with stale e-tag"
                    );
                    outcomes.push(SetOutcome::error(&item.key, SetErrorKind::ETagMismatch));
                    continue;
                }

                let new_payload = match &item.value {
                    Some(value) if !value.is_null() => match P::parse(value) {
                        Ok(payload) => Some(payload),
                        Err(reason) => {
                            debug!(key = %item.key, %reason, "rejecting unparseable payload");
                            outcomes
                                .push(SetOutcome::error(&item.key, SetErrorKind::ParseError));
                            continue;
                        }
                    },
                    _ => None,
                };

                let before = current.as_ref().map(|row| row.comparison_value());
                txn.delete(&item.key);
                let after = match new_payload {
                    Some(payload) => {
                        let record = VersionedRecord::new(item.key.clone(), item.e_tag, payload);
                        let after = record.comparison_value();
                        txn.insert(record)?;
                        Some(after)
                    }
                    None => None,
                };

                staged.push((item.key.clone(), before, after));
                outcomes.push(SetOutcome::ok(&item.key));
            }
            Ok(())
        })?;

        let mut changed_keys = Vec::new();
        let mut previous_values = HashMap::new();
        for (key, before, after) in staged {
            if before != after {
                changed_keys.push(key.clone());
                if let Some(before) = before {
                    previous_values.insert(key, before);
                }
            }
        }
        self.notify_changes(&changed_keys, &previous_values);

        Ok(KvSetResponse { results: outcomes })
    }
}
