//! Protocol messages for the kv_sync channel.

use crate::ETag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One remote write in a `set` batch.
///
/// `previous_e_tag` is the writer's belief about the currently stored tag:
/// `Some(tag)` means "a row with this tag must exist", `None` means "no row
/// must exist". `value` is the new JSON payload; `None` (or JSON `null`)
/// means delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequestItem {
    /// Record key.
    pub key: String,
    /// New authority-issued tag for the record after this write.
    pub e_tag: ETag,
    /// Expected current tag, or absent if the row must not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_e_tag: Option<ETag>,
    /// New payload, or null/absent to delete the record.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl SetRequestItem {
    /// Creates a write (insert or replace) item.
    pub fn put(
        key: impl Into<String>,
        e_tag: ETag,
        previous_e_tag: Option<ETag>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            key: key.into(),
            e_tag,
            previous_e_tag,
            value: Some(value),
        }
    }

    /// Creates a delete item.
    pub fn delete(key: impl Into<String>, e_tag: ETag, previous_e_tag: Option<ETag>) -> Self {
        Self {
            key: key.into(),
            e_tag,
            previous_e_tag,
            value: None,
        }
    }

    /// Returns true if this item deletes the record.
    pub fn is_delete(&self) -> bool {
        // JSON null and an absent field both mean delete.
        match &self.value {
            None => true,
            Some(value) => value.is_null(),
        }
    }
}

/// A batch of remote writes pushed by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvSetRequest {
    /// Items to apply, each judged independently.
    pub items: Vec<SetRequestItem>,
}

/// Per-item result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatus {
    /// The item was applied (or was an already-satisfied delete).
    Ok,
    /// The item was rejected; see the error kind.
    Error,
}

/// Why an individual item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetErrorKind {
    /// The stored tag did not match `previous_e_tag`.
    ETagMismatch,
    /// The payload could not be parsed into the record's columns.
    ParseError,
}

/// Outcome of one `SetRequestItem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOutcome {
    /// The item's key.
    pub key: String,
    /// Whether the item was applied.
    pub status: SetStatus,
    /// Rejection reason, present only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SetErrorKind>,
}

impl SetOutcome {
    /// Creates a successful outcome.
    pub fn ok(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: SetStatus::Ok,
            error: None,
        }
    }

    /// Creates a rejected outcome.
    pub fn error(key: impl Into<String>, kind: SetErrorKind) -> Self {
        Self {
            key: key.into(),
            status: SetStatus::Error,
            error: Some(kind),
        }
    }

    /// Returns true if the item was applied.
    pub fn is_ok(&self) -> bool {
        self.status == SetStatus::Ok
    }
}

/// Response to a `set` batch: one outcome per input key, input order kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvSetResponse {
    /// Per-item outcomes.
    pub results: Vec<SetOutcome>,
}

/// The authority's belief about this service's mirrored keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvSyncRequest {
    /// Service identity the belief is about.
    pub service: String,
    /// Believed key → e-tag mapping.
    pub kvs: BTreeMap<String, ETag>,
}

/// Divergence between the authority's belief and local storage.
///
/// Transient per sync round; never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KvSyncResponse {
    /// Keys present on both sides with differing tags (local tag reported).
    pub changed: BTreeMap<String, ETag>,
    /// Keys the authority believes in that are absent locally
    /// (requested tag reported).
    pub missing: BTreeMap<String, ETag>,
    /// Keys present locally but absent from the belief (local tag reported).
    pub additional: BTreeMap<String, ETag>,
}

impl KvSyncResponse {
    /// Returns true if belief and local storage agree completely.
    pub fn is_in_sync(&self) -> bool {
        self.changed.is_empty() && self.missing.is_empty() && self.additional.is_empty()
    }
}

/// Outbound request asking the authority to re-push this service's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSyncRequest {
    /// Resource whose key space should be re-pushed.
    pub resource: String,
    /// Requesting service identity.
    pub service: String,
}

/// A per-key failure reported by the authority's resync endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSyncError {
    /// The affected key.
    pub key: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// The authority's answer to a resync request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerSyncResponse {
    /// Keys the authority accepted for re-push.
    #[serde(default)]
    pub successes: Vec<String>,
    /// Keys the authority could not re-push.
    #[serde(default)]
    pub errors: Vec<ServerSyncError>,
}

impl ServerSyncResponse {
    /// Returns true if every key was accepted.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_item_null_value_is_delete() {
        let item: SetRequestItem =
            serde_json::from_value(json!({"key": "a", "e_tag": 2, "previous_e_tag": 1,
                                          "value": null}))
                .unwrap();
        assert!(item.is_delete());

        let item: SetRequestItem =
            serde_json::from_value(json!({"key": "a", "e_tag": 2, "previous_e_tag": 1}))
                .unwrap();
        assert!(item.is_delete());

        let item = SetRequestItem::put("a", 2, Some(1), json!({"v": 1}));
        assert!(!item.is_delete());
    }

    #[test]
    fn set_item_absent_previous_tag() {
        let item: SetRequestItem =
            serde_json::from_value(json!({"key": "b", "e_tag": 1, "value": {"v": 7}})).unwrap();
        assert_eq!(item.previous_e_tag, None);
    }

    #[test]
    fn outcome_wire_format() {
        let ok = serde_json::to_value(SetOutcome::ok("a")).unwrap();
        assert_eq!(ok, json!({"key": "a", "status": "ok"}));

        let err =
            serde_json::to_value(SetOutcome::error("b", SetErrorKind::ETagMismatch)).unwrap();
        assert_eq!(
            err,
            json!({"key": "b", "status": "error", "error": "e_tag_mismatch"})
        );

        let err = serde_json::to_value(SetOutcome::error("c", SetErrorKind::ParseError)).unwrap();
        assert_eq!(err["error"], json!("parse_error"));
    }

    #[test]
    fn sync_request_roundtrip() {
        let request = KvSyncRequest {
            service: "io".to_string(),
            kvs: BTreeMap::new(),
        };
        let bytes = serde_json::to_vec(&request).unwrap();
        let decoded: KvSyncRequest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn sync_response_in_sync() {
        let response = KvSyncResponse::default();
        assert!(response.is_in_sync());

        let response = KvSyncResponse {
            missing: [("b".to_string(), 2)].into_iter().collect(),
            ..Default::default()
        };
        assert!(!response.is_in_sync());
    }

    #[test]
    fn server_sync_response_defaults() {
        let decoded: ServerSyncResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.is_clean());
        assert!(decoded.successes.is_empty());
    }
}
