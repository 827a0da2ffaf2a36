//! # kvmirror Sync Protocol
//!
//! Wire contracts and JSON codecs for the kvmirror key-value sync protocol.
//!
//! This crate provides:
//! - `SetRequestItem` / `KvSetRequest` / `KvSetResponse` for inbound writes
//! - `KvSyncRequest` / `KvSyncResponse` for divergence diffs
//! - `ServerSyncRequest` / `ServerSyncResponse` for the outbound resync call
//! - `RpcEnvelope` / `RpcReply` for the transport dispatch boundary
//! - JSON encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod messages;

pub use envelope::{RpcEnvelope, RpcReply, RpcStatus};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    KvSetRequest, KvSetResponse, KvSyncRequest, KvSyncResponse, ServerSyncError,
    ServerSyncRequest, ServerSyncResponse, SetErrorKind, SetOutcome, SetRequestItem, SetStatus,
};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An authority-issued record version tag.
///
/// E-tags are opaque to this component: the only operation ever performed on
/// them is equality comparison for optimistic-concurrency conflict detection.
pub type ETag = u64;

/// Base of the reserved e-tag namespace for locally injected debug entries.
///
/// Authority-issued tags never reach this range, so debug overlay rows can
/// coexist with synced rows without tag collisions.
pub const DEBUG_ETAG_BASE: ETag = 1 << 62;

/// Encodes a protocol message to JSON bytes.
pub fn encode<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decodes a protocol message from JSON bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
