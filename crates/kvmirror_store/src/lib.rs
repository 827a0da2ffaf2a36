//! # kvmirror Store
//!
//! Versioned record contract and transactional store boundary for kvmirror.
//!
//! This crate provides:
//! - `VersionedRecord` — a key plus an e-tagged, parsed payload
//! - `PayloadCodec` — the capability every concrete payload type implements
//! - `RecordStore` / `RecordTxn` — the row-level persistence seam
//! - `MemoryStore` — an in-memory store with staged transactions
//!
//! ## Key Invariants
//!
//! - At most one live record per key
//! - A change is delete-old + insert-new, never in-place mutation
//! - Transactions either commit completely or leave the store untouched

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use record::{PayloadCodec, VersionedRecord};
pub use store::{RecordStore, RecordTxn};
