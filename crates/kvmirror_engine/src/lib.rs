//! # kvmirror Sync Engine
//!
//! Client-side key-value synchronization for kvmirror.
//!
//! This crate keeps a local, persisted mirror of a subset of a central
//! authority's key/value data consistent. It provides:
//! - Set-handler: applies batches of authority-pushed writes with per-item
//!   optimistic-concurrency (e-tag) conflict detection
//! - Sync-handler: reports local divergence (changed / missing / additional)
//! - Reconnect worker: one resync handshake per connectivity rising edge,
//!   with bounded-timeout retry and joint cancellation
//! - Dispatcher: explicit `(channel, message type)` routing for inbound
//!   requests, built at construction time
//!
//! ## Key Invariants
//!
//! - The authority is authoritative; local rows change only through accepted
//!   `set` items (or the debug overlay)
//! - A write succeeds only if its `previous_e_tag` matches the stored tag
//! - Accepted items of one batch commit in a single transaction
//! - Per-item rejections never fail the batch; store failures always do
//! - At most one resync attempt is in flight at any time

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod apply;
mod config;
mod diff;
mod error;
mod overlay;
mod signal;
mod sync;
mod transport;
mod worker;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use signal::{ConnectionPhase, PhaseSignal, WaitOutcome};
pub use sync::{ChangeHook, OrphanHook, Synchronizer};
pub use transport::{Dispatcher, FilterFn, HandlerFn, MockTransport, SyncTransport};
pub use worker::ResyncWorker;
