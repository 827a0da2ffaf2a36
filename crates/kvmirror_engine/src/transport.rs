//! Transport boundary: inbound dispatch and the outbound resync call.

use crate::error::{SyncError, SyncResult};
use crate::signal::PhaseSignal;
use kvmirror_protocol::{RpcEnvelope, RpcReply, RpcStatus, ServerSyncRequest, ServerSyncResponse};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An inbound request handler.
///
/// Returns the JSON response body, or a [`SyncError`] mapped onto the reply
/// status (`Validation` → `validation_error`, anything else →
/// `handler_error`).
pub type HandlerFn = Box<dyn Fn(&RpcEnvelope) -> SyncResult<serde_json::Value> + Send + Sync>;

/// A per-route filter predicate. `Err` rejects the request.
pub type FilterFn = Box<dyn Fn(&RpcEnvelope) -> Result<(), String> + Send + Sync>;

struct Route {
    filter: Option<FilterFn>,
    handler: HandlerFn,
}

/// Explicit `(channel, message type)` → handler routing.
///
/// The map is built at construction time: components register their handlers
/// into a dispatcher they are handed, and the host transport then drives the
/// dispatcher for every inbound request. There is no global registry.
#[derive(Default)]
pub struct Dispatcher {
    routes: HashMap<(String, String), Route>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `(channel, message_type)`.
    pub fn register(
        &mut self,
        channel: impl Into<String>,
        message_type: impl Into<String>,
        handler: HandlerFn,
    ) {
        self.register_filtered(channel, message_type, None, handler);
    }

    /// Registers a handler with an optional filter predicate.
    pub fn register_filtered(
        &mut self,
        channel: impl Into<String>,
        message_type: impl Into<String>,
        filter: Option<FilterFn>,
        handler: HandlerFn,
    ) {
        self.routes
            .insert((channel.into(), message_type.into()), Route { filter, handler });
    }

    /// Returns the number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Decodes raw bytes into an envelope and dispatches it.
    pub fn dispatch_bytes(&self, bytes: &[u8]) -> RpcReply {
        match kvmirror_protocol::decode::<RpcEnvelope>(bytes) {
            Ok(envelope) => self.dispatch(&envelope),
            Err(e) => RpcReply::error(RpcStatus::ValidationError, e.to_string()),
        }
    }

    /// Dispatches one envelope to its registered handler.
    ///
    /// Filter and handler failures (including panics) are contained here;
    /// dispatching never unwinds into the host transport.
    pub fn dispatch(&self, envelope: &RpcEnvelope) -> RpcReply {
        let key = (envelope.channel.clone(), envelope.message_type.clone());
        let Some(route) = self.routes.get(&key) else {
            return RpcReply::error(
                RpcStatus::ValidationError,
                format!(
                    "no handler for {}/{}",
                    envelope.channel, envelope.message_type
                ),
            );
        };

        if let Some(filter) = &route.filter {
            match catch_unwind(AssertUnwindSafe(|| filter(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => return RpcReply::error(RpcStatus::FilterError, reason),
                Err(_) => {
                    return RpcReply::error(RpcStatus::FilterError, "filter panicked".to_string())
                }
            }
        }

        match catch_unwind(AssertUnwindSafe(|| (route.handler)(envelope))) {
            Ok(Ok(body)) => RpcReply::ok(body),
            Ok(Err(SyncError::Validation(reason))) => {
                RpcReply::error(RpcStatus::ValidationError, reason)
            }
            Ok(Err(e)) => RpcReply::error(RpcStatus::HandlerError, e.to_string()),
            Err(_) => RpcReply::error(RpcStatus::HandlerError, "handler panicked".to_string()),
        }
    }
}

/// The outbound call boundary.
///
/// This trait abstracts the host's request/response channel, allowing for
/// different implementations (message bus, HTTP, mock for testing). The
/// transport owns delivery and timeout only; it must observe `signal` so an
/// in-flight call can be interrupted by shutdown, and its own timeout must
/// fire within `timeout` so the worker's retry cadence stays in control.
pub trait SyncTransport: Send + Sync + 'static {
    /// Asks the authority to re-push this component's data.
    fn resync(
        &self,
        request: &ServerSyncRequest,
        timeout: Duration,
        signal: &PhaseSignal,
    ) -> SyncResult<ServerSyncResponse>;
}

impl<T: SyncTransport> SyncTransport for Arc<T> {
    fn resync(
        &self,
        request: &ServerSyncRequest,
        timeout: Duration,
        signal: &PhaseSignal,
    ) -> SyncResult<ServerSyncResponse> {
        (**self).resync(request, timeout, signal)
    }
}

/// A mock transport for testing.
///
/// Responses are scripted in FIFO order; once the script is exhausted every
/// call succeeds with an empty response. An optional per-call latency makes
/// the call block cancellably, to exercise shutdown of an in-flight call.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<SyncResult<ServerSyncResponse>>>,
    latency: Mutex<Option<Duration>>,
    calls: AtomicU64,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful response.
    pub fn push_ok(&self, response: ServerSyncResponse) {
        self.script.lock().push_back(Ok(response));
    }

    /// Scripts a failure.
    pub fn push_err(&self, error: SyncError) {
        self.script.lock().push_back(Err(error));
    }

    /// Sets a per-call latency.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Returns how many resync calls were made.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SyncTransport for MockTransport {
    fn resync(
        &self,
        _request: &ServerSyncRequest,
        _timeout: Duration,
        signal: &PhaseSignal,
    ) -> SyncResult<ServerSyncResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            if signal.sleep_cancellable(latency) {
                return Err(SyncError::Cancelled);
            }
        }

        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ServerSyncResponse::default()))
    }
}
