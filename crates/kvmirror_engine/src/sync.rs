//! Synchronizer assembly and handler registration.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::signal::PhaseSignal;
use crate::transport::{Dispatcher, SyncTransport};
use crate::worker::ResyncWorker;
use kvmirror_protocol::{KvSetRequest, KvSyncRequest, RpcEnvelope};
use kvmirror_store::{PayloadCodec, RecordStore};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Post-commit change notification.
///
/// Called with the keys whose comparison value actually changed and, for
/// keys that existed before the write, their previous comparison values.
pub type ChangeHook = Box<dyn Fn(&[String], &HashMap<String, String>) + Send + Sync>;

/// Host policy hook for locally-present keys the authority no longer knows.
///
/// Observation only: the sync-handler never evicts on its own.
pub type OrphanHook = Box<dyn Fn(&[String]) + Send + Sync>;

/// The core synchronization component.
///
/// Owns mutation timing over the record store, answers the inbound `set` and
/// `sync` requests, and drives the outbound resync handshake through a
/// background worker. Handlers are safe under concurrent invocation with
/// each other and with the worker; correctness rests on the e-tag
/// compare-and-swap inside a single store transaction.
pub struct Synchronizer<P: PayloadCodec, S: RecordStore<P>> {
    pub(crate) store: Arc<S>,
    pub(crate) config: SyncConfig,
    pub(crate) change_hook: Option<ChangeHook>,
    pub(crate) orphan_hook: Option<OrphanHook>,
    _payload: PhantomData<fn() -> P>,
}

impl<P, S> Synchronizer<P, S>
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
{
    /// Creates a new synchronizer over the given store.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            change_hook: None,
            orphan_hook: None,
            _payload: PhantomData,
        }
    }

    /// Installs the post-commit change notification hook.
    pub fn with_change_hook(mut self, hook: ChangeHook) -> Self {
        self.change_hook = Some(hook);
        self
    }

    /// Installs the orphaned-key policy hook.
    pub fn with_orphan_hook(mut self, hook: OrphanHook) -> Self {
        self.orphan_hook = Some(hook);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Registers the `set` and `sync` handlers on the dispatcher, filtered
    /// to this component's service identity.
    pub fn register(self: &Arc<Self>, dispatcher: &mut Dispatcher) {
        let channel = self.config.channel.clone();

        let me = Arc::clone(self);
        dispatcher.register_filtered(
            channel.clone(),
            "set",
            Some(service_filter(self.config.service.clone())),
            Box::new(move |envelope: &RpcEnvelope| {
                let request: KvSetRequest = serde_json::from_value(envelope.body.clone())
                    .map_err(|e| SyncError::Validation(e.to_string()))?;
                let response = me.handle_set(&request)?;
                serde_json::to_value(response).map_err(|e| SyncError::Handler(e.to_string()))
            }),
        );

        let me = Arc::clone(self);
        dispatcher.register_filtered(
            channel,
            "sync",
            Some(service_filter(self.config.service.clone())),
            Box::new(move |envelope: &RpcEnvelope| {
                let request: KvSyncRequest = serde_json::from_value(envelope.body.clone())
                    .map_err(|e| SyncError::Validation(e.to_string()))?;
                let response = me.handle_sync(&request)?;
                serde_json::to_value(response).map_err(|e| SyncError::Handler(e.to_string()))
            }),
        );
    }

    /// Spawns the reconnect worker driving the outbound handshake.
    ///
    /// The returned worker owns the background thread; report connectivity
    /// transitions through [`ResyncWorker::set_phase`] and stop it with
    /// [`ResyncWorker::shutdown`].
    pub fn start<T: SyncTransport>(self: &Arc<Self>, transport: T) -> ResyncWorker {
        ResyncWorker::spawn(Arc::clone(self), transport, Arc::new(PhaseSignal::new()))
    }

    /// Invokes the change hook, isolating any failure from the caller.
    pub(crate) fn notify_changes(&self, changed: &[String], previous: &HashMap<String, String>) {
        if changed.is_empty() {
            return;
        }
        if let Some(hook) = &self.change_hook {
            if catch_unwind(AssertUnwindSafe(|| hook(changed, previous))).is_err() {
                warn!(keys = ?changed, "change notification hook panicked");
            }
        }
    }

    /// Invokes the orphan hook, isolating any failure from the caller.
    pub(crate) fn notify_orphans(&self, orphaned: &[String]) {
        if orphaned.is_empty() {
            return;
        }
        if let Some(hook) = &self.orphan_hook {
            if catch_unwind(AssertUnwindSafe(|| hook(orphaned))).is_err() {
                warn!(keys = ?orphaned, "orphan policy hook panicked");
            }
        }
    }
}

fn service_filter(service: String) -> crate::transport::FilterFn {
    Box::new(move |envelope: &RpcEnvelope| {
        if envelope.service == service {
            Ok(())
        } else {
            Err(format!(
                "request for service {} not accepted by {}",
                envelope.service, service
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmirror_protocol::RpcStatus;
    use kvmirror_store::MemoryStore;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Payload(serde_json::Value);

    impl PayloadCodec for Payload {
        fn parse(value: &serde_json::Value) -> Result<Self, String> {
            if value.is_object() {
                Ok(Payload(value.clone()))
            } else {
                Err("expected object".to_owned())
            }
        }
    }

    fn synchronizer() -> Arc<Synchronizer<Payload, MemoryStore<Payload>>> {
        Arc::new(Synchronizer::new(
            Arc::new(MemoryStore::new()),
            SyncConfig::new("io", "parking/lot1"),
        ))
    }

    #[test]
    fn register_installs_both_routes() {
        let sync = synchronizer();
        let mut dispatcher = Dispatcher::new();
        sync.register(&mut dispatcher);
        assert_eq!(dispatcher.route_count(), 2);
    }

    #[test]
    fn dispatched_sync_request_end_to_end() {
        let sync = synchronizer();
        let mut dispatcher = Dispatcher::new();
        sync.register(&mut dispatcher);

        let envelope = RpcEnvelope::new(
            "kv_sync",
            "sync",
            "io",
            json!({"service": "io", "kvs": {"a": 1}}),
        );
        let reply = dispatcher.dispatch(&envelope);
        assert!(reply.is_ok());

        let body = reply.body.unwrap();
        assert_eq!(body["missing"], json!({"a": 1}));
    }

    #[test]
    fn foreign_service_is_filtered() {
        let sync = synchronizer();
        let mut dispatcher = Dispatcher::new();
        sync.register(&mut dispatcher);

        let envelope = RpcEnvelope::new("kv_sync", "sync", "other", json!({}));
        let reply = dispatcher.dispatch(&envelope);
        assert_eq!(reply.status, RpcStatus::FilterError);
    }

    #[test]
    fn malformed_body_is_validation_error() {
        let sync = synchronizer();
        let mut dispatcher = Dispatcher::new();
        sync.register(&mut dispatcher);

        let envelope = RpcEnvelope::new("kv_sync", "set", "io", json!({"items": "nope"}));
        let reply = dispatcher.dispatch(&envelope);
        assert_eq!(reply.status, RpcStatus::ValidationError);
    }

    #[test]
    fn panicking_change_hook_is_isolated() {
        let sync = Synchronizer::<Payload, MemoryStore<Payload>>::new(
            Arc::new(MemoryStore::new()),
            SyncConfig::new("io", "r"),
        )
        .with_change_hook(Box::new(|_, _| panic!("host bug")));

        sync.notify_changes(&["a".to_string()], &HashMap::new());
    }
}
