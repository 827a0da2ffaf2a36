//! Background reconnect worker.

use crate::signal::{ConnectionPhase, PhaseSignal, WaitOutcome};
use crate::sync::Synchronizer;
use crate::transport::SyncTransport;
use crate::SyncError;
use kvmirror_protocol::ServerSyncRequest;
use kvmirror_store::{PayloadCodec, RecordStore};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Handle to the background worker driving the reconnect handshake.
///
/// One dedicated thread runs for the component's lifetime. It blocks only on
/// the shared [`PhaseSignal`], so a connectivity drop or `shutdown` wakes it
/// wherever it is — waiting for an edge, waiting out the retry cadence, or
/// inside the outbound call.
pub struct ResyncWorker {
    signal: Arc<PhaseSignal>,
    handle: Option<JoinHandle<()>>,
    done: mpsc::Receiver<()>,
    grace: Duration,
}

impl ResyncWorker {
    pub(crate) fn spawn<P, S, T>(
        sync: Arc<Synchronizer<P, S>>,
        transport: T,
        signal: Arc<PhaseSignal>,
    ) -> Self
    where
        P: PayloadCodec,
        S: RecordStore<P> + 'static,
        T: SyncTransport,
    {
        let grace = sync.config().shutdown_grace;
        let (done_tx, done_rx) = mpsc::channel();
        let worker_signal = Arc::clone(&signal);

        let handle = match std::thread::Builder::new()
            .name("kvmirror-resync".into())
            .spawn(move || {
                run(sync, transport, worker_signal);
                let _ = done_tx.send(());
            }) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn resync worker");
                None
            }
        };

        Self {
            signal,
            handle,
            done: done_rx,
            grace,
        }
    }

    /// Reports a connectivity phase transition to the worker.
    pub fn set_phase(&self, phase: ConnectionPhase) {
        self.signal.set_phase(phase);
    }

    /// Returns the shared signal, e.g. to hand to a connection observer.
    pub fn signal(&self) -> Arc<PhaseSignal> {
        Arc::clone(&self.signal)
    }

    /// Stops the worker, waiting up to the configured grace period.
    pub fn shutdown(mut self) {
        self.signal.cancel();
        if let Some(handle) = self.handle.take() {
            match self.done.recv_timeout(self.grace) {
                Ok(()) => {
                    let _ = handle.join();
                }
                Err(_) => {
                    warn!("resync worker did not stop within the grace period");
                }
            }
        }
    }
}

impl Drop for ResyncWorker {
    fn drop(&mut self) {
        // Dropping without shutdown() still stops the thread eventually.
        self.signal.cancel();
    }
}

fn run<P, S, T>(sync: Arc<Synchronizer<P, S>>, transport: T, signal: Arc<PhaseSignal>)
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
    T: SyncTransport,
{
    debug!(service = %sync.config().service, "resync worker started");

    let mut seen_edges = 0;
    while let Some(edges) = signal.wait_for_edge(seen_edges) {
        seen_edges = edges;
        run_cycle(&sync, &transport, &signal);
    }

    debug!("resync worker stopped");
}

/// One attempt cycle: resync until success, disconnect, or cancellation.
///
/// Every failed attempt waits out the remainder of the call timeout before
/// retrying, so attempts start at most once per `resync_timeout` even when
/// the transport fails fast.
fn run_cycle<P, S, T>(sync: &Arc<Synchronizer<P, S>>, transport: &T, signal: &PhaseSignal)
where
    P: PayloadCodec,
    S: RecordStore<P> + 'static,
    T: SyncTransport,
{
    let config = sync.config();
    let request = ServerSyncRequest {
        resource: config.resource.clone(),
        service: config.service.clone(),
    };
    let timeout = config.resync_timeout;

    loop {
        let started = Instant::now();
        match transport.resync(&request, timeout, signal) {
            Ok(response) => {
                if !response.is_clean() {
                    warn!(
                        errors = response.errors.len(),
                        "authority reported per-key resync failures"
                    );
                }
                debug!(
                    successes = response.successes.len(),
                    "resync handshake complete"
                );
                if let Err(e) = sync.apply_overlay() {
                    warn!(error = %e, "failed to apply debug overlay");
                }
                return;
            }
            Err(SyncError::Cancelled) => {
                debug!("resync cancelled");
                return;
            }
            Err(e) if !e.is_retryable() => {
                warn!(error = %e, "resync failed with a non-retryable error");
                return;
            }
            Err(e) => {
                warn!(error = %e, "resync attempt failed");
                let remaining = timeout.saturating_sub(started.elapsed());
                match signal.wait_retry(remaining) {
                    WaitOutcome::Elapsed => {}
                    WaitOutcome::Disconnected => {
                        debug!("connectivity lost, abandoning resync cycle");
                        return;
                    }
                    WaitOutcome::Cancelled => return,
                }
            }
        }
    }
}
