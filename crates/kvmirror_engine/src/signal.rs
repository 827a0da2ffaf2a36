//! Connectivity phases and the shared cancellation signal.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Connectivity phase of the host's connection to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Initial connection is being established.
    Startup,
    /// Connected and operating normally.
    Online,
    /// Connection lost.
    Offline,
    /// The connection is being torn down for good.
    Shutdown,
}

impl ConnectionPhase {
    /// Returns true if the phase counts as connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionPhase::Startup | ConnectionPhase::Online)
    }
}

/// Outcome of an interruptible retry wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full wait elapsed; the caller may retry.
    Elapsed,
    /// Connectivity dropped during the wait; abandon the cycle.
    Disconnected,
    /// The component is shutting down.
    Cancelled,
}

struct SignalState {
    phase: ConnectionPhase,
    /// Rising-edge counter: incremented on every disconnected → connected
    /// transition. The worker runs exactly one attempt cycle per increment.
    edges: u64,
    cancelled: bool,
}

/// Shared connectivity and cancellation signal.
///
/// One `PhaseSignal` is shared by the connection observer, the reconnect
/// worker's waits, and the in-flight outbound call, so a phase drop or a
/// shutdown interrupts all of them through the same condvar.
pub struct PhaseSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl PhaseSignal {
    /// Creates a new signal. The initial phase is `Offline`, so the first
    /// reported connected phase is a rising edge.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                phase: ConnectionPhase::Offline,
                edges: 0,
                cancelled: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Reports a connectivity phase transition.
    pub fn set_phase(&self, phase: ConnectionPhase) {
        let mut state = self.state.lock();
        if !state.phase.is_connected() && phase.is_connected() {
            state.edges += 1;
        }
        state.phase = phase;
        self.condvar.notify_all();
    }

    /// Returns the current phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.state.lock().phase
    }

    /// Returns the number of rising edges observed so far.
    pub fn edges(&self) -> u64 {
        self.state.lock().edges
    }

    /// Cancels all current and future waits.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.condvar.notify_all();
    }

    /// Returns true once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Blocks until a rising edge newer than `seen` occurs.
    ///
    /// Returns the new edge count, or `None` on cancellation.
    pub fn wait_for_edge(&self, seen: u64) -> Option<u64> {
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                return None;
            }
            if state.edges > seen {
                return Some(state.edges);
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Waits out the retry cadence, returning early on disconnect or
    /// cancellation.
    pub fn wait_retry(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                return WaitOutcome::Cancelled;
            }
            if !state.phase.is_connected() {
                return WaitOutcome::Disconnected;
            }
            if Instant::now() >= deadline {
                return WaitOutcome::Elapsed;
            }
            let _ = self.condvar.wait_until(&mut state, deadline);
        }
    }

    /// Sleeps for `timeout` unless cancelled first.
    ///
    /// Returns true if cancellation interrupted the sleep. Transports use
    /// this to make an in-flight call observe shutdown.
    pub fn sleep_cancellable(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let _ = self.condvar.wait_until(&mut state, deadline);
        }
    }
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}
