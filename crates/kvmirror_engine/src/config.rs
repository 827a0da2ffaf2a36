//! Configuration for the synchronizer.

use std::time::Duration;

/// Configuration for a synchronizer instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Service identity this component mirrors data for.
    pub service: String,
    /// Resource whose key space the authority should re-push on reconnect.
    pub resource: String,
    /// Channel the inbound handlers are registered on.
    pub channel: String,
    /// Timeout for one outbound resync call. Also the retry cadence: after a
    /// failed attempt the worker waits `max(0, timeout - elapsed)`.
    pub resync_timeout: Duration,
    /// How long `shutdown()` waits for the worker before detaching it.
    pub shutdown_grace: Duration,
    /// Fixed key → payload entries applied after every successful handshake.
    pub debug_entries: Vec<(String, serde_json::Value)>,
}

impl SyncConfig {
    /// Creates a configuration for the given service and resource.
    pub fn new(service: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            resource: resource.into(),
            channel: "kv_sync".into(),
            resync_timeout: Duration::from_secs(3),
            shutdown_grace: Duration::from_secs(5),
            debug_entries: Vec::new(),
        }
    }

    /// Sets the channel name.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Sets the resync call timeout (and retry cadence).
    pub fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout = timeout;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets the debug overlay entries.
    pub fn with_debug_entries(
        mut self,
        entries: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        self.debug_entries = entries.into_iter().collect();
        self
    }
}
