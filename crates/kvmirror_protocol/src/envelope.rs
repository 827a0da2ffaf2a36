//! Request envelope and reply types for the dispatch boundary.

use serde::{Deserialize, Serialize};

/// An inbound request envelope as delivered by the host transport.
///
/// Routing is by `(channel, message_type)`; `service` names the target
/// component, letting one transport serve several synchronizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Logical channel, e.g. `kv_sync`.
    pub channel: String,
    /// Message type within the channel, e.g. `set` or `sync`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Target service identity.
    pub service: String,
    /// Message body, decoded by the routed handler.
    pub body: serde_json::Value,
}

impl RpcEnvelope {
    /// Creates a new envelope.
    pub fn new(
        channel: impl Into<String>,
        message_type: impl Into<String>,
        service: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            channel: channel.into(),
            message_type: message_type.into(),
            service: service.into(),
            body,
        }
    }
}

/// Terminal status of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcStatus {
    /// The handler produced a response body.
    Ok,
    /// The envelope or body was malformed, or the route is unknown.
    ValidationError,
    /// A registered filter rejected the request or failed.
    FilterError,
    /// The handler itself failed.
    HandlerError,
}

/// The reply produced by dispatching an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
    /// Terminal status.
    pub status: RpcStatus,
    /// Response body, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Error message, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcReply {
    /// Creates a successful reply.
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: RpcStatus::Ok,
            body: Some(body),
            error: None,
        }
    }

    /// Creates a failed reply with the given status.
    pub fn error(status: RpcStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            error: Some(message.into()),
        }
    }

    /// Returns true if the request succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == RpcStatus::Ok
    }
}
