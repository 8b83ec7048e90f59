//! Transport abstraction layer.
//!
//! Hides the wire differences between stdio, synchronous HTTP, and
//! asynchronous HTTP+SSE behind the [`Transport`] trait so the protocol
//! adapter and test catalog are written once. Each concrete transport owns
//! its own [`PendingRequestTable`] and background reader task(s); none of
//! that plumbing leaks past this trait.

pub mod http;
pub mod pending;
pub mod sse;
pub mod stdio;

pub use http::HttpTransport;
pub use pending::{IdGenerator, PendingRequestTable};
pub use sse::SseTransport;
pub use stdio::StdioTransport;

use mcpconform_core::jsonrpc::{JsonRpcNotification, JsonRpcResponse};
use mcpconform_core::TransportKind;
use serde_json::Value;

use crate::error::TransportError;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Async transport trait for sending and receiving JSON-RPC messages.
///
/// Implementations use `&self` with interior mutability so a single
/// `Arc<dyn Transport>` can be shared between the foreground (sending
/// requests) and background reader tasks (correlating responses).
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Launches the subprocess or establishes the HTTP/SSE session, learning
    /// the session id where the transport-level handshake provides one.
    async fn start(&self) -> Result<()>;

    /// Terminates the subprocess (grace period then force-kill) or tears
    /// down the HTTP session/SSE reader. Safe to call more than once.
    async fn stop(&self) -> Result<()>;

    /// Sends a request and awaits its correlated response, or a
    /// [`TransportError::Timeout`] if the deadline elapses first.
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse>;

    /// Sends a notification; never waits for a response. Still fails on a
    /// write/connection error.
    async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()>;

    /// Sends a batch of requests in one frame (only valid for revisions that
    /// permit batching — see [`mcpconform_core::ProtocolVersion::allows_batching`]).
    ///
    /// Returns one response per request, in arbitrary order, matched by id.
    async fn send_batch(
        &self,
        requests: Vec<(String, Option<Value>)>,
    ) -> Result<Vec<JsonRpcResponse>>;

    /// The server-assigned session id, once known.
    fn session_id(&self) -> Option<String>;

    /// Records a session id the adapter learned from an `initialize`
    /// result body, for transports that don't carry one at the wire level
    /// (stdio) or where the body is the only place it appeared (HTTP
    /// without a `Mcp-Session-Id` response header). No-op by default.
    async fn note_session_id(&self, _id: String) {}

    /// Sends `payload` verbatim and returns the raw response body, bypassing
    /// normal request construction and id correlation.
    ///
    /// Exists for error-handling conformance tests that deliberately send
    /// malformed frames (missing `jsonrpc`, unparseable JSON) the typed
    /// request builders can't produce. Unsupported by default; only the
    /// synchronous HTTP transport implements it, since stdio's and SSE's
    /// background readers can't distinguish a raw reply from ordinary
    /// traffic without a dedicated, fragile bypass path.
    async fn send_raw(&self, _payload: &str) -> Result<String> {
        Err(TransportError::Unsupported("send_raw".to_string()))
    }

    /// Sends `method` with no `Authorization` header, instead of whatever
    /// bearer token this transport was configured with.
    ///
    /// Exists for OAuth 2.1 conformance cases that need to prove the server
    /// actually enforces the configured token rather than ignoring it (§4.3).
    /// Unsupported by default; only the HTTP transport carries a bearer
    /// token a single request can meaningfully drop.
    async fn send_unauthenticated(
        &self,
        _method: &str,
        _params: Option<Value>,
    ) -> Result<JsonRpcResponse> {
        Err(TransportError::Unsupported("send_unauthenticated".to_string()))
    }

    /// Identifies this transport's wire mechanism for logging and metrics.
    fn transport_kind(&self) -> TransportKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_kind_display_matches_config_rendering() {
        assert_eq!(format!("{:?}", TransportKind::Stdio), "Stdio");
        assert_eq!(format!("{:?}", TransportKind::Http), "Http");
        assert_eq!(format!("{:?}", TransportKind::HttpSse), "HttpSse");
    }
}
