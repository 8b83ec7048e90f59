//! The pending-request table: the Transport's central coordinating structure
//! for correlating asynchronously-arriving responses back to their sender.
//!
//! Shared between the request sender (insert on send, remove on timeout) and
//! a background reader task (remove on correlation), so it's a concurrent
//! map of one-shot completion channels rather than a lock-protected `HashMap`
//! with condvars — the same shape this corpus reaches for (`DashMap`) when it
//! needs a shared, concurrently-mutated table.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::error::TransportError;
use mcpconform_core::jsonrpc::JsonRpcResponse;

/// Canonicalizes a JSON-RPC id into a map key.
///
/// Ids are either strings or numbers per the spec; this renders both to a
/// stable string so `1` and `"1"` remain distinct keys (they are distinct
/// ids on the wire) while `1` and `1.0` collide (both mean the integer one).
fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => format!("s:{s}"),
        Value::Number(n) => format!("n:{n}"),
        other => format!("?:{other}"),
    }
}

/// Monotonically increasing request id allocator, shared by a transport
/// instance across its lifetime.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicI64,
}

impl IdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Allocates the next id as a JSON number.
    pub fn next_id(&self) -> Value {
        Value::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Table of outstanding requests awaiting correlation.
pub struct PendingRequestTable {
    slots: DashMap<String, oneshot::Sender<JsonRpcResponse>>,
}

impl PendingRequestTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Registers a new pending entry for `id`, returning the receiving half
    /// the caller awaits.
    pub fn register(&self, id: &Value) -> oneshot::Receiver<JsonRpcResponse> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(id_key(id), tx);
        rx
    }

    /// Delivers `response` to the pending entry matching its id, if any.
    ///
    /// Returns `true` if a waiter was found and notified; `false` if the id
    /// is unknown (already timed out, already delivered, or was never sent
    /// by this transport) — callers should log and drop in that case rather
    /// than treat it as fatal.
    pub fn deliver(&self, response: JsonRpcResponse) -> bool {
        let key = id_key(&response.id);
        if let Some((_, tx)) = self.slots.remove(&key) {
            // Ignore send failure: the waiter already gave up (timed out).
            let _ = tx.send(response);
            true
        } else {
            false
        }
    }

    /// Removes the pending entry for `id` without delivering anything,
    /// used when the caller's deadline fires first.
    pub fn cancel(&self, id: &Value) {
        self.slots.remove(&id_key(id));
    }

    /// Awaits the response for `id` with the given `rx`, enforcing `deadline`.
    /// Removes the pending entry on timeout so a later response is dropped
    /// by [`Self::deliver`] rather than silently reviving a dead waiter.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if `deadline` elapses first, or
    /// [`TransportError::Closed`] if the sender half was dropped (the reader
    /// task died) before delivering anything.
    pub async fn await_response(
        &self,
        id: &Value,
        rx: oneshot::Receiver<JsonRpcResponse>,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, TransportError> {
        match timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::Closed(
                "response channel dropped before delivery".to_string(),
            )),
            Err(_) => {
                self.cancel(id);
                Err(TransportError::Timeout(deadline))
            }
        }
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no requests are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for PendingRequestTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn deliver_resolves_matching_waiter() {
        let table = PendingRequestTable::new();
        let id = json!(1);
        let rx = table.register(&id);

        let response = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!("ok")),
            error: None,
            id: id.clone(),
        };
        assert!(table.deliver(response.clone()));

        let got = rx.await.unwrap();
        assert_eq!(got.id, id);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn deliver_unknown_id_is_noop() {
        let table = PendingRequestTable::new();
        let response = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!("ok")),
            error: None,
            id: json!(999),
        };
        assert!(!table.deliver(response));
    }

    #[tokio::test]
    async fn timeout_removes_the_pending_entry() {
        let table = PendingRequestTable::new();
        let id = json!(42);
        let rx = table.register(&id);

        let result = table
            .await_response(&id, rx, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn late_response_after_timeout_is_dropped_not_fatal() {
        let table = PendingRequestTable::new();
        let id = json!(7);
        let rx = table.register(&id);
        table
            .await_response(&id, rx, Duration::from_millis(5))
            .await
            .unwrap_err();

        let late = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!("late")),
            error: None,
            id,
        };
        assert!(!table.deliver(late));
    }

    #[test]
    fn id_generator_is_monotonic() {
        let gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn string_and_number_ids_do_not_collide() {
        assert_ne!(id_key(&json!(1)), id_key(&json!("1")));
    }
}
