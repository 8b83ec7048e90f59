//! JSON-RPC 2.0 frame types shared by every transport and protocol adapter.
//!
//! Mirrors the wire format exactly: a frame is tagged by which JSON keys are
//! present, never guessed from an open [`serde_json::Value`] map past this
//! boundary. Batch frames (arrays of requests/notifications) are modeled
//! explicitly since `2024-11-05` and `2025-03-26` both permit them while
//! `2025-06-18` forbids them at the client.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version string carried on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and MCP-reserved JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Missing, expired, or unauthorized session/token (MCP-reserved).
    pub const AUTH_ERROR: i64 = -32001;
    /// Session already initialized (MCP-reserved).
    pub const ALREADY_INITIALIZED: i64 = -32002;
    /// Session expired or unknown (MCP-reserved).
    pub const SESSION_EXPIRED: i64 = -32003;
    /// Connection or timeout failure synthesized by the transport (MCP-reserved).
    pub const CONNECTION_TIMEOUT: i64 = -32004;
}

/// Deserializes a present JSON value (including `null`) as `Some(value)`.
///
/// JSON-RPC 2.0 distinguishes `"result": null` (a valid response) from an
/// absent `result` key (an invalid one). Plain `Option<Value>` deserialization
/// collapses both to `None`; this preserves the distinction.
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A single JSON-RPC 2.0 frame or a batch of frames.
///
/// Uses manual deserialization keyed on which fields are present rather than
/// `#[serde(untagged)]`, which cannot reliably tell a Request from a Response
/// when both happen to share compatible shapes.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::derive_partial_eq_without_eq)] // serde_json::Value fields
pub enum JsonRpcMessage {
    /// A request expecting exactly one response.
    Request(JsonRpcRequest),
    /// A response to a previously sent request.
    Response(JsonRpcResponse),
    /// A notification; never elicits a response.
    Notification(JsonRpcNotification),
    /// A batch of requests and/or notifications (forbidden under `2025-06-18`).
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcMessage {
    /// Returns the frame's id, if it has one (requests and responses only).
    #[must_use]
    pub const fn id(&self) -> Option<&Value> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) | Self::Batch(_) => None,
        }
    }

    /// Returns the frame's method name, if it has one.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) | Self::Batch(_) => None,
        }
    }

    /// True if this frame is a batch.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl Serialize for JsonRpcMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Request(r) => r.serialize(serializer),
            Self::Response(r) => r.serialize(serializer),
            Self::Notification(n) => n.serialize(serializer),
            Self::Batch(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl JsonRpcMessage {
    /// Parses a single [`Value`] into a frame, recursing into arrays as batches.
    ///
    /// # Errors
    ///
    /// Returns an error describing which required keys are missing or
    /// inconsistent with any recognized frame shape.
    pub fn from_value(value: Value) -> Result<Self, String> {
        if let Value::Array(items) = value {
            let parsed = items
                .into_iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::Batch(parsed));
        }

        let obj = value
            .as_object()
            .ok_or_else(|| "JSON-RPC message must be an object or an array".to_string())?;

        let has_method = obj.contains_key("method");
        let has_id = obj.contains_key("id");
        let has_result = obj.contains_key("result");
        let has_error = obj.contains_key("error");

        if has_result || has_error {
            let response: JsonRpcResponse =
                serde_json::from_value(value).map_err(|e| format!("invalid response: {e}"))?;
            Ok(Self::Response(response))
        } else if has_method && has_id {
            let request: JsonRpcRequest =
                serde_json::from_value(value).map_err(|e| format!("invalid request: {e}"))?;
            Ok(Self::Request(request))
        } else if has_method {
            let notification: JsonRpcNotification =
                serde_json::from_value(value).map_err(|e| format!("invalid notification: {e}"))?;
            Ok(Self::Notification(notification))
        } else {
            Err("JSON-RPC message must have 'method' (request/notification) \
                 or 'result'/'error' (response)"
                .to_string())
        }
    }
}

/// A JSON-RPC 2.0 request, always accompanied by an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct JsonRpcRequest {
    /// Protocol version (must be `"2.0"`).
    pub jsonrpc: String,
    /// Method name to invoke.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier, echoed back on the matching response.
    pub id: Value,
}

impl JsonRpcRequest {
    /// Builds a new request frame.
    #[must_use]
    pub fn new(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 response: exactly one of `result` or `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct JsonRpcResponse {
    /// Protocol version (must be `"2.0"`).
    pub jsonrpc: String,
    /// Result value, present on success.
    ///
    /// Uses a custom deserializer so `null` becomes `Some(Value::Null)`
    /// rather than `None`, preserving "present but null" vs "absent".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some"
    )]
    pub result: Option<Value>,
    /// Error value, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Identifier of the request this response answers.
    pub id: Value,
}

impl JsonRpcResponse {
    /// True if this response carries both or neither of `result`/`error`,
    /// which violates the JSON-RPC 2.0 invariant that exactly one is present.
    #[must_use]
    pub const fn is_shape_valid(&self) -> bool {
        self.result.is_some() ^ self.error.is_some()
    }

    /// Returns the error code, if this is an error response.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Additional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 notification: a request with no `id`, eliciting no response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct JsonRpcNotification {
    /// Protocol version (must be `"2.0"`).
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Builds a new notification frame.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let req = JsonRpcRequest::new(json!(1), "ping", None);
        let text = serde_json::to_string(&req).unwrap();
        let parsed: JsonRpcMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, JsonRpcMessage::Request(req));
    }

    #[test]
    fn notification_has_no_id() {
        let note = JsonRpcNotification::new("initialized", None);
        let msg = JsonRpcMessage::Notification(note);
        assert_eq!(msg.id(), None);
        assert_eq!(msg.method(), Some("initialized"));
    }

    #[test]
    fn response_null_result_is_distinguished_from_absent() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let msg: JsonRpcMessage = serde_json::from_str(text).unwrap();
        match msg {
            JsonRpcMessage::Response(r) => assert_eq!(r.result, Some(Value::Null)),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn response_with_both_result_and_error_is_shape_invalid() {
        let resp = JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(json!(1)),
            error: Some(JsonRpcError {
                code: error_codes::INTERNAL_ERROR,
                message: "oops".to_string(),
                data: None,
            }),
            id: json!(1),
        };
        assert!(!resp.is_shape_valid());
    }

    #[test]
    fn batch_parses_as_batch_variant() {
        let text = r#"[{"jsonrpc":"2.0","id":1,"method":"ping"},{"jsonrpc":"2.0","id":2,"method":"ping"}]"#;
        let msg: JsonRpcMessage = serde_json::from_str(text).unwrap();
        assert!(msg.is_batch());
        match msg {
            JsonRpcMessage::Batch(items) => assert_eq!(items.len(), 2),
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let text = r#"{"jsonrpc":"2.0"}"#;
        let result: Result<JsonRpcMessage, _> = serde_json::from_str(text);
        assert!(result.is_err());
    }
}
