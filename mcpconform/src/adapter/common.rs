//! Shared adapter types: the operation set every protocol-version adapter
//! exposes, and the data shapes that set returns.

use serde_json::Value;
use thiserror::Error;

use crate::error::TransportError;

/// Error surface for adapter operations, distinct from [`TransportError`]
/// so a shape violation or a server-returned JSON-RPC error can be told
/// apart from a dead connection — the Runner treats only the latter as
/// fatal to the current session.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server replied with a JSON-RPC `error` object.
    #[error("server error {code}: {message}")]
    JsonRpc {
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable message.
        message: String,
        /// Optional structured error data.
        data: Option<Value>,
    },

    /// The response violated the expected shape (missing field, wrong type).
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// The operation isn't defined for this protocol revision.
    #[error("unsupported on this protocol revision: {0}")]
    Unsupported(String),
}

/// Result alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Client identity sent during `initialize`.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version string.
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "mcpconform".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server identity and capabilities learned from `initialize`.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server-reported name.
    pub name: String,
    /// Server-reported version.
    pub version: String,
    /// The protocol version the session negotiated.
    pub protocol_version: mcpconform_core::ProtocolVersion,
    /// Protocol revisions the server advertises support for, when reported.
    pub supported_versions: Vec<mcpconform_core::ProtocolVersion>,
    /// Raw `capabilities` object from the `initialize` result.
    pub capabilities: Value,
}

/// One entry from `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Tool name, used to invoke it.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for the tool's input, regardless of whether the wire
    /// field was named `inputSchema` or `parameters`.
    pub input_schema: Value,
}

/// The result of a synchronous or completed asynchronous tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    /// The `content` array/value from the tool result.
    pub content: Value,
    /// `structuredContent`, present only under 2025-06-18.
    pub structured_content: Option<Value>,
    /// True when the server flagged this result as a tool-level error
    /// (`isError: true`) rather than a JSON-RPC error.
    pub is_error: bool,
}

/// State of an outstanding asynchronous tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncInvocationState {
    /// Accepted, not yet started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Cancelled by the client.
    Cancelled,
    /// Finished with an error.
    Failed,
}

/// The result of polling an async tool invocation.
#[derive(Debug, Clone)]
pub struct AsyncToolPoll {
    /// Current invocation state.
    pub state: AsyncInvocationState,
    /// Result content, present once `state` is `Completed`.
    pub result: Option<ToolResult>,
    /// Error message, present once `state` is `Failed`.
    pub error: Option<String>,
}

/// One entry from `resources/list`.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
}

/// The operation set every protocol-version adapter implements, hiding
/// field-name, casing, and capability differences behind one interface
/// (§4.2).
#[async_trait::async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// The protocol revision this adapter speaks.
    fn protocol_version(&self) -> mcpconform_core::ProtocolVersion;

    /// Performs the `initialize` handshake and sends the `initialized`
    /// notification on success.
    async fn initialize(&self, client_info: ClientInfo) -> Result<ServerInfo>;

    /// The server info cached from `initialize`, without a round trip.
    fn cached_server_info(&self) -> Option<ServerInfo>;

    /// Looks up a capability by dotted path (e.g. `"tools"` or
    /// `"experimental.asyncSupported"`) against the capabilities cached from
    /// `initialize`. Defers to [`mcpconform_core::session::Session`]'s
    /// lookup so every adapter and catalog case agree on the same
    /// dotted-path convention.
    fn has_capability(&self, path: &str) -> bool {
        let Some(info) = self.cached_server_info() else {
            return false;
        };
        let session = mcpconform_core::session::Session {
            server_capabilities: Some(info.capabilities),
            ..mcpconform_core::session::Session::new()
        };
        session.has_capability(path)
    }

    /// Performs a live `server/info` round trip.
    async fn server_info(&self) -> Result<ServerInfo>;

    /// Lists the server's tools.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invokes a tool synchronously.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult>;

    /// Starts an asynchronous tool invocation. 2025-03-26 only.
    async fn call_tool_async(&self, _name: &str, _arguments: Value) -> Result<String> {
        Err(AdapterError::Unsupported("call_tool_async".to_string()))
    }

    /// Polls an asynchronous tool invocation. 2025-03-26 only.
    async fn get_tool_result(&self, _invocation_id: &str) -> Result<AsyncToolPoll> {
        Err(AdapterError::Unsupported("get_tool_result".to_string()))
    }

    /// Cancels an asynchronous tool invocation. 2025-03-26 only.
    async fn cancel_tool(&self, _invocation_id: &str) -> Result<()> {
        Err(AdapterError::Unsupported("cancel_tool".to_string()))
    }

    /// Lists resources, when the server advertises the resources capability.
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>>;

    /// Fetches one resource by id/uri.
    async fn get_resource(&self, uri: &str) -> Result<Value>;

    /// Round-trip liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Sends the `shutdown` request.
    async fn shutdown(&self) -> Result<()>;

    /// Sends the `exit` notification.
    async fn exit(&self) -> Result<()>;

    /// The session id learned during `initialize`, if any.
    fn session_id(&self) -> Option<String>;
}

/// Validates a JSON-RPC response's shape and unwraps it to its `result`,
/// translating a present `error` into [`AdapterError::JsonRpc`].
///
/// Shared by every adapter so the "exactly one of result/error, id must
/// match" check in §4.2 isn't re-implemented three times.
pub fn unwrap_result(response: mcpconform_core::jsonrpc::JsonRpcResponse) -> Result<Value> {
    if !response.is_shape_valid() {
        return Err(AdapterError::Shape(
            "response must carry exactly one of result/error".to_string(),
        ));
    }
    if let Some(error) = response.error {
        return Err(AdapterError::JsonRpc {
            code: error.code,
            message: error.message,
            data: error.data,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}
