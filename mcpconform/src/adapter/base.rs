//! Shared adapter plumbing reused by every protocol-revision adapter.
//!
//! The wire differences between revisions are all expressible as data on
//! [`ProtocolVersion`] (field-name keys, casing, capability gates), so the
//! request/response shaping lives once here; each `v20*` module is a thin
//! wrapper that picks which optional operations to expose.

use std::sync::Mutex as StdMutex;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;

use mcpconform_core::jsonrpc::JsonRpcNotification;
use mcpconform_core::session::{Session, SessionState};
use mcpconform_core::ProtocolVersion;

use crate::transport::Transport;

use super::common::{
    unwrap_result, AdapterError, ClientInfo, ResourceDescriptor, Result, ServerInfo,
    ToolDescriptor, ToolResult,
};

/// Core request/response shaping shared across protocol revisions.
pub struct GenericAdapter {
    transport: Arc<dyn Transport>,
    version: ProtocolVersion,
    server_info: StdMutex<Option<ServerInfo>>,
    session: StdMutex<Session>,
}

impl GenericAdapter {
    /// Wraps `transport`, speaking `version` on the wire.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, version: ProtocolVersion) -> Self {
        Self {
            transport,
            version,
            server_info: StdMutex::new(None),
            session: StdMutex::new(Session::new()),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn cached_server_info(&self) -> Option<ServerInfo> {
        self.server_info.lock().expect("server_info mutex poisoned").clone()
    }

    /// The negotiated session, tracked from `Uninitialized` through
    /// `Initialized` by [`Self::initialize`].
    pub fn session(&self) -> Session {
        self.session.lock().expect("session mutex poisoned").clone()
    }

    /// Performs a live `server/info` round trip, per §4.2's operation table.
    pub async fn fetch_server_info(&self) -> Result<ServerInfo> {
        let response = self.transport.send_request("server/info", None).await?;
        let result = unwrap_result(response)?;
        Ok(Self::parse_server_info(&result, self.version))
    }

    fn parse_server_info(result: &Value, version: ProtocolVersion) -> ServerInfo {
        let name = result.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let server_version = result
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let supported_versions = result
            .get("protocolVersions")
            .or_else(|| result.get("supportedVersions"))
            .and_then(Value::as_array)
            .map(|versions| {
                versions
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        ServerInfo {
            name,
            version: server_version,
            protocol_version: version,
            supported_versions,
            capabilities: result.get("capabilities").cloned().unwrap_or(Value::Null),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.transport.session_id()
    }

    /// Builds the `initialize` params object with version-appropriate
    /// field casing (§4.2 "Initialize parameter casing").
    fn initialize_params(&self, client_info: &ClientInfo) -> Value {
        let client_info_value = json!({
            "name": client_info.name,
            "version": client_info.version,
        });
        let capabilities = json!({});

        let mut params = Map::new();
        params.insert("protocolVersion".to_string(), json!(self.version.as_str()));
        if self.version.uses_camel_case_initialize() {
            params.insert("clientInfo".to_string(), client_info_value);
            params.insert("clientCapabilities".to_string(), capabilities);
        } else {
            params.insert("client_info".to_string(), client_info_value);
            params.insert("client_capabilities".to_string(), capabilities);
        }
        Value::Object(params)
    }

    pub async fn initialize(&self, client_info: ClientInfo) -> Result<ServerInfo> {
        self.transport.start().await?;

        let params = self.initialize_params(&client_info);
        let response = self.transport.send_request("initialize", Some(params)).await?;
        let result = unwrap_result(response)?;

        let server_block = result
            .get("serverInfo")
            .or_else(|| result.get("server_info"))
            .cloned()
            .unwrap_or(Value::Null);
        let mut info = Self::parse_server_info(&server_block, self.version);
        info.capabilities = result.get("capabilities").cloned().unwrap_or(Value::Null);

        if let Some(session_id) = result
            .get("sessionId")
            .or_else(|| result.get("session_id"))
            .and_then(Value::as_str)
        {
            self.transport.note_session_id(session_id.to_string()).await;
        }

        *self.server_info.lock().expect("server_info mutex poisoned") = Some(info.clone());
        self.session.lock().expect("session mutex poisoned").mark_initialized(
            self.transport.session_id(),
            self.version,
            Some(info.capabilities.clone()),
        );

        self.transport
            .send_notification(JsonRpcNotification::new("notifications/initialized", None))
            .await?;

        debug!(version = %self.version, "initialize complete");
        Ok(info)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let response = self.transport.send_request("tools/list", None).await?;
        let result = unwrap_result(response)?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| AdapterError::Shape("tools/list result missing 'tools' array".to_string()))?;

        let schema_key = self.version.tool_schema_key();
        tools
            .iter()
            .map(|tool| {
                let name = tool
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AdapterError::Shape("tool descriptor missing 'name'".to_string()))?
                    .to_string();
                let description = tool
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let input_schema = tool.get(schema_key).cloned().unwrap_or(Value::Null);
                Ok(ToolDescriptor { name, description, input_schema })
            })
            .collect()
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let mut params = Map::new();
        params.insert("name".to_string(), json!(name));
        params.insert(self.version.tool_arguments_key().to_string(), arguments);

        let response = self
            .transport
            .send_request("tools/call", Some(Value::Object(params)))
            .await?;
        let result = unwrap_result(response)?;
        Ok(Self::parse_tool_result(&result, self.version))
    }

    fn parse_tool_result(result: &Value, version: ProtocolVersion) -> ToolResult {
        ToolResult {
            content: result.get("content").cloned().unwrap_or(Value::Null),
            structured_content: if version.supports_structured_content() {
                result.get("structuredContent").cloned()
            } else {
                None
            },
            is_error: result.get("isError").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        let response = self.transport.send_request("resources/list", None).await?;
        let result = unwrap_result(response)?;
        let resources = result
            .get("resources")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AdapterError::Shape("resources/list result missing 'resources' array".to_string())
            })?;

        resources
            .iter()
            .map(|resource| {
                let uri = resource
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AdapterError::Shape("resource descriptor missing 'uri'".to_string()))?
                    .to_string();
                Ok(ResourceDescriptor {
                    uri,
                    name: resource.get("name").and_then(Value::as_str).map(str::to_string),
                    description: resource
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            })
            .collect()
    }

    pub async fn get_resource(&self, uri: &str) -> Result<Value> {
        let response = self
            .transport
            .send_request("resources/get", Some(json!({ "uri": uri })))
            .await?;
        unwrap_result(response)
    }

    /// Issues `tools/call-async`, returning the server-assigned invocation id.
    pub async fn call_tool_async(&self, name: &str, arguments: Value) -> Result<String> {
        let mut params = Map::new();
        params.insert("name".to_string(), json!(name));
        params.insert(self.version.tool_arguments_key().to_string(), arguments);

        let response = self
            .transport
            .send_request("tools/call-async", Some(Value::Object(params)))
            .await?;
        let result = unwrap_result(response)?;
        result
            .get("invocationId")
            .or_else(|| result.get("invocation_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Shape("tools/call-async result missing invocation id".to_string()))
    }

    /// Polls `tools/result` for an async invocation's current state.
    pub async fn get_tool_result(&self, invocation_id: &str) -> Result<super::common::AsyncToolPoll> {
        let response = self
            .transport
            .send_request("tools/result", Some(json!({ "invocationId": invocation_id })))
            .await?;
        let result = unwrap_result(response)?;

        let state_str = result
            .get("state")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::Shape("tools/result missing 'state'".to_string()))?;
        let state = match state_str {
            "pending" => super::common::AsyncInvocationState::Pending,
            "running" => super::common::AsyncInvocationState::Running,
            "completed" => super::common::AsyncInvocationState::Completed,
            "cancelled" | "canceled" => super::common::AsyncInvocationState::Cancelled,
            "failed" => super::common::AsyncInvocationState::Failed,
            other => return Err(AdapterError::Shape(format!("unknown invocation state: {other}"))),
        };

        let result_value = result.get("result");
        Ok(super::common::AsyncToolPoll {
            state,
            result: result_value.map(|r| Self::parse_tool_result(r, self.version)),
            error: result.get("error").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Issues `tools/cancel` for an outstanding async invocation.
    pub async fn cancel_tool(&self, invocation_id: &str) -> Result<()> {
        let response = self
            .transport
            .send_request("tools/cancel", Some(json!({ "invocationId": invocation_id })))
            .await?;
        unwrap_result(response)?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self.transport.send_request("ping", Some(json!({}))).await?;
        unwrap_result(response)?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let response = self.transport.send_request("shutdown", None).await?;
        unwrap_result(response)?;
        self.session.lock().expect("session mutex poisoned").state = SessionState::Shutdown;
        Ok(())
    }

    pub async fn exit(&self) -> Result<()> {
        self.transport
            .send_notification(JsonRpcNotification::new("exit", None))
            .await?;
        self.transport.stop().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_params_use_camel_case_only_for_2025_06_18() {
        let adapter = GenericAdapterTestHelper::new(ProtocolVersion::V2025_06_18);
        let params = adapter.initialize_params(&ClientInfo::default());
        assert!(params.get("clientInfo").is_some());
        assert!(params.get("client_info").is_none());

        let adapter = GenericAdapterTestHelper::new(ProtocolVersion::V2024_11_05);
        let params = adapter.initialize_params(&ClientInfo::default());
        assert!(params.get("client_info").is_some());
        assert!(params.get("clientInfo").is_none());
    }

    #[test]
    fn parse_tool_result_surfaces_structured_content_only_under_2025_06_18() {
        let result = json!({
            "content": ["hi"],
            "structuredContent": {"value": 1},
            "isError": false,
        });
        let parsed = GenericAdapter::parse_tool_result(&result, ProtocolVersion::V2025_06_18);
        assert!(parsed.structured_content.is_some());

        let parsed = GenericAdapter::parse_tool_result(&result, ProtocolVersion::V2024_11_05);
        assert!(parsed.structured_content.is_none());
    }

    // A transport-less instance for params-shaping tests only.
    struct GenericAdapterTestHelper;
    impl GenericAdapterTestHelper {
        fn new(version: ProtocolVersion) -> GenericAdapter {
            GenericAdapter::new(Arc::new(NullTransport), version)
        }
    }

    struct NullTransport;
    #[async_trait::async_trait]
    impl Transport for NullTransport {
        async fn start(&self) -> crate::transport::Result<()> {
            Ok(())
        }
        async fn stop(&self) -> crate::transport::Result<()> {
            Ok(())
        }
        async fn send_request(
            &self,
            _method: &str,
            _params: Option<Value>,
        ) -> crate::transport::Result<mcpconform_core::jsonrpc::JsonRpcResponse> {
            unimplemented!("not exercised by params-shaping tests")
        }
        async fn send_notification(&self, _n: JsonRpcNotification) -> crate::transport::Result<()> {
            Ok(())
        }
        async fn send_batch(
            &self,
            _requests: Vec<(String, Option<Value>)>,
        ) -> crate::transport::Result<Vec<mcpconform_core::jsonrpc::JsonRpcResponse>> {
            Ok(vec![])
        }
        fn session_id(&self) -> Option<String> {
            None
        }
        fn transport_kind(&self) -> mcpconform_core::TransportKind {
            mcpconform_core::TransportKind::Stdio
        }
    }
}
