//! The `2025-03-26` adapter: `parameters`-keyed tool calls, background
//! invocation support (`tools/call-async`, `tools/result`, `tools/cancel`).

use std::sync::Arc;

use serde_json::Value;

use mcpconform_core::ProtocolVersion;

use crate::transport::Transport;

use super::base::GenericAdapter;
use super::common::{
    AsyncToolPoll, ClientInfo, ProtocolAdapter, ResourceDescriptor, Result, ServerInfo,
    ToolDescriptor, ToolResult,
};

/// Adapter for the `2025-03-26` revision.
pub struct V2025_03_26Adapter {
    base: GenericAdapter,
}

impl V2025_03_26Adapter {
    /// Wraps `transport`, speaking `2025-03-26`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            base: GenericAdapter::new(transport, ProtocolVersion::V2025_03_26),
        }
    }
}

#[async_trait::async_trait]
impl ProtocolAdapter for V2025_03_26Adapter {
    fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::V2025_03_26
    }

    async fn initialize(&self, client_info: ClientInfo) -> Result<ServerInfo> {
        self.base.initialize(client_info).await
    }

    fn cached_server_info(&self) -> Option<ServerInfo> {
        self.base.cached_server_info()
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        self.base.fetch_server_info().await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.base.list_tools().await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        self.base.call_tool(name, arguments).await
    }

    async fn call_tool_async(&self, name: &str, arguments: Value) -> Result<String> {
        self.base.call_tool_async(name, arguments).await
    }

    async fn get_tool_result(&self, invocation_id: &str) -> Result<AsyncToolPoll> {
        self.base.get_tool_result(invocation_id).await
    }

    async fn cancel_tool(&self, invocation_id: &str) -> Result<()> {
        self.base.cancel_tool(invocation_id).await
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.base.list_resources().await
    }

    async fn get_resource(&self, uri: &str) -> Result<Value> {
        self.base.get_resource(uri).await
    }

    async fn ping(&self) -> Result<()> {
        self.base.ping().await
    }

    async fn shutdown(&self) -> Result<()> {
        self.base.shutdown().await
    }

    async fn exit(&self) -> Result<()> {
        self.base.exit().await
    }

    fn session_id(&self) -> Option<String> {
        self.base.session_id()
    }
}
