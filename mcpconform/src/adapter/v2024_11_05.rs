//! The `2024-11-05` adapter: synchronous tools only, snake_case initialize,
//! batching permitted, no OAuth.

use std::sync::Arc;

use serde_json::Value;

use mcpconform_core::ProtocolVersion;

use crate::transport::Transport;

use super::base::GenericAdapter;
use super::common::{
    ClientInfo, ProtocolAdapter, ResourceDescriptor, Result, ServerInfo, ToolDescriptor, ToolResult,
};

/// Adapter for the original `2024-11-05` revision.
pub struct V2024_11_05Adapter {
    base: GenericAdapter,
}

impl V2024_11_05Adapter {
    /// Wraps `transport`, speaking `2024-11-05`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            base: GenericAdapter::new(transport, ProtocolVersion::V2024_11_05),
        }
    }
}

#[async_trait::async_trait]
impl ProtocolAdapter for V2024_11_05Adapter {
    fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::V2024_11_05
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
