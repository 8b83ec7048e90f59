//! The `2025-06-18` adapter: camelCase initialize, structured content,
//! elicitation capability passthrough, OAuth 2.1 bearer tokens, batching
//! forbidden at the client.

use std::sync::Arc;

use serde_json::Value;

use mcpconform_core::ProtocolVersion;

use crate::transport::Transport;

use super::base::GenericAdapter;
use super::common::{
    ClientInfo, ProtocolAdapter, ResourceDescriptor, Result, ServerInfo, ToolDescriptor, ToolResult,
};

/// Adapter for the `2025-06-18` revision.
pub struct V2025_06_18Adapter {
    base: GenericAdapter,
}

impl V2025_06_18Adapter {
    /// Wraps `transport`, speaking `2025-06-18`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            base: GenericAdapter::new(transport, ProtocolVersion::V2025_06_18),
        }
    }
}

/// Parses an OAuth 2.1 `WWW-Authenticate: Bearer realm="…", error="…"`
/// challenge header into its component directives.
///
/// Used by the OAuth conformance tests (§4.3) to confirm a 401 carries a
/// conformant challenge rather than an opaque rejection.
#[must_use]
pub fn parse_www_authenticate(header: &str) -> std::collections::HashMap<String, String> {
    let mut directives = std::collections::HashMap::new();
    let Some(rest) = header.strip_prefix("Bearer ") else {
        return directives;
    };
    for part in rest.split(',') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            directives.insert(key.trim().to_string(), value.to_string());
        }
    }
    directives
}

#[async_trait::async_trait]
impl ProtocolAdapter for V2025_06_18Adapter {
    fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::V2025_06_18
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_challenge_directives() {
        let directives = parse_www_authenticate(
            r#"Bearer realm="mcp", error="invalid_token", error_description="expired""#,
        );
        assert_eq!(directives.get("realm").map(String::as_str), Some("mcp"));
        assert_eq!(directives.get("error").map(String::as_str), Some("invalid_token"));
    }

    #[test]
    fn non_bearer_challenge_yields_empty_map() {
        assert!(parse_www_authenticate("Basic realm=\"x\"").is_empty());
    }
}
