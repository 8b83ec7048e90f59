//! Protocol adapter layer: one [`ProtocolAdapter`] implementation per MCP
//! revision, encapsulating the field-name, casing, and capability
//! differences described in §4.2 behind a single operation set.

mod base;
pub mod common;
pub mod v2024_11_05;
pub mod v2025_03_26;
pub mod v2025_06_18;

use std::sync::Arc;

pub use common::{
    AdapterError, AsyncInvocationState, AsyncToolPoll, ClientInfo, ProtocolAdapter,
    ResourceDescriptor, Result, ServerInfo, ToolDescriptor, ToolResult,
};
pub use v2025_06_18::parse_www_authenticate;

use mcpconform_core::ProtocolVersion;

use crate::transport::Transport;

/// Builds the adapter matching `version`, wrapping `transport`.
#[must_use]
pub fn for_version(version: ProtocolVersion, transport: Arc<dyn Transport>) -> Box<dyn ProtocolAdapter> {
    match version {
        ProtocolVersion::V2024_11_05 => Box::new(v2024_11_05::V2024_11_05Adapter::new(transport)),
        ProtocolVersion::V2025_03_26 => Box::new(v2025_03_26::V2025_03_26Adapter::new(transport)),
        ProtocolVersion::V2025_06_18 => Box::new(v2025_06_18::V2025_06_18Adapter::new(transport)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stdio::{StdioConfig, StdioTransport};

    #[test]
    fn for_version_picks_the_matching_adapter() {
        let transport: Arc<dyn Transport> =
            Arc::new(StdioTransport::new(StdioConfig::new(vec!["true".to_string()])));
        let adapter = for_version(ProtocolVersion::V2025_03_26, transport);
        assert_eq!(adapter.protocol_version(), ProtocolVersion::V2025_03_26);
    }
}
