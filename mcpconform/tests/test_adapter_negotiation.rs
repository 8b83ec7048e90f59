//! Confirms `adapter::for_version` produces a working adapter for each of
//! the three protocol revisions against the same HTTP transport, since the
//! wire-format differences (camelCase vs snake_case initialize, structured
//! content) live entirely in the adapter layer, not the transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use mcpconform_core::ProtocolVersion;

use mcpconform::adapter::{self, ClientInfo};
use mcpconform::transport::http::{HttpConfig, HttpTransport};
use mcpconform::transport::Transport;

async fn connected_transport(base_url: String) -> Arc<dyn Transport> {
    let transport = Arc::new(HttpTransport::new(HttpConfig {
        url: base_url,
        request_timeout: Duration::from_secs(5),
        bearer_token: None,
        protocol_version_header: None,
    }));
    transport.start().await.expect("transport should start");
    transport
}

#[tokio::test]
async fn every_protocol_revision_can_complete_a_handshake() {
    let base_url = common::spawn_mock_server().await;

    for version in [
        ProtocolVersion::V2024_11_05,
        ProtocolVersion::V2025_03_26,
        ProtocolVersion::V2025_06_18,
    ] {
        let transport = connected_transport(base_url.clone()).await;
        let adapter = adapter::for_version(version, Arc::clone(&transport));

        let server_info = adapter
            .initialize(ClientInfo::default())
            .await
            .unwrap_or_else(|e| panic!("{version} initialize failed: {e}"));
        assert_eq!(server_info.name, "mock-mcp-server");

        let tools = adapter
            .list_tools()
            .await
            .unwrap_or_else(|e| panic!("{version} list_tools failed: {e}"));
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");

        let _ = adapter.shutdown().await;
        let _ = transport.stop().await;
    }
}
