//! Round-trips the stdio transport against a trivial NDJSON echo server
//! subprocess, the stdio analogue of `test_http_harness.rs`.

use std::time::Duration;

use serde_json::json;

use mcpconform::transport::stdio::{StdioConfig, StdioTransport};
use mcpconform::transport::Transport;

fn mock_server_command() -> Vec<String> {
    vec![env!("CARGO_BIN_EXE_mock_stdio_server").to_string()]
}

#[tokio::test]
async fn initialize_and_tool_call_round_trip_over_stdio() {
    let mut config = StdioConfig::new(mock_server_command());
    config.request_timeout = Duration::from_secs(5);
    let transport = StdioTransport::new(config);

    transport.start().await.expect("transport should start");

    let init = transport
        .send_request("initialize", Some(json!({"protocolVersion": "2024-11-05"})))
        .await
        .expect("initialize should succeed");
    let result = init.result.expect("initialize should return a result");
    assert_eq!(
        result.get("serverInfo").and_then(|s| s.get("name")).and_then(|n| n.as_str()),
        Some("mock-stdio-server")
    );

    let call = transport
        .send_request(
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"message": "hi"}})),
        )
        .await
        .expect("tools/call should succeed");
    let content = call
        .result
        .expect("tools/call should return a result")
        .get("content")
        .cloned()
        .expect("content field");
    assert_eq!(content[0]["text"], json!("hi"));

    transport.stop().await.expect("transport should stop cleanly");
}

#[tokio::test]
async fn unknown_method_returns_a_json_rpc_error() {
    let transport = StdioTransport::new(StdioConfig::new(mock_server_command()));
    transport.start().await.expect("transport should start");

    let response = transport
        .send_request("nonexistent/method", None)
        .await
        .expect("a JSON-RPC error response is still a successful transport round trip");
    assert!(response.error.is_some());

    transport.stop().await.expect("transport should stop cleanly");
}
