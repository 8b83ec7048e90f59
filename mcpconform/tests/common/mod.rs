//! Minimal in-process MCP server used by the transport/adapter integration
//! tests. Speaks `2024-11-05` JSON-RPC over HTTP: `initialize`, `tools/list`,
//! `tools/call` for an `echo` tool, and `shutdown`/`exit`. Just enough
//! surface for `HttpTransport` and `GenericAdapter` to round-trip against a
//! real (if trivial) HTTP server instead of only unit-level mocks.

use std::net::SocketAddr;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone)]
struct MockState {
    session_id: String,
}

/// Starts the mock server on an ephemeral localhost port and returns its
/// base URL (e.g. `http://127.0.0.1:54321`).
pub async fn spawn_mock_server() -> String {
    let state = MockState {
        session_id: format!("mock-session-{}", uuid::Uuid::new_v4()),
    };

    let app = Router::new().route("/", post(handle)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr: SocketAddr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server crashed");
    });

    format!("http://{addr}")
}

async fn handle(State(state): State<MockState>, body: Json<Value>) -> impl IntoResponse {
    let request = body.0;
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    let result = match method {
        "initialize" => json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "mock-mcp-server", "version": "0.0.0"},
            "capabilities": {"tools": {}},
        }),
        "tools/list" => json!({
            "tools": [{
                "name": "echo",
                "description": "echoes its input back",
                "inputSchema": {"type": "object", "properties": {"message": {"type": "string"}}},
            }],
        }),
        "tools/call" => {
            let message = request
                .get("params")
                .and_then(|p| p.get("arguments"))
                .and_then(|a| a.get("message"))
                .cloned()
                .unwrap_or(Value::String(String::new()));
            json!({"content": [{"type": "text", "text": message}], "isError": false})
        }
        "ping" => json!({}),
        "shutdown" | "notifications/initialized" => json!({}),
        _ => {
            return axum::response::Response::builder()
                .header("Mcp-Session-Id", state.session_id.clone())
                .body(axum::body::Body::from(
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32601, "message": format!("unknown method {method}")},
                    })
                    .to_string(),
                ))
                .unwrap();
        }
    };

    axum::response::Response::builder()
        .header("Mcp-Session-Id", state.session_id)
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(
            json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string(),
        ))
        .unwrap()
}
