//! Minimal stdio NDJSON MCP server used only by the stdio transport
//! integration test. Reads one JSON-RPC message per line from stdin,
//! answers `initialize`, `tools/list`, `tools/call` (an `echo` tool), and
//! `ping`; everything else gets `METHOD_NOT_FOUND`.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(request) = serde_json::from_str::<Value>(&line) else {
            continue;
        };

        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let id = match request.get("id") {
            Some(id) => id.clone(),
            // Notifications (`notifications/initialized`, etc.) get no reply.
            None => continue,
        };

        let result = match method {
            "initialize" => json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "mock-stdio-server", "version": "0.0.0"},
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
            "ping" | "shutdown" => json!({}),
            _ => {
                let response = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("unknown method {method}")},
                });
                writeln!(stdout, "{response}").ok();
                stdout.flush().ok();
                continue;
            }
        };

        let response = json!({"jsonrpc": "2.0", "id": id, "result": result});
        writeln!(stdout, "{response}").ok();
        stdout.flush().ok();

        if method == "shutdown" {
            break;
        }
    }
}
