//! Error-shape conformance: malformed frames, unknown methods, and invalid
//! parameters surface the JSON-RPC codes §6 reserves for them.
//!
//! The malformed-frame cases bypass the adapter and go straight through
//! [`Transport::send_raw`], which only the synchronous HTTP transport
//! implements — stdio and SSE report [`TransportError::Unsupported`] and the
//! case is treated as inapplicable rather than failed.

use serde_json::{json, Value};

use mcpconform_core::jsonrpc::{error_codes, JsonRpcMessage};

use crate::catalog::{case, CheckResult, TestCase, TestContext};
use crate::error::TransportError;

fn expect_raw_error_code(body: &str, expected: i64) -> CheckResult {
    let message: JsonRpcMessage = serde_json::from_str(body)
        .map_err(|e| format!("raw response wasn't a JSON-RPC frame: {e} (body: {body})"))?;
    match message {
        JsonRpcMessage::Response(response) => match response.error_code() {
            Some(code) if code == expected => Ok(()),
            Some(code) => Err(format!("expected error code {expected}, got {code}")),
            None => Err("raw response carried no error object".to_string()),
        },
        other => Err(format!("expected a response frame, got {other:?}")),
    }
}

async fn malformed_json_yields_parse_error(ctx: &TestContext<'_>) -> CheckResult {
    match ctx.transport.send_raw("{not valid json at all").await {
        Ok(body) => expect_raw_error_code(&body, error_codes::PARSE_ERROR),
        Err(TransportError::Unsupported(_)) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

async fn missing_jsonrpc_field_yields_invalid_request(ctx: &TestContext<'_>) -> CheckResult {
    let payload = json!({"method": "ping", "id": "mcpconform-missing-version", "params": {}}).to_string();
    match ctx.transport.send_raw(&payload).await {
        Ok(body) => expect_raw_error_code(&body, error_codes::INVALID_REQUEST),
        Err(TransportError::Unsupported(_)) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

async fn unknown_method_yields_method_not_found(ctx: &TestContext<'_>) -> CheckResult {
    let response = ctx
        .transport
        .send_request("__mcpconform_unknown_method__", Some(json!({})))
        .await
        .map_err(|e| e.to_string())?;
    match response.error_code() {
        Some(code) if code == error_codes::METHOD_NOT_FOUND => Ok(()),
        Some(code) => Err(format!("expected method-not-found, got {code}")),
        None => Err("server accepted a call to an unknown method".to_string()),
    }
}

async fn invalid_params_yields_invalid_params_code(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(tool) = tools.first() else {
        return Ok(()); // nothing to call with malformed arguments
    };
    let mut params = serde_json::Map::new();
    params.insert("name".to_string(), json!(tool.name));
    params.insert(
        ctx.version.tool_arguments_key().to_string(),
        json!("not-an-object"),
    );
    let response = ctx
        .transport
        .send_request("tools/call", Some(Value::Object(params)))
        .await
        .map_err(|e| e.to_string())?;
    match response.error_code() {
        Some(code) if code == error_codes::INVALID_PARAMS => Ok(()),
        Some(code) => Err(format!("expected invalid-params, got {code}")),
        None => Err("server accepted malformed tool call arguments".to_string()),
    }
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            malformed_json_yields_parse_error,
            "error_handling::malformed_json_yields_parse_error",
            "error_handling",
            &[]
        ),
        case!(
            missing_jsonrpc_field_yields_invalid_request,
            "error_handling::missing_jsonrpc_field_yields_invalid_request",
            "error_handling",
            &[]
        ),
        case!(
            unknown_method_yields_method_not_found,
            "error_handling::unknown_method_yields_method_not_found",
            "error_handling",
            &[]
        ),
        case!(
            invalid_params_yields_invalid_params_code,
            "error_handling::invalid_params_yields_invalid_params_code",
            "error_handling",
            &[]
        ),
    ]
}
