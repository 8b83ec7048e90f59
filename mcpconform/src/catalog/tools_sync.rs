//! Synchronous tool conformance: `tools/list` shape, the canonical
//! `echo`/`add`/`sleep` demo tools round-trip, and malformed or unknown
//! tool calls surface the right JSON-RPC error code.

use regex::Regex;
use serde_json::{json, Value};

use mcpconform_core::jsonrpc::error_codes;

use crate::adapter::common::AdapterError;
use crate::catalog::{case, CheckResult, TestCase, TestContext};

/// Numeric-result tolerance for the canonical `add` tool, tight enough to
/// catch a server that truncates float arguments to integers.
const ADD_TOLERANCE: f64 = 1e-4;

/// Digs a number out of a tool result's `content`, whether the server
/// returned it as JSON (`42.5`), a stringified number, or prose containing
/// one (`"the answer is 55.75"`).
fn extract_first_number(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    match value {
        Value::String(s) => s.parse::<f64>().ok().or_else(|| {
            Regex::new(r"-?\d+(?:\.\d+)?")
                .expect("static pattern")
                .find(s)
                .and_then(|m| m.as_str().parse().ok())
        }),
        Value::Array(items) => items.iter().find_map(extract_first_number),
        Value::Object(map) => map.values().find_map(extract_first_number),
        _ => None,
    }
}

async fn tools_list_returns_tools(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    if tools.is_empty() {
        return Err("tools/list returned an empty list".to_string());
    }
    Ok(())
}

async fn echo_tool_round_trips(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(echo) = tools.iter().find(|t| t.name == "echo") else {
        return Ok(()); // server doesn't offer the canonical echo tool
    };
    let message = "Hello, MCP!";
    let result = ctx
        .adapter
        .call_tool(&echo.name, json!({"message": message}))
        .await
        .map_err(|e| e.to_string())?;
    let content = serde_json::to_string(&result.content).unwrap_or_default();
    if content.contains(message) {
        Ok(())
    } else {
        Err(format!("echo result did not contain the input message: {content}"))
    }
}

async fn add_tool_round_trips(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(add) = tools.iter().find(|t| t.name == "add") else {
        return Ok(()); // server doesn't offer the canonical add tool
    };
    let result = ctx
        .adapter
        .call_tool(&add.name, json!({"a": 42.5, "b": 13.25}))
        .await
        .map_err(|e| e.to_string())?;
    let sum = result
        .structured_content
        .as_ref()
        .and_then(extract_first_number)
        .or_else(|| extract_first_number(&result.content))
        .ok_or_else(|| format!("add(42.5, 13.25) result carried no number: {result:?}"))?;
    if (sum - 55.75).abs() <= ADD_TOLERANCE {
        Ok(())
    } else {
        Err(format!("add(42.5, 13.25) returned {sum}, expected 55.75"))
    }
}

async fn sleep_tool_round_trips(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(sleep) = tools.iter().find(|t| t.name == "sleep") else {
        return Ok(()); // server doesn't offer the canonical sleep tool
    };
    ctx.adapter
        .call_tool(&sleep.name, json!({"duration": 0.01}))
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn invalid_arguments_yield_invalid_params(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(tool) = tools.first() else {
        return Ok(());
    };
    let bogus = json!({"__mcpconform_invalid_argument__": {"nested": [1, 2, 3]}});
    match ctx.adapter.call_tool(&tool.name, bogus).await {
        Ok(_) => Err(format!(
            "{} accepted a deliberately malformed argument set",
            tool.name
        )),
        Err(AdapterError::JsonRpc { code, .. }) if code == error_codes::INVALID_PARAMS => Ok(()),
        Err(AdapterError::JsonRpc { code, .. }) => Err(format!(
            "expected error code {} for invalid arguments, got {code}",
            error_codes::INVALID_PARAMS
        )),
        Err(e) => Err(e.to_string()),
    }
}

async fn unknown_tool_is_rejected(ctx: &TestContext<'_>) -> CheckResult {
    match ctx
        .adapter
        .call_tool("__mcpconform_unknown_tool__", json!({}))
        .await
    {
        Ok(_) => Err("call_tool accepted an unknown tool name".to_string()),
        Err(AdapterError::JsonRpc { code, .. })
            if code == error_codes::INVALID_PARAMS || code == error_codes::METHOD_NOT_FOUND =>
        {
            Ok(())
        }
        Err(AdapterError::JsonRpc { code, .. }) => {
            Err(format!("unexpected error code for an unknown tool: {code}"))
        }
        Err(e) => Err(e.to_string()),
    }
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            tools_list_returns_tools,
            "tools::list_returns_tools",
            "tools",
            &[]
        ),
        case!(echo_tool_round_trips, "tools::echo_round_trips", "tools", &[]),
        case!(add_tool_round_trips, "tools::add_round_trips", "tools", &[]),
        case!(
            sleep_tool_round_trips,
            "tools::sleep_round_trips",
            "tools",
            &[]
        ),
        case!(
            invalid_arguments_yield_invalid_params,
            "tools::invalid_arguments_yield_invalid_params",
            "tools",
            &[]
        ),
        case!(
            unknown_tool_is_rejected,
            "tools::unknown_tool_is_rejected",
            "tools",
            &[]
        ),
    ]
}
