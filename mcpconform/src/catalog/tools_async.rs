//! Asynchronous tool invocation conformance, `2025-03-26` only: the
//! capability is advertised, `tools/call-async` hands back an invocation id,
//! polling reaches `completed`, and a long-running call can be cancelled.

use std::time::Duration;

use serde_json::json;

use mcpconform_core::ProtocolVersion;

use crate::adapter::common::AsyncInvocationState;
use crate::catalog::{case, CheckResult, TestCase, TestContext};

const VERSIONS: &[ProtocolVersion] = &[ProtocolVersion::V2025_03_26];

fn advertises_async(capabilities: &serde_json::Value) -> bool {
    capabilities
        .get("tools")
        .and_then(|t| t.get("async"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
        || capabilities
            .get("asyncTools")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
}

async fn async_capability_is_advertised(ctx: &TestContext<'_>) -> CheckResult {
    let info = ctx
        .adapter
        .cached_server_info()
        .ok_or_else(|| "no server info was cached after initialize".to_string())?;
    if advertises_async(&info.capabilities) {
        Ok(())
    } else {
        Err("capabilities did not advertise asynchronous tool invocation".to_string())
    }
}

async fn call_tool_async_returns_invocation_id(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let tool = tools
        .iter()
        .find(|t| t.name == "sleep")
        .or_else(|| tools.first())
        .ok_or_else(|| "server advertised no tools to invoke".to_string())?;
    let invocation_id = ctx
        .adapter
        .call_tool_async(&tool.name, json!({"duration": 0.05}))
        .await
        .map_err(|e| e.to_string())?;
    if invocation_id.trim().is_empty() {
        return Err("call_tool_async returned an empty invocation id".to_string());
    }
    let _ = ctx.adapter.cancel_tool(&invocation_id).await;
    Ok(())
}

async fn polling_reaches_completed(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let tool = tools
        .iter()
        .find(|t| t.name == "echo")
        .or_else(|| tools.first())
        .ok_or_else(|| "server advertised no tools to invoke".to_string())?;
    let invocation_id = ctx
        .adapter
        .call_tool_async(&tool.name, json!({"message": "mcpconform-async-probe"}))
        .await
        .map_err(|e| e.to_string())?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let poll = ctx
            .adapter
            .get_tool_result(&invocation_id)
            .await
            .map_err(|e| e.to_string())?;
        match poll.state {
            AsyncInvocationState::Completed => return Ok(()),
            AsyncInvocationState::Failed => {
                return Err(poll
                    .error
                    .unwrap_or_else(|| "invocation failed with no error message".to_string()));
            }
            AsyncInvocationState::Cancelled => {
                return Err("invocation was cancelled before it could complete".to_string());
            }
            AsyncInvocationState::Pending | AsyncInvocationState::Running => {
                if tokio::time::Instant::now() >= deadline {
                    return Err("invocation did not reach completed within the polling deadline".to_string());
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn long_running_call_can_be_cancelled(ctx: &TestContext<'_>) -> CheckResult {
    let tools = ctx.adapter.list_tools().await.map_err(|e| e.to_string())?;
    let Some(tool) = tools.iter().find(|t| t.name == "sleep") else {
        return Ok(()); // no long-running tool available to cancel
    };
    let invocation_id = ctx
        .adapter
        .call_tool_async(&tool.name, json!({"duration": 10.0}))
        .await
        .map_err(|e| e.to_string())?;
    ctx.adapter
        .cancel_tool(&invocation_id)
        .await
        .map_err(|e| e.to_string())?;

    let poll = ctx
        .adapter
        .get_tool_result(&invocation_id)
        .await
        .map_err(|e| e.to_string())?;
    match poll.state {
        AsyncInvocationState::Cancelled => Ok(()),
        other => Err(format!("expected Cancelled after cancel_tool, got {other:?}")),
    }
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            async_capability_is_advertised,
            "tools_async::capability_is_advertised",
            "tools_async",
            VERSIONS
        ),
        case!(
            call_tool_async_returns_invocation_id,
            "tools_async::call_tool_async_returns_invocation_id",
            "tools_async",
            VERSIONS
        ),
        case!(
            polling_reaches_completed,
            "tools_async::polling_reaches_completed",
            "tools_async",
            VERSIONS
        ),
        case!(
            long_running_call_can_be_cancelled,
            "tools_async::long_running_call_can_be_cancelled",
            "tools_async",
            VERSIONS
        ),
    ]
}
