//! Batch-frame conformance: legacy revisions answer a batch with one
//! response per request; `2025-06-18` refuses batching outright (§4.2).

use serde_json::Value;

use mcpconform_core::jsonrpc::error_codes;
use mcpconform_core::ProtocolVersion;

use crate::catalog::{case, CheckResult, TestCase, TestContext};
use crate::error::TransportError;

async fn batch_of_pings_returns_matching_responses(ctx: &TestContext<'_>) -> CheckResult {
    let requests = vec![
        ("ping".to_string(), None::<Value>),
        ("ping".to_string(), None::<Value>),
    ];
    let responses = ctx
        .transport
        .send_batch(requests)
        .await
        .map_err(|e| e.to_string())?;
    if responses.len() != 2 {
        return Err(format!(
            "expected 2 responses for a 2-request batch, got {}",
            responses.len()
        ));
    }
    for response in &responses {
        if !response.is_shape_valid() {
            return Err("a batch response violated the result/error shape invariant".to_string());
        }
    }
    Ok(())
}

async fn batching_is_refused_under_2025_06_18(ctx: &TestContext<'_>) -> CheckResult {
    let requests = vec![
        ("ping".to_string(), None::<Value>),
        ("ping".to_string(), None::<Value>),
    ];
    match ctx.transport.send_batch(requests).await {
        Err(TransportError::Http { status, body }) if status == 400 => {
            verify_batch_rejection_body(&body)
        }
        Err(TransportError::Unsupported(_)) => Ok(()),
        Ok(responses) => Err(format!(
            "server accepted a batch under 2025-06-18, returning {} responses",
            responses.len()
        )),
        Err(e) => Err(e.to_string()),
    }
}

/// Confirms a 400's body is a JSON-RPC error naming `INVALID_REQUEST` and
/// mentioning batching, rather than just trusting the status code.
fn verify_batch_rejection_body(body: &str) -> CheckResult {
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("400 body wasn't valid JSON: {e}"))?;
    let error = value
        .get("error")
        .ok_or_else(|| "400 body carried no JSON-RPC error object".to_string())?;
    let code = error.get("code").and_then(Value::as_i64);
    if code != Some(error_codes::INVALID_REQUEST) {
        return Err(format!(
            "expected error.code {}, got {code:?}",
            error_codes::INVALID_REQUEST
        ));
    }
    let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
    if !message.to_ascii_lowercase().contains("batch") {
        return Err(format!("error.message didn't mention batching: {message:?}"));
    }
    Ok(())
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            batch_of_pings_returns_matching_responses,
            "batching::batch_of_pings_returns_matching_responses",
            "batching",
            &[ProtocolVersion::V2024_11_05, ProtocolVersion::V2025_03_26]
        ),
        case!(
            batching_is_refused_under_2025_06_18,
            "batching::refused_under_2025_06_18",
            "batching",
            &[ProtocolVersion::V2025_06_18]
        ),
    ]
}
