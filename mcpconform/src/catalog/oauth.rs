//! OAuth 2.1 conformance, `2025-06-18` only: a session that reached this
//! case already completed `initialize` under whatever bearer token this run
//! was configured with, so the meaningful checks left are that the token
//! was actually required (a forged session doesn't get waved through) and
//! that auth failures keep using the reserved JSON-RPC auth-error code
//! rather than falling back to a generic internal error.

use mcpconform_core::jsonrpc::error_codes;
use mcpconform_core::ProtocolVersion;

use crate::adapter::parse_www_authenticate;
use crate::catalog::{case, CheckResult, TestCase, TestContext};
use crate::error::TransportError;

const VERSIONS: &[ProtocolVersion] = &[ProtocolVersion::V2025_06_18];

async fn configured_bearer_token_is_accepted(ctx: &TestContext<'_>) -> CheckResult {
    ctx.adapter.ping().await.map(|_| ()).map_err(|e| e.to_string())
}

async fn forged_session_is_rejected_with_auth_error(ctx: &TestContext<'_>) -> CheckResult {
    let Some(real_session) = ctx.transport.session_id() else {
        return Ok(());
    };

    ctx.transport
        .note_session_id("mcpconform-oauth-forged-session".to_string())
        .await;
    let outcome = ctx
        .transport
        .send_request("ping", Some(serde_json::json!({})))
        .await;
    ctx.transport.note_session_id(real_session).await;

    match outcome {
        Ok(response) => match response.error_code() {
            Some(code) if code == error_codes::AUTH_ERROR || code == error_codes::SESSION_EXPIRED => {
                Ok(())
            }
            Some(code) => Err(format!("expected an auth-rejection code, got {code}")),
            None => Err("server accepted a forged session under an OAuth-required revision".to_string()),
        },
        Err(TransportError::Auth(_)) => Ok(()),
        Err(TransportError::Http { status, .. }) if status == 401 => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

async fn missing_token_is_rejected_with_a_challenge(ctx: &TestContext<'_>) -> CheckResult {
    let response = ctx
        .transport
        .send_unauthenticated("ping", Some(serde_json::json!({})))
        .await
        .map_err(|e| e.to_string())?;

    let error = response
        .error
        .ok_or_else(|| "server accepted a request with no Authorization header".to_string())?;
    if error.code != error_codes::AUTH_ERROR {
        return Err(format!("expected {}, got {}", error_codes::AUTH_ERROR, error.code));
    }

    let challenge = error
        .data
        .as_ref()
        .and_then(|d| d.get("www_authenticate"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| "401 response carried no WWW-Authenticate challenge".to_string())?;

    let directives = parse_www_authenticate(challenge);
    if directives.is_empty() {
        return Err(format!("WWW-Authenticate challenge didn't parse: {challenge}"));
    }
    Ok(())
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            configured_bearer_token_is_accepted,
            "oauth::configured_bearer_token_is_accepted",
            "oauth",
            VERSIONS
        ),
        case!(
            forged_session_is_rejected_with_auth_error,
            "oauth::forged_session_is_rejected_with_auth_error",
            "oauth",
            VERSIONS
        ),
        case!(
            missing_token_is_rejected_with_a_challenge,
            "oauth::missing_token_is_rejected_with_a_challenge",
            "oauth",
            VERSIONS
        ),
    ]
}
