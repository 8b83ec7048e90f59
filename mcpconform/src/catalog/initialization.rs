//! Handshake conformance: `initialize` succeeds, the cached server info
//! carries the fields the spec requires, version negotiation actually picks
//! the highest mutually supported revision, and a session can't be
//! re-initialized.

use mcpconform_core::ProtocolVersion;

use crate::adapter::common::ClientInfo;
use crate::catalog::{case, CheckResult, TestCase, TestContext};

async fn handshake_succeeds(ctx: &TestContext<'_>) -> CheckResult {
    let info = ctx
        .adapter
        .cached_server_info()
        .ok_or_else(|| "no server info was cached after initialize".to_string())?;
    if info.protocol_version != ctx.version {
        return Err(format!(
            "negotiated {} but the cached server info reports {}",
            ctx.version, info.protocol_version
        ));
    }
    Ok(())
}

async fn server_info_fields_present(ctx: &TestContext<'_>) -> CheckResult {
    let info = ctx
        .adapter
        .cached_server_info()
        .ok_or_else(|| "no server info was cached after initialize".to_string())?;
    if info.name.trim().is_empty() {
        return Err("server info's name field was empty".to_string());
    }
    if info.version.trim().is_empty() {
        return Err("server info's version field was empty".to_string());
    }
    Ok(())
}

async fn version_negotiation_picks_highest_mutual(ctx: &TestContext<'_>) -> CheckResult {
    let info = ctx
        .adapter
        .cached_server_info()
        .ok_or_else(|| "no server info was cached after initialize".to_string())?;
    if info.supported_versions.is_empty() {
        // Server didn't advertise its supported set; nothing to check
        // negotiation against beyond what already succeeded.
        return Ok(());
    }
    match ProtocolVersion::negotiate_highest(&ProtocolVersion::ALL, &info.supported_versions) {
        Some(expected) if expected == info.protocol_version => Ok(()),
        Some(expected) => Err(format!(
            "expected negotiation to settle on {expected}, server reports {}",
            info.protocol_version
        )),
        None => Err("server advertised no revision this harness also supports".to_string()),
    }
}

async fn reinitialize_is_rejected(ctx: &TestContext<'_>) -> CheckResult {
    match ctx.adapter.initialize(ClientInfo::default()).await {
        Ok(_) => {
            Err("server accepted a second initialize on an already-initialized session".to_string())
        }
        Err(_) => Ok(()),
    }
}

pub fn cases() -> Vec<TestCase> {
    vec![
        case!(
            handshake_succeeds,
            "initialization::handshake_succeeds",
            "initialization",
            &[]
        ),
        case!(
            server_info_fields_present,
            "initialization::server_info_fields_present",
            "initialization",
            &[]
        ),
        case!(
            version_negotiation_picks_highest_mutual,
            "initialization::version_negotiation_picks_highest_mutual",
            "initialization",
            &[]
        ),
        case!(
            reinitialize_is_rejected,
            "initialization::reinitialize_is_rejected",
            "initialization",
            &[]
        ),
    ]
}
