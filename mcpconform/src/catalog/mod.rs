//! Test case catalog (§4.3): a declarative registry of named conformance
//! checks. Each case carries the protocol versions it applies to and an
//! async check body; the Runner assembles the catalog once per process and
//! filters it against the session's negotiated version rather than each
//! test file deciding for itself whether to run.

pub mod batching;
pub mod error_handling;
pub mod initialization;
pub mod oauth;
pub mod session_mgmt;
pub mod tools_async;
pub mod tools_sync;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcpconform_core::ProtocolVersion;

use crate::adapter::ProtocolAdapter;
use crate::transport::Transport;

/// Outcome of a single check body. `Err` carries a human-readable failure
/// reason; the Runner attaches timing and turns this into a
/// [`mcpconform_core::report::TestResult`] (§4.4). Check bodies never panic
/// to signal a conformance failure — a panic is treated as a harness bug.
pub type CheckResult = std::result::Result<(), String>;

/// Everything a check body needs: the initialized adapter under test, the
/// transport beneath it (for the error-handling cases that deliberately
/// bypass the adapter to send malformed frames), and the version this run
/// negotiated.
pub struct TestContext<'a> {
    /// The adapter under test. Already past `initialize` when the case runs.
    pub adapter: &'a dyn ProtocolAdapter,
    /// The transport `adapter` wraps.
    pub transport: &'a Arc<dyn Transport>,
    /// The protocol version this run negotiated.
    pub version: ProtocolVersion,
}

type CheckFn =
    for<'a> fn(&'a TestContext<'a>) -> Pin<Box<dyn Future<Output = CheckResult> + Send + 'a>>;

/// One named conformance check.
#[derive(Clone, Copy)]
pub struct TestCase {
    /// Stable name, reported in results and `list-tests`.
    pub name: &'static str,
    /// Grouping label, matching the catalog submodule the case lives in.
    pub group: &'static str,
    /// Revisions this case applies to. Empty means version-independent.
    pub versions: &'static [ProtocolVersion],
    check: CheckFn,
}

impl TestCase {
    /// True when `version` is in this case's applicable set, or the set is
    /// empty (version-independent).
    #[must_use]
    pub fn applies_to(&self, version: ProtocolVersion) -> bool {
        self.versions.is_empty() || self.versions.contains(&version)
    }

    /// Runs this case's check body.
    pub async fn run(&self, ctx: &TestContext<'_>) -> CheckResult {
        (self.check)(ctx).await
    }
}

/// Defines a [`TestCase`] from an async check function, handling the
/// function-pointer-to-boxed-future coercion every case needs.
macro_rules! case {
    ($check_fn:ident, $name:expr, $group:expr, $versions:expr) => {{
        fn boxed<'a>(
            ctx: &'a $crate::catalog::TestContext<'a>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = $crate::catalog::CheckResult> + Send + 'a>,
        > {
            Box::pin($check_fn(ctx))
        }
        $crate::catalog::TestCase {
            name: $name,
            group: $group,
            versions: $versions,
            check: boxed,
        }
    }};
}
pub(crate) use case;

/// Every conformance check known to this build, in catalog order.
#[must_use]
pub fn all_cases() -> Vec<TestCase> {
    let mut cases = Vec::new();
    cases.extend(initialization::cases());
    cases.extend(tools_sync::cases());
    cases.extend(tools_async::cases());
    cases.extend(error_handling::cases());
    cases.extend(batching::cases());
    cases.extend(session_mgmt::cases());
    cases.extend(oauth::cases());
    cases
}

/// The subset of [`all_cases`] applicable to `version`.
#[must_use]
pub fn cases_for_version(version: ProtocolVersion) -> Vec<TestCase> {
    all_cases()
        .into_iter()
        .filter(|c| c.applies_to(version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_case_has_a_unique_name() {
        let cases = all_cases();
        let mut names: Vec<&str> = cases.iter().map(|c| c.name).collect();
        names.sort_unstable();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate test case name");
    }

    #[test]
    fn version_independent_cases_apply_everywhere() {
        let cases = all_cases();
        for version in ProtocolVersion::ALL {
            let applicable = cases_for_version(version);
            assert!(!applicable.is_empty(), "no cases applicable to {version}");
        }
    }

    #[test]
    fn async_tool_cases_only_apply_to_2025_03_26() {
        for case in tools_async::cases() {
            assert!(case.applies_to(ProtocolVersion::V2025_03_26));
            assert!(!case.applies_to(ProtocolVersion::V2024_11_05));
            assert!(!case.applies_to(ProtocolVersion::V2025_06_18));
        }
    }

    #[test]
    fn oauth_cases_only_apply_to_2025_06_18() {
        for case in oauth::cases() {
            assert!(case.applies_to(ProtocolVersion::V2025_06_18));
            assert!(!case.applies_to(ProtocolVersion::V2024_11_05));
        }
    }
}
