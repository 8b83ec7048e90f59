//! Result structure consumed by the Report Aggregator and external reporters.
//!
//! These types are the well-typed boundary the harness hands off across: the
//! core subsystems never render Markdown/HTML themselves (§6 External
//! Interfaces treats rendering as an external collaborator), they only ever
//! produce a [`ResultSet`] that an external reporter can serialize.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The test's assertions held.
    Pass,
    /// The test ran and a protocol expectation was not met.
    Fail,
    /// The test does not apply to the active protocol version.
    Skip,
    /// The test function itself raised/panicked, or a fatal transport error
    /// aborted the run before the test could evaluate anything.
    Error,
}

impl Outcome {
    /// Whether this outcome counts toward the compliance score denominator
    /// (everything except `Skip`).
    #[must_use]
    pub const fn counts_toward_score(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Result of running one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Test case name, stable across runs.
    pub name: String,
    /// Pass/fail/skip/error outcome.
    pub outcome: Outcome,
    /// Human-readable explanation.
    pub message: String,
    /// Wall-clock duration of the test function.
    pub duration_seconds: f64,
    /// Optional structured payload (e.g. captured request/response pairs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Aggregated outcome of an entire catalog run against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Protocol revision the run was scored against.
    pub protocol_version: String,
    /// Total test cases considered (including skipped).
    pub total: usize,
    /// Count of `Pass` outcomes.
    pub passed: usize,
    /// Count of `Fail` outcomes.
    pub failed: usize,
    /// Count of `Skip` outcomes.
    pub skipped: usize,
    /// Count of `Error` outcomes.
    pub errored: usize,
    /// `passed / (total - skipped) * 100`, or `100.0` if every test was skipped.
    pub compliance_score: f64,
    /// Per-test detail, in the order the catalog ran them.
    pub results: Vec<TestResult>,
}

impl ResultSet {
    /// Builds a [`ResultSet`] from the raw per-test results of one run.
    #[must_use]
    pub fn aggregate(protocol_version: impl Into<String>, results: Vec<TestResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.outcome == Outcome::Pass).count();
        let failed = results.iter().filter(|r| r.outcome == Outcome::Fail).count();
        let skipped = results.iter().filter(|r| r.outcome == Outcome::Skip).count();
        let errored = results.iter().filter(|r| r.outcome == Outcome::Error).count();

        let denominator = total - skipped;
        let compliance_score = if denominator == 0 {
            100.0
        } else {
            (passed as f64 / denominator as f64) * 100.0
        };

        Self {
            protocol_version: protocol_version.into(),
            total,
            passed,
            failed,
            skipped,
            errored,
            compliance_score,
            results,
        }
    }

    /// Exit-code-worthy verdict: `true` when no test failed or errored.
    #[must_use]
    pub const fn fully_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: Outcome) -> TestResult {
        TestResult {
            name: name.to_string(),
            outcome,
            message: String::new(),
            duration_seconds: 0.01,
            details: None,
        }
    }

    #[test]
    fn compliance_score_excludes_skipped_from_denominator() {
        let results = vec![
            result("a", Outcome::Pass),
            result("b", Outcome::Pass),
            result("c", Outcome::Fail),
            result("d", Outcome::Skip),
        ];
        let set = ResultSet::aggregate("2025-06-18", results);
        assert_eq!(set.total, 4);
        assert_eq!(set.skipped, 1);
        assert!((set.compliance_score - (2.0 / 3.0 * 100.0)).abs() < 1e-9);
        assert!(!set.fully_passed());
    }

    #[test]
    fn all_skipped_scores_full_marks() {
        let results = vec![result("a", Outcome::Skip), result("b", Outcome::Skip)];
        let set = ResultSet::aggregate("2025-03-26", results);
        assert!((set.compliance_score - 100.0).abs() < 1e-9);
        assert!(set.fully_passed());
    }

    #[test]
    fn errored_test_fails_the_run() {
        let results = vec![result("a", Outcome::Error)];
        let set = ResultSet::aggregate("2024-11-05", results);
        assert!(!set.fully_passed());
    }
}
