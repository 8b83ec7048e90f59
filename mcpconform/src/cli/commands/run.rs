//! `run` command: builds a [`HarnessConfig`], drives the [`Runner`], and
//! renders the resulting [`ResultSet`].

use mcpconform_core::report::{Outcome, ResultSet};

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config;
use crate::error::Result;
use crate::observability::{logging, metrics};
use crate::runner::Runner;

/// Runs the conformance catalog for `args` and returns the process exit
/// code: `0` when every test passed (or was skipped), `1` otherwise.
pub async fn run(args: &RunArgs) -> Result<i32> {
    let harness_config = config::build_config(args)?;

    logging::init_logging(harness_config.observability.log_format, 0);
    if let Some(addr) = harness_config
        .observability
        .metrics_addr
        .as_deref()
        .and_then(|a| a.parse().ok())
    {
        if let Err(e) = metrics::init_metrics(Some(addr)) {
            tracing::warn!(error = %e, "failed to start metrics listener");
        }
    }

    let result_set = Runner::new(harness_config).run().await?;
    render(&result_set, args.format);

    if let Some(path) = &args.output {
        write_to_file(&result_set, path)?;
    }

    Ok(i32::from(!result_set.fully_passed()))
}

fn render(result_set: &ResultSet, format: OutputFormat) {
    match format {
        OutputFormat::Human => render_human(result_set),
        OutputFormat::Json => render_json(result_set),
    }
}

fn render_human(result_set: &ResultSet) {
    println!("Protocol revision: {}", result_set.protocol_version);
    for case in &result_set.results {
        let marker = match case.outcome {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Skip => "SKIP",
            Outcome::Error => "ERR ",
        };
        if case.message.is_empty() {
            println!("  [{marker}] {}", case.name);
        } else {
            println!("  [{marker}] {} — {}", case.name, case.message);
        }
    }
    println!(
        "\n{} total, {} passed, {} failed, {} skipped, {} errored",
        result_set.total,
        result_set.passed,
        result_set.failed,
        result_set.skipped,
        result_set.errored
    );
    println!("compliance score: {:.1}%", result_set.compliance_score);
}

fn render_json(result_set: &ResultSet) {
    match serde_json::to_string_pretty(result_set) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize result set: {e}"),
    }
}

fn write_to_file(result_set: &ResultSet, path: &std::path::Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result_set)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpconform_core::report::TestResult;

    fn sample_result_set() -> ResultSet {
        ResultSet::aggregate(
            "2025-06-18",
            vec![TestResult {
                name: "initialization::handshake_succeeds".to_string(),
                outcome: Outcome::Pass,
                message: String::new(),
                duration_seconds: 0.01,
                details: None,
            }],
        )
    }

    #[test]
    fn render_does_not_panic_in_either_format() {
        let set = sample_result_set();
        render(&set, OutputFormat::Human);
        render(&set, OutputFormat::Json);
    }

    #[test]
    fn write_to_file_round_trips_as_json() {
        let set = sample_result_set();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("result.json");
        write_to_file(&set, &path).expect("write");
        let contents = std::fs::read_to_string(&path).expect("read");
        let parsed: ResultSet = serde_json::from_str(&contents).expect("parse");
        assert_eq!(parsed.protocol_version, set.protocol_version);
    }
}
