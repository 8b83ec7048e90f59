//! End-to-end check of the HTTP transport + adapter + runner against a real
//! (if trivial) in-process MCP server, rather than only mocked transports.

mod common;

use std::time::Duration;

use mcpconform_core::config::{
    HarnessConfig, ObservabilityConfig, RunMode, TargetSpec, TimeoutConfig, TransportKind,
};
use mcpconform_core::ProtocolVersion;

use mcpconform::runner::Runner;

#[tokio::test]
async fn runner_completes_a_catalog_run_against_a_real_http_server() {
    let base_url = common::spawn_mock_server().await;

    let config = HarnessConfig {
        target: TargetSpec {
            command: None,
            restart_command: None,
            url: Some(base_url),
        },
        protocol_version: ProtocolVersion::V2024_11_05,
        transport: TransportKind::Http,
        mode: RunMode::Shared,
        timeouts: TimeoutConfig {
            request_timeout: Duration::from_secs(5),
            test_timeout: Duration::from_secs(5),
            max_retries: 1,
        },
        bearer_token: None,
        observability: ObservabilityConfig::default(),
    };

    let result_set = Runner::new(config).run().await.expect("runner should complete");

    assert!(result_set.total > 0);
    assert_eq!(result_set.protocol_version, "2024-11-05");
    // The mock server doesn't implement every method the catalog probes
    // (async tools, batching, OAuth); this only asserts the run completed
    // end to end without a fatal transport error, not that every case passed.
    assert!(result_set.passed + result_set.failed + result_set.errored + result_set.skipped == result_set.total);
}
