//! Runner (§4.4): builds a transport and adapter from a [`HarnessConfig`],
//! runs the applicable catalog against it in either Isolated or Shared
//! mode, and hands back a [`ResultSet`].
//!
//! Isolated mode pays for a fresh `Transport`/`ProtocolAdapter` pair per
//! test — full `initialize`/`shutdown`/`exit` lifecycle each time — so one
//! test's misbehavior can't corrupt another's session. Shared mode
//! amortizes that cost across the whole catalog and retries the handshake
//! once if a test appears to have wedged the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use mcpconform_core::config::{HarnessConfig, RunMode, TransportKind as ConfigTransportKind};
use mcpconform_core::report::{Outcome, ResultSet, TestResult};

use crate::adapter::{self, ClientInfo};
use crate::catalog::{self, TestCase, TestContext};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::transport::http::{HttpConfig, HttpTransport};
use crate::transport::sse::{SseConfig, SseTransport};
use crate::transport::stdio::{StdioConfig, StdioTransport};
use crate::transport::Transport;

/// Drives one conformance run against the target described by `config`.
pub struct Runner {
    config: HarnessConfig,
}

impl Runner {
    /// Builds a runner for `config`. Does not touch the network/process
    /// until [`Runner::run`] is called.
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Runs every catalog case applicable to `config.protocol_version` and
    /// aggregates the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only when the session couldn't be established at
    /// all (subprocess failed to spawn, server unreachable); individual
    /// test failures are captured as `Fail`/`Error` entries, not propagated.
    pub async fn run(&self) -> Result<ResultSet> {
        let cases = catalog::cases_for_version(self.config.protocol_version);
        info!(
            count = cases.len(),
            version = %self.config.protocol_version,
            mode = ?self.config.mode,
            "running conformance catalog"
        );

        let results = match self.config.mode {
            RunMode::Isolated => self.run_isolated(&cases).await?,
            RunMode::Shared => self.run_shared(&cases).await?,
        };

        Ok(ResultSet::aggregate(
            self.config.protocol_version.as_str(),
            results,
        ))
    }

    async fn run_isolated(&self, cases: &[TestCase]) -> Result<Vec<TestResult>> {
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let transport = self.build_transport()?;
            let outcome = self.run_one_session(&transport, std::slice::from_ref(case)).await;
            match outcome {
                Ok(mut r) => results.append(&mut r),
                Err(e) => results.push(fatal_result(case.name, &e)),
            }
        }
        Ok(results)
    }

    async fn run_shared(&self, cases: &[TestCase]) -> Result<Vec<TestResult>> {
        let transport = self.build_transport()?;
        match self.run_one_session(&transport, cases).await {
            Ok(results) => Ok(results),
            Err(first_err) => {
                warn!(error = %first_err, "shared session failed, retrying initialize once");
                let transport = self.build_transport()?;
                self.run_one_session(&transport, cases)
                    .await
                    .or_else(|second_err| {
                        Ok(cases
                            .iter()
                            .map(|c| fatal_result(c.name, &second_err))
                            .collect())
                    })
            }
        }
    }

    /// Starts `transport`, initializes a session, runs every case in
    /// `cases` sequentially against it, then tears the session down.
    async fn run_one_session(
        &self,
        transport: &Arc<dyn Transport>,
        cases: &[TestCase],
    ) -> Result<Vec<TestResult>> {
        transport.start().await?;
        let adapter = adapter::for_version(self.config.protocol_version, Arc::clone(transport));
        adapter.initialize(ClientInfo::default()).await.map_err(|e| {
            Error::Protocol(format!("initialize failed: {e}"))
        })?;

        let ctx = TestContext {
            adapter: adapter.as_ref(),
            transport,
            version: self.config.protocol_version,
        };

        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(self.run_case(case, &ctx).await);
        }

        let _ = adapter.shutdown().await;
        let _ = adapter.exit().await;
        let _ = transport.stop().await;

        Ok(results)
    }

    /// Runs one case's check body under the per-test deadline, turning a
    /// timeout, an `Err`, or a panic-equivalent into the matching outcome.
    async fn run_case(&self, case: &TestCase, ctx: &TestContext<'_>) -> TestResult {
        let started = Instant::now();
        let deadline = self.config.timeouts.test_timeout;

        let outcome = tokio::time::timeout(deadline, case.run(ctx)).await;
        let duration_seconds = started.elapsed().as_secs_f64();

        let (outcome, message) = match outcome {
            Ok(Ok(())) => (Outcome::Pass, String::new()),
            Ok(Err(message)) => (Outcome::Fail, message),
            Err(_) => (
                Outcome::Error,
                format!("test exceeded its {deadline:?} deadline"),
            ),
        };

        metrics::record_test(
            case.name,
            outcome_label(outcome),
            Duration::from_secs_f64(duration_seconds),
        );

        TestResult {
            name: case.name.to_string(),
            outcome,
            message,
            duration_seconds,
            details: None,
        }
    }

    fn build_transport(&self) -> Result<Arc<dyn Transport>> {
        let timeouts = &self.config.timeouts;
        let bearer_token = self.config.bearer_token.clone();
        let protocol_version_header = self
            .config
            .protocol_version
            .requires_oauth()
            .then(|| self.config.protocol_version.as_str().to_string());

        let transport: Arc<dyn Transport> = match self.config.transport {
            ConfigTransportKind::Stdio => {
                let command = self
                    .config
                    .target
                    .command
                    .clone()
                    .ok_or_else(|| Error::Protocol("stdio transport requires a command".to_string()))?;
                let mut stdio_config = StdioConfig::new(command);
                if let Some(restart) = &self.config.target.restart_command {
                    stdio_config.restart_command = restart.clone();
                }
                stdio_config.request_timeout = timeouts.request_timeout;
                stdio_config.max_retries = timeouts.max_retries;
                Arc::new(StdioTransport::new(stdio_config))
            }
            ConfigTransportKind::Http => {
                let url = self
                    .config
                    .target
                    .url
                    .clone()
                    .ok_or_else(|| Error::Protocol("http transport requires a url".to_string()))?;
                Arc::new(HttpTransport::new(HttpConfig {
                    url,
                    request_timeout: timeouts.request_timeout,
                    bearer_token,
                    protocol_version_header,
                }))
            }
            ConfigTransportKind::HttpSse => {
                let base = self
                    .config
                    .target
                    .url
                    .clone()
                    .ok_or_else(|| Error::Protocol("http+sse transport requires a url".to_string()))?;
                Arc::new(SseTransport::new(SseConfig {
                    message_url: format!("{}/message", base.trim_end_matches('/')),
                    sse_url: format!("{}/sse", base.trim_end_matches('/')),
                    request_timeout: timeouts.request_timeout,
                    connect_timeout: Duration::from_secs(10),
                    max_reconnects: timeouts.max_retries,
                    bearer_token,
                    protocol_version_header,
                }))
            }
        };

        Ok(transport)
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Pass => "pass",
        Outcome::Fail => "fail",
        Outcome::Skip => "skip",
        Outcome::Error => "error",
    }
}

fn fatal_result(name: &str, error: &Error) -> TestResult {
    TestResult {
        name: name.to_string(),
        outcome: Outcome::Error,
        message: error.to_string(),
        duration_seconds: 0.0,
        details: None,
    }
}
