//! Harness run configuration schema (file < env < CLI precedence).
//!
//! Deserialized from an optional YAML file first, then the loader in the
//! `mcpconform` binary layers environment variables and CLI flags on top.
//! This module only owns the shape and its self-consistency check; reading
//! files/env/argv lives with the CLI since that's where the precedence
//! chain is assembled.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::version::ProtocolVersion;

/// How the harness reaches the target server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Line-delimited JSON over a child process's stdin/stdout.
    Stdio,
    /// Synchronous HTTP POST with the JSON-RPC response in the body.
    Http,
    /// Asynchronous HTTP POST (`202 Accepted`) with the response delivered
    /// later over a Server-Sent-Events stream.
    HttpSse,
}

/// Whether the Runner tears the session down between tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Fresh transport + session for every test.
    Isolated,
    /// One session reused across the whole catalog.
    Shared,
}

impl Default for RunMode {
    fn default() -> Self {
        Self::Shared
    }
}

/// Where the target server lives: a subprocess command line, or a URL.
/// Exactly one of the two must be set — enforced by [`HarnessConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Subprocess command line, e.g. `["python", "server.py"]`. Used with
    /// [`TransportKind::Stdio`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Command used to restart a crashed child (defaults to `command`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<Vec<String>>,
    /// Base URL of the target server. Used with [`TransportKind::Http`] and
    /// [`TransportKind::HttpSse`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, colorized when stderr is a terminal.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Logging and metrics toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    #[serde(default)]
    pub verbosity: u8,
    /// Output format for log lines.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Explicit `tracing` filter directive, overriding the verbosity mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Bind a Prometheus metrics exporter on this address (e.g. `127.0.0.1:9090`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<String>,
}

/// Timeouts and retry policy, all transport- and test-level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Per-request deadline (default 10s, per TJ-style stdio default).
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Per-test deadline wrapping the whole test function (default 30s).
    #[serde(with = "duration_secs")]
    pub test_timeout: Duration,
    /// Retry count for broken pipe / empty read / SSE reconnect.
    pub max_retries: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            test_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Full configuration for one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// How to reach the target.
    pub target: TargetSpec,
    /// Protocol revision to test against.
    pub protocol_version: ProtocolVersion,
    /// Wire transport to use.
    pub transport: TransportKind,
    /// Isolated vs shared session reuse.
    #[serde(default)]
    pub mode: RunMode,
    /// Timeouts and retry policy.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Bearer token for OAuth-gated (`2025-06-18`) servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Logging/metrics toggles.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// A self-consistency violation in an assembled [`HarnessConfig`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a command nor a URL was given.
    #[error("no target specified: provide either a subprocess command or a URL")]
    NoTarget,
    /// Both a command and a URL were given.
    #[error("ambiguous target: a subprocess command and a URL were both specified")]
    AmbiguousTarget,
    /// `transport: stdio` was paired with a URL target, or vice versa.
    #[error("transport {transport:?} is incompatible with the given target")]
    TransportTargetMismatch {
        /// The transport kind that doesn't match the target shape.
        transport: TransportKind,
    },
    /// `2025-06-18` requires a bearer token when talking to an OAuth-gated server.
    #[error("protocol version 2025-06-18 test requires --token for the OAuth conformance tests")]
    MissingBearerTokenForOAuth,
}

impl HarnessConfig {
    /// Validates that `target` and `transport` agree, and that version-specific
    /// requirements (OAuth token) are satisfiable. Does not reach the network.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_command = self.target.command.is_some();
        let has_url = self.target.url.is_some();

        match (has_command, has_url) {
            (false, false) => return Err(ConfigError::NoTarget),
            (true, true) => return Err(ConfigError::AmbiguousTarget),
            _ => {}
        }

        match self.transport {
            TransportKind::Stdio if !has_command => {
                return Err(ConfigError::TransportTargetMismatch {
                    transport: self.transport,
                });
            }
            TransportKind::Http | TransportKind::HttpSse if !has_url => {
                return Err(ConfigError::TransportTargetMismatch {
                    transport: self.transport,
                });
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> HarnessConfig {
        HarnessConfig {
            target: TargetSpec {
                command: Some(vec!["python".to_string(), "server.py".to_string()]),
                restart_command: None,
                url: None,
            },
            protocol_version: ProtocolVersion::V2024_11_05,
            transport: TransportKind::Stdio,
            mode: RunMode::Shared,
            timeouts: TimeoutConfig::default(),
            bearer_token: None,
            observability: ObservabilityConfig::default(),
        }
    }

    #[test]
    fn valid_stdio_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn no_target_is_rejected() {
        let mut cfg = base_config();
        cfg.target.command = None;
        assert_eq!(cfg.validate(), Err(ConfigError::NoTarget));
    }

    #[test]
    fn both_command_and_url_is_rejected() {
        let mut cfg = base_config();
        cfg.target.url = Some("http://localhost:8080/mcp".to_string());
        assert_eq!(cfg.validate(), Err(ConfigError::AmbiguousTarget));
    }

    #[test]
    fn stdio_transport_with_url_target_is_rejected() {
        let mut cfg = base_config();
        cfg.target.command = None;
        cfg.target.url = Some("http://localhost:8080/mcp".to_string());
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TransportTargetMismatch {
                transport: TransportKind::Stdio
            })
        );
    }

    #[test]
    fn yaml_roundtrip() {
        let cfg = base_config();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: HarnessConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.protocol_version, cfg.protocol_version);
        assert_eq!(parsed.transport, cfg.transport);
    }
}
