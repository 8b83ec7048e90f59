//! Builds a [`HarnessConfig`] from a `run` invocation's CLI args, an
//! optional YAML file, and environment variables.
//!
//! Precedence, lowest to highest: built-in defaults < YAML file <
//! environment variables < explicit CLI flags. `clap`'s `env` attribute
//! already resolves CLI-vs-env for
//! `--url`/`--token`/`--config`/`--color`/`--version` (args.rs); this
//! loader handles the remaining environment variables
//! (`MCP_LOG_FORMAT`, `MCP_LOG_LEVEL`, `MCP_METRICS_ADDR`,
//! `MCP_SERVER_COMMAND`) and the YAML file layer underneath everything.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use mcpconform_core::config::{
    HarnessConfig, LogFormat, ObservabilityConfig, TargetSpec, TimeoutConfig,
};

use crate::cli::args::{RunArgs, TransportArg};
use crate::error::{Error, Result};
use crate::observability::logging;

/// Partial configuration read from an optional YAML file. Every field is
/// optional; a field left unset here falls through to the environment or
/// CLI layer, and ultimately to `HarnessConfig`'s own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct FileConfig {
    #[serde(default)]
    target_command: Option<Vec<String>>,
    #[serde(default)]
    restart_command: Option<Vec<String>>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    bearer_token: Option<String>,
    #[serde(default)]
    test_timeout_secs: Option<f64>,
    #[serde(default)]
    log_format: Option<LogFormat>,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    metrics_addr: Option<String>,
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Assembles a [`HarnessConfig`] from `args`, validating it before returning.
///
/// # Errors
///
/// Returns [`Error::Io`]/[`Error::Yaml`] if `--config` names a file that
/// can't be read or parsed, and [`Error::Config`] if the assembled
/// configuration is self-contradictory (e.g. no target, or a transport
/// mismatched with the target shape).
pub fn build_config(args: &RunArgs) -> Result<HarnessConfig> {
    let file = match &args.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let target_command = (!args.target_command.is_empty())
        .then(|| args.target_command.clone())
        .or(file.target_command);
    let url = args.url.clone().or(file.url);

    // `--transport` is optional; when the caller didn't pin one down,
    // infer it from the shape of the target rather than always falling
    // back to stdio.
    let transport = args
        .transport
        .unwrap_or(if url.is_some() { TransportArg::Http } else { TransportArg::Stdio });

    let log_format = std::env::var("MCP_LOG_FORMAT")
        .ok()
        .and_then(|v| match v.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "human" => Some(LogFormat::Human),
            _ => None,
        })
        .or(file.log_format)
        .unwrap_or_else(logging::default_format);

    let restart_command = std::env::var("MCP_SERVER_COMMAND")
        .ok()
        .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
        .or(file.restart_command);

    let log_level = std::env::var("MCP_LOG_LEVEL").ok().or(file.log_level);
    let metrics_addr = std::env::var("MCP_METRICS_ADDR")
        .ok()
        .or(file.metrics_addr);

    let config = HarnessConfig {
        target: TargetSpec {
            command: target_command,
            restart_command,
            url,
        },
        protocol_version: args.version.into(),
        transport: transport.into(),
        mode: args.mode.into(),
        timeouts: TimeoutConfig {
            request_timeout: Duration::from_secs(args.timeout),
            test_timeout: file
                .test_timeout_secs
                .map_or_else(|| TimeoutConfig::default().test_timeout, Duration::from_secs_f64),
            max_retries: args.retries,
        },
        bearer_token: args.token.clone().or(file.bearer_token),
        observability: ObservabilityConfig {
            verbosity: 0,
            log_format,
            log_level,
            metrics_addr,
        },
    };

    config.validate().map_err(Error::Config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{ModeArg, OutputFormat, ProtocolVersionArg};

    fn base_args() -> RunArgs {
        RunArgs {
            target_command: vec!["python".to_string(), "server.py".to_string()],
            url: None,
            version: ProtocolVersionArg::V2024_11_05,
            transport: None,
            mode: ModeArg::Shared,
            timeout: 10,
            retries: 3,
            token: None,
            config: None,
            format: OutputFormat::Human,
            output: None,
        }
    }

    #[test]
    fn builds_a_valid_config_from_cli_args_alone() {
        let config = build_config(&base_args()).expect("should build");
        assert_eq!(config.target.command, Some(vec!["python".to_string(), "server.py".to_string()]));
        assert_eq!(config.timeouts.request_timeout, Duration::from_secs(10));
        assert_eq!(config.timeouts.max_retries, 3);
    }

    #[test]
    fn url_target_is_honored_without_a_command() {
        let mut args = base_args();
        args.target_command = Vec::new();
        args.url = Some("http://localhost:8080/mcp".to_string());
        args.transport = Some(TransportArg::Http);
        let config = build_config(&args).expect("should build");
        assert_eq!(config.target.url.as_deref(), Some("http://localhost:8080/mcp"));
    }

    #[test]
    fn transport_is_inferred_from_target_shape_when_omitted() {
        let config = build_config(&base_args()).expect("should build");
        assert_eq!(config.transport, mcpconform_core::config::TransportKind::Stdio);

        let mut args = base_args();
        args.target_command = Vec::new();
        args.url = Some("http://localhost:8080/mcp".to_string());
        let config = build_config(&args).expect("should build");
        assert_eq!(config.transport, mcpconform_core::config::TransportKind::Http);
    }

    #[test]
    fn missing_target_fails_validation() {
        let mut args = base_args();
        args.target_command = Vec::new();
        let err = build_config(&args).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
