//! CLI argument definitions.
//!
//! All `clap` derive structs for `mcpconform` command-line parsing (§4.6).

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand, ValueEnum};

use mcpconform_core::config::{RunMode, TransportKind};
use mcpconform_core::ProtocolVersion;

/// Conformance test harness for Model Context Protocol servers.
#[derive(Parser, Debug)]
#[command(name = "mcpconform", author, version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "MCP_COLOR")]
    pub color: ColorChoice,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the conformance catalog against a target server.
    Run(RunArgs),

    /// Lists the catalog's test cases without running them.
    ListTests(ListTestsArgs),

    /// Displays version and build information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
#[command(group = ArgGroup::new("target").required(true).multiple(false))]
pub struct RunArgs {
    /// Subprocess command line, launched over stdio. Everything after `--`.
    #[arg(last = true, group = "target")]
    pub target_command: Vec<String>,

    /// Target server URL, used with `--transport http` or `http-sse`.
    #[arg(long, group = "target", env = "MCP_TARGET_URL")]
    pub url: Option<String>,

    /// Protocol revision to test against.
    #[arg(long, default_value = "2025-06-18", env = "MCP_PROTOCOL_VERSION")]
    pub version: ProtocolVersionArg,

    /// Wire transport to use. Defaults to `stdio` for a command-line
    /// target and `http` for a URL target when omitted.
    #[arg(long)]
    pub transport: Option<TransportArg>,

    /// Isolated (fresh session per test) or shared (one session for the
    /// whole catalog) run mode.
    #[arg(long, default_value = "shared")]
    pub mode: ModeArg,

    /// Per-request deadline, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Retry count for transport-level send failures.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// OAuth 2.1 bearer token, required by `2025-06-18` servers that gate
    /// on it.
    #[arg(long, env = "MCP_TOKEN")]
    pub token: Option<String>,

    /// YAML configuration file. Values here are overridden by environment
    /// variables and then by the flags above (§4.6 precedence).
    #[arg(short, long, env = "MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Result output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Writes the result set to this path instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `list-tests`.
#[derive(Args, Debug)]
pub struct ListTestsArgs {
    /// Restricts the listing to cases applicable to this protocol revision.
    #[arg(long)]
    pub version: Option<ProtocolVersionArg>,

    /// Listing output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Protocol revision, as a CLI-friendly enum mapping onto [`ProtocolVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolVersionArg {
    /// `2024-11-05`.
    #[value(name = "2024-11-05")]
    V2024_11_05,
    /// `2025-03-26`.
    #[value(name = "2025-03-26")]
    V2025_03_26,
    /// `2025-06-18`.
    #[value(name = "2025-06-18")]
    V2025_06_18,
}

impl From<ProtocolVersionArg> for ProtocolVersion {
    fn from(value: ProtocolVersionArg) -> Self {
        match value {
            ProtocolVersionArg::V2024_11_05 => Self::V2024_11_05,
            ProtocolVersionArg::V2025_03_26 => Self::V2025_03_26,
            ProtocolVersionArg::V2025_06_18 => Self::V2025_06_18,
        }
    }
}

/// Wire transport, as a CLI-friendly enum mapping onto [`TransportKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportArg {
    /// Line-delimited JSON over a child process.
    #[default]
    Stdio,
    /// Synchronous HTTP POST.
    Http,
    /// Asynchronous HTTP POST with responses over SSE.
    #[value(name = "http-sse")]
    HttpSse,
}

impl From<TransportArg> for TransportKind {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
            TransportArg::HttpSse => Self::HttpSse,
        }
    }
}

/// Session reuse policy, as a CLI-friendly enum mapping onto [`RunMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Fresh transport + session per test.
    Isolated,
    /// One session reused across the whole catalog.
    Shared,
}

impl From<ModeArg> for RunMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Isolated => Self::Isolated,
            ModeArg::Shared => Self::Shared,
        }
    }
}

/// Output format for structured command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_command_line_target_parses() {
        let cli = Cli::try_parse_from(["mcpconform", "run", "--", "python", "server.py"]);
        assert!(cli.is_ok(), "failed to parse: {cli:?}");
    }

    #[test]
    fn run_with_url_target_parses() {
        let cli = Cli::try_parse_from([
            "mcpconform",
            "run",
            "--transport",
            "http",
            "--url",
            "http://localhost:8080/mcp",
        ]);
        assert!(cli.is_ok(), "failed to parse: {cli:?}");
    }

    #[test]
    fn run_requires_a_target() {
        let cli = Cli::try_parse_from(["mcpconform", "run"]);
        assert!(cli.is_err());
    }

    #[test]
    fn command_and_url_targets_are_mutually_exclusive() {
        let cli = Cli::try_parse_from([
            "mcpconform",
            "run",
            "--url",
            "http://localhost:8080/mcp",
            "--",
            "python",
            "server.py",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn verbose_count_accumulates() {
        let cli =
            Cli::try_parse_from(["mcpconform", "-vvv", "run", "--", "python", "server.py"])
                .unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn list_tests_parses_without_a_target() {
        let cli = Cli::try_parse_from(["mcpconform", "list-tests"]);
        assert!(cli.is_ok(), "failed to parse: {cli:?}");
    }

    #[test]
    fn version_subcommand_parses() {
        let cli = Cli::try_parse_from(["mcpconform", "version"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn protocol_version_arg_round_trips_to_core_type() {
        assert_eq!(
            ProtocolVersion::from(ProtocolVersionArg::V2025_06_18),
            ProtocolVersion::V2025_06_18
        );
    }
}
