//! Logging initialization.
//!
//! Structured logging via `tracing`, human-readable or newline-delimited
//! JSON, with verbosity mapped to a default filter directive and an
//! `MCP_LOG_LEVEL` environment override (§6 Environment variables).

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use mcpconform_core::config::LogFormat;

/// Initializes the global tracing subscriber.
///
/// Verbosity mapping (when `MCP_LOG_LEVEL` is not set):
/// - 0 → warn
/// - 1 → info
/// - 2 → debug
/// - 3+ → trace
///
/// `MCP_LOG_LEVEL`, when set, takes precedence over `verbosity`. Uses
/// `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormat, verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("MCP_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let show_target = verbosity >= 2;

    match format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

/// Picks [`LogFormat::Json`] when stderr isn't a terminal and no explicit
/// format was requested, matching `--format` CLI precedence (§4.6: human
/// when interactive, NDJSON otherwise).
#[must_use]
pub fn default_format() -> LogFormat {
    if std::io::stderr().is_terminal() {
        LogFormat::Human
    } else {
        LogFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        init_logging(LogFormat::Human, 0);
        init_logging(LogFormat::Json, 3);
    }

    #[test]
    fn default_format_is_one_of_the_two_variants() {
        let format = default_format();
        assert!(matches!(format, LogFormat::Human | LogFormat::Json));
    }
}
