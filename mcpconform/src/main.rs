//! Binary entry point: parses argv, initializes logging, dispatches to the
//! subcommand handler, and exits with the handler's verdict.

use clap::Parser;

use mcpconform::cli::args::Cli;
use mcpconform::observability::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let debug_env = std::env::var("MCP_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let verbosity = if cli.quiet {
        0
    } else if debug_env {
        cli.verbose.max(2)
    } else {
        cli.verbose
    };
    logging::init_logging(logging::default_format(), verbosity);

    let exit_code = match mcpconform::cli::dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "mcpconform failed");
            eprintln!("error: {e}");
            2
        }
    };

    std::process::exit(exit_code);
}
