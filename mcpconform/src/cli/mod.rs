//! CLI argument definitions and command dispatch (§4.6).

pub mod args;
pub mod commands;

use crate::error::Result;
use args::{Cli, Commands};

/// Dispatches a parsed CLI invocation to the appropriate command handler
/// and returns the process exit code.
///
/// # Errors
///
/// Returns an error if the underlying command handler fails (config
/// couldn't be assembled, the target couldn't be reached at all). Partial
/// test failures are reflected in the exit code, not this `Result`.
pub async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run(args) => commands::run::run(&args).await,
        Commands::ListTests(args) => {
            commands::list_tests::run(&args);
            Ok(0)
        }
        Commands::Version(args) => {
            commands::version::run(&args);
            Ok(0)
        }
    }
}
