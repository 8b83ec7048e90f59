//! Command handlers, one module per subcommand.

pub mod list_tests;
pub mod run;
pub mod version;
