//! `version` command: build metadata plus what this build of the harness
//! actually knows how to test against.

use mcpconform_core::ProtocolVersion;

use crate::built_info;
use crate::catalog;
use crate::cli::args::{OutputFormat, VersionArgs};

/// Prints version, build, and catalog coverage information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let commit = built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown");
    let dirty = built_info::GIT_DIRTY.unwrap_or(false);
    let built_at = built_info::BUILT_TIME_UTC;
    let rustc = built_info::RUSTC_VERSION;
    let target = built_info::TARGET;
    let revisions: Vec<&str> =
        ProtocolVersion::ALL.iter().copied().map(ProtocolVersion::as_str).collect();
    let case_count = catalog::all_cases().len();

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
            let commit_line = if dirty { format!("{commit} (dirty)") } else { commit.to_string() };
            println!("  commit:     {commit_line}");
            println!("  built:      {built_at}");
            println!("  rustc:      {rustc}");
            println!("  target:     {target}");
            println!("  revisions:  {}", revisions.join(", "));
            println!("  catalog:    {case_count} test case(s)");
        }
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "name": name,
                "version": version,
                "commit": commit,
                "dirty": dirty,
                "built": built_at,
                "rustc": rustc,
                "target": target,
                "protocol_revisions": revisions,
                "catalog_size": case_count,
            });
            match serde_json::to_string_pretty(&payload) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("failed to serialize version info: {e}"),
            }
        }
    }
}
