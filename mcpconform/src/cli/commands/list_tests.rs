//! `list-tests` command: enumerates the catalog without running it.

use std::collections::BTreeMap;

use mcpconform_core::ProtocolVersion;

use crate::catalog::{self, TestCase};
use crate::cli::args::{ListTestsArgs, OutputFormat, ProtocolVersionArg};

/// Prints the catalog's test cases, optionally filtered to one protocol
/// revision.
pub fn run(args: &ListTestsArgs) {
    let cases = match args.version {
        Some(v) => catalog::cases_for_version(ProtocolVersion::from(v)),
        None => catalog::all_cases(),
    };

    match args.format {
        OutputFormat::Human => print_human(&cases, args.version),
        OutputFormat::Json => print_json(&cases),
    }
}

fn print_human(cases: &[TestCase], version: Option<ProtocolVersionArg>) {
    let mut by_group: BTreeMap<&str, Vec<&TestCase>> = BTreeMap::new();
    for case in cases {
        by_group.entry(case.group).or_default().push(case);
    }

    if let Some(v) = version {
        println!("Test cases for {}:", ProtocolVersion::from(v).as_str());
    } else {
        println!("Test cases (all protocol revisions):");
    }

    for (group, cases) in by_group {
        println!("\n{group}:");
        for case in cases {
            let scope = if case.versions.is_empty() {
                "all".to_string()
            } else {
                case.versions
                    .iter()
                    .copied()
                    .map(ProtocolVersion::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("  {:<45} [{scope}]", case.name);
        }
    }
    println!("\n{} test case(s) total.", cases.len());
}

fn print_json(cases: &[TestCase]) {
    let entries: Vec<_> = cases
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "group": c.group,
                "versions": c.versions.iter().copied().map(ProtocolVersion::as_str).collect::<Vec<_>>(),
            })
        })
        .collect();
    match serde_json::to_string_pretty(&entries) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize test list: {e}"),
    }
}
