//! `mcpconform`: a conformance test harness for Model Context Protocol
//! servers, speaking `2024-11-05`, `2025-03-26`, and `2025-06-18` over
//! stdio, synchronous HTTP, or HTTP+SSE.
//!
//! The binary (`main.rs`) wires [`cli`] parsing into [`config`] loading into
//! a [`runner::Runner`]; this library crate is the reusable core for anyone
//! embedding the harness (e.g. a CI step that wants a [`mcpconform_core::report::ResultSet`]
//! without going through argv).

pub mod adapter;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod runner;
pub mod transport;

/// Build-time metadata (git commit, build timestamp, rustc version),
/// generated by `build.rs` via the `built` crate. Consumed by the
/// `version` subcommand.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use error::{Error, Result};
pub use runner::Runner;
