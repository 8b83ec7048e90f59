//! Shared protocol types and configuration schema for the MCP conformance harness.
//!
//! This crate holds the data the transport, adapter, catalog, and runner
//! layers all agree on: JSON-RPC frame shapes, the protocol-version table,
//! session state, run configuration, and the result structure handed off to
//! external reporters. It has no transport or I/O code of its own.

pub mod config;
pub mod jsonrpc;
pub mod report;
pub mod session;
pub mod version;

pub use config::{HarnessConfig, RunMode, TargetSpec, TransportKind};
pub use jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use report::{Outcome, ResultSet, TestResult};
pub use session::{Session, SessionState};
pub use version::ProtocolVersion;
