//! Error taxonomy for the harness binary.
//!
//! Each subsystem gets its own variant group so the Runner can pattern-match
//! on *kind* (transport-closed vs timeout vs protocol-shape) without string
//! matching. See §7 of the design for the propagation policy this mirrors:
//! transport-closed is fatal to the current run, everything else fails only
//! the current test.

use mcpconform_core::config::ConfigError;
use thiserror::Error;

/// Top-level error type for harness operations outside the test-case layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The assembled [`mcpconform_core::HarnessConfig`] was self-contradictory.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A transport-kind failure: subprocess died, HTTP session unusable, SSE
    /// stream unrecoverable. Fatal to the current Transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response violated JSON-RPC shape or an adapter contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error not otherwise classified.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors originating in the transport layer.
///
/// Kept distinct from [`Error`] so `Transport` implementations have a small,
/// closed error surface to return, matching the `Result<T, TransportError>`
/// alias used throughout `transport::`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was asked to send/receive after `stop()`, or the peer
    /// (subprocess or HTTP session) became unusable.
    #[error("transport closed: {0}")]
    Closed(String),

    /// A request's deadline elapsed before a correlated response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A frame violated JSON-RPC shape (missing `jsonrpc`, both/neither of
    /// `result`/`error`, non-object top level, etc).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The HTTP layer returned a non-2xx status the harness doesn't map to
    /// a more specific variant.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Authentication was required and missing, expired, or rejected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Underlying I/O failure (pipe, socket).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying HTTP client failure.
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// A requested operation isn't supported by this transport/version
    /// combination (e.g. async tool methods on a non-`2025-03-26` adapter).
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
