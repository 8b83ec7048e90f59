//! Logging and metrics initialization for the harness binary (§4.7).

pub mod logging;
pub mod metrics;
