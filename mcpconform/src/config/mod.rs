//! Configuration assembly: merges an optional YAML file, environment
//! variables, and CLI flags into a [`mcpconform_core::config::HarnessConfig`]
//! (§4.6 precedence: CLI overrides environment overrides file).

pub mod loader;

pub use loader::build_config;
