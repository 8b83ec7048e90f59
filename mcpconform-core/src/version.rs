//! Protocol revision model.
//!
//! Encodes the wire-level differences between MCP revisions as data on
//! [`ProtocolVersion`] rather than as scattered `match` arms throughout the
//! adapter and catalog — the Runner and test cases branch on capability
//! queries, never on the version string itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A supported MCP protocol revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// `2024-11-05` — the original revision.
    #[serde(rename = "2024-11-05")]
    V2024_11_05,
    /// `2025-03-26` — introduces async tool invocation.
    #[serde(rename = "2025-03-26")]
    V2025_03_26,
    /// `2025-06-18` — introduces structured content, elicitation, OAuth 2.1,
    /// and forbids batching.
    #[serde(rename = "2025-06-18")]
    V2025_06_18,
}

impl ProtocolVersion {
    /// All revisions this harness knows how to speak, oldest first.
    pub const ALL: [Self; 3] = [Self::V2024_11_05, Self::V2025_03_26, Self::V2025_06_18];

    /// The wire string for this revision (used in `initialize` negotiation
    /// and the `MCP-Protocol-Version` header).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V2024_11_05 => "2024-11-05",
            Self::V2025_03_26 => "2025-03-26",
            Self::V2025_06_18 => "2025-06-18",
        }
    }

    /// The JSON key carrying a tool's invocation arguments.
    ///
    /// `arguments` in `2024-11-05`/`2025-06-18`; `parameters` in `2025-03-26`.
    #[must_use]
    pub const fn tool_arguments_key(self) -> &'static str {
        match self {
            Self::V2025_03_26 => "parameters",
            Self::V2024_11_05 | Self::V2025_06_18 => "arguments",
        }
    }

    /// The JSON key carrying a tool descriptor's input schema.
    ///
    /// `inputSchema` in `2024-11-05`/`2025-06-18`; `parameters` in `2025-03-26`.
    #[must_use]
    pub const fn tool_schema_key(self) -> &'static str {
        match self {
            Self::V2025_03_26 => "parameters",
            Self::V2024_11_05 | Self::V2025_06_18 => "inputSchema",
        }
    }

    /// Whether `initialize` sends `clientInfo`/`clientCapabilities` (camelCase,
    /// `2025-06-18`) as opposed to `client_info`/`client_capabilities` (snake_case,
    /// earlier revisions).
    #[must_use]
    pub const fn uses_camel_case_initialize(self) -> bool {
        matches!(self, Self::V2025_06_18)
    }

    /// Whether this revision promotes tool calls to background invocations
    /// (`tools/call-async`, `tools/result`, `tools/cancel`).
    #[must_use]
    pub const fn supports_async_tools(self) -> bool {
        matches!(self, Self::V2025_03_26)
    }

    /// Whether tool results may carry `structuredContent` alongside `content`.
    #[must_use]
    pub const fn supports_structured_content(self) -> bool {
        matches!(self, Self::V2025_06_18)
    }

    /// Whether this revision permits JSON-RPC batch frames.
    #[must_use]
    pub const fn allows_batching(self) -> bool {
        !matches!(self, Self::V2025_06_18)
    }

    /// Whether this revision requires an OAuth 2.1 bearer token on every request.
    #[must_use]
    pub const fn requires_oauth(self) -> bool {
        matches!(self, Self::V2025_06_18)
    }

    /// Picks the highest revision present in both `offered` (client-supported)
    /// and `supported` (server-advertised), per the initialize negotiation rule
    /// "version negotiation picks the highest mutually supported version".
    #[must_use]
    pub fn negotiate_highest(offered: &[Self], supported: &[Self]) -> Option<Self> {
        Self::ALL
            .iter()
            .rev()
            .find(|v| offered.contains(v) && supported.contains(v))
            .copied()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = UnknownProtocolVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2024-11-05" => Ok(Self::V2024_11_05),
            "2025-03-26" => Ok(Self::V2025_03_26),
            "2025-06-18" => Ok(Self::V2025_06_18),
            other => Err(UnknownProtocolVersion(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized protocol version string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown protocol version: {0}")]
pub struct UnknownProtocolVersion(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_roundtrip() {
        for v in ProtocolVersion::ALL {
            assert_eq!(v.as_str().parse::<ProtocolVersion>().unwrap(), v);
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!("1999-01-01".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn tool_argument_key_differs_only_for_2025_03_26() {
        assert_eq!(ProtocolVersion::V2024_11_05.tool_arguments_key(), "arguments");
        assert_eq!(ProtocolVersion::V2025_03_26.tool_arguments_key(), "parameters");
        assert_eq!(ProtocolVersion::V2025_06_18.tool_arguments_key(), "arguments");
    }

    #[test]
    fn only_2025_03_26_supports_async_tools() {
        assert!(!ProtocolVersion::V2024_11_05.supports_async_tools());
        assert!(ProtocolVersion::V2025_03_26.supports_async_tools());
        assert!(!ProtocolVersion::V2025_06_18.supports_async_tools());
    }

    #[test]
    fn only_2025_06_18_forbids_batching() {
        assert!(ProtocolVersion::V2024_11_05.allows_batching());
        assert!(ProtocolVersion::V2025_03_26.allows_batching());
        assert!(!ProtocolVersion::V2025_06_18.allows_batching());
    }

    #[test]
    fn negotiate_highest_picks_newest_common_version() {
        let offered = [ProtocolVersion::V2024_11_05, ProtocolVersion::V2025_03_26];
        let supported = ProtocolVersion::ALL.to_vec();
        assert_eq!(
            ProtocolVersion::negotiate_highest(&offered, &supported),
            Some(ProtocolVersion::V2025_03_26)
        );
    }

    #[test]
    fn negotiate_highest_none_when_disjoint() {
        let offered = [ProtocolVersion::V2025_06_18];
        let supported = [ProtocolVersion::V2024_11_05];
        assert_eq!(ProtocolVersion::negotiate_highest(&offered, &supported), None);
    }
}
