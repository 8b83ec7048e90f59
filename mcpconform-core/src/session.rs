//! Session state shared between a [`Transport`](crate) and its [`ProtocolAdapter`](crate).
//!
//! A session represents one authenticated dialog with a server: at most one
//! active session exists per transport instance, and its id is treated as
//! immutable once `initialize` completes.

use serde_json::Value;

use crate::version::ProtocolVersion;

/// Lifecycle state of a session, advanced strictly forward except for the
/// terminal `Shutdown` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No `initialize` exchange has happened yet.
    Uninitialized,
    /// `initialize` request sent, response not yet received.
    Initializing,
    /// `initialize` succeeded and the `initialized` notification was sent.
    Initialized,
    /// `shutdown` was requested; the session should not be reused.
    Shutdown,
}

/// A negotiated dialog with one MCP server.
#[derive(Debug, Clone)]
pub struct Session {
    /// Server-assigned session identifier.
    pub session_id: Option<String>,
    /// Protocol revision negotiated during `initialize`.
    pub protocol_version: Option<ProtocolVersion>,
    /// Server capabilities as advertised in the `initialize` response.
    pub server_capabilities: Option<Value>,
    /// OAuth 2.1 bearer token, present only when speaking `2025-06-18`
    /// against a server requiring auth.
    pub bearer_token: Option<String>,
    /// Current lifecycle state.
    pub state: SessionState,
}

impl Session {
    /// Creates a fresh, uninitialized session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_id: None,
            protocol_version: None,
            server_capabilities: None,
            bearer_token: None,
            state: SessionState::Uninitialized,
        }
    }

    /// Records a successful `initialize` exchange.
    pub fn mark_initialized(
        &mut self,
        session_id: Option<String>,
        protocol_version: ProtocolVersion,
        server_capabilities: Option<Value>,
    ) {
        self.session_id = session_id;
        self.protocol_version = Some(protocol_version);
        self.server_capabilities = server_capabilities;
        self.state = SessionState::Initialized;
    }

    /// True once `initialize` has completed successfully.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Initialized)
    }

    /// Looks up a boolean/object capability flag by dotted path, e.g.
    /// `"tools"` or `"experimental.asyncSupported"`.
    #[must_use]
    pub fn has_capability(&self, path: &str) -> bool {
        let Some(caps) = &self.server_capabilities else {
            return false;
        };
        let mut current = caps;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(v) => current = v,
                None => return false,
            }
        }
        !current.is_null()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_session_is_uninitialized() {
        let session = Session::new();
        assert!(!session.is_initialized());
        assert_eq!(session.state, SessionState::Uninitialized);
    }

    #[test]
    fn mark_initialized_advances_state() {
        let mut session = Session::new();
        session.mark_initialized(
            Some("sess-1".to_string()),
            ProtocolVersion::V2025_06_18,
            Some(json!({"tools": {}, "resources": {"subscribe": true}})),
        );
        assert!(session.is_initialized());
        assert_eq!(session.session_id.as_deref(), Some("sess-1"));
        assert!(session.has_capability("tools"));
        assert!(session.has_capability("resources.subscribe"));
        assert!(!session.has_capability("prompts"));
    }
}
