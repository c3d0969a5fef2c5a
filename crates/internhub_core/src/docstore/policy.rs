//! Fail-fast ceilings for document-store network calls.

use std::time::Duration;

/// Default ceiling for discovery, connect and socket operations.
pub const DEFAULT_CEILING: Duration = Duration::from_secs(2);

/// Short, explicit bounds applied to every document-store client.
///
/// A downed document store must cost a relational-only request path nothing,
/// and a document-backed request at most these ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailFastPolicy {
    pub server_selection_timeout: Duration,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
}

impl FailFastPolicy {
    /// Applies one ceiling to all three phases.
    pub fn uniform(ceiling: Duration) -> Self {
        Self {
            server_selection_timeout: ceiling,
            connect_timeout: ceiling,
            socket_timeout: ceiling,
        }
    }

    /// Ceiling for establishing a connection, discovery included.
    pub fn connect_ceiling(&self) -> Duration {
        self.server_selection_timeout.min(self.connect_timeout)
    }
}

impl Default for FailFastPolicy {
    fn default() -> Self {
        Self::uniform(DEFAULT_CEILING)
    }
}
