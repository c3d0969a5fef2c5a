//! Construction of document-store clients from connection strings.
//!
//! Connecting is always deferred: a connector is only invoked by the
//! opportunity DAO on its first real call.

use super::{DocumentStore, FailFastPolicy, HttpDocumentStore, MemoryDocumentStore, StoreError, StoreResult};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

const MEMORY_SCHEME: &str = "memory://";

/// Where a document-store client should point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget {
    pub uri: String,
    pub database: String,
}

impl DocumentTarget {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }
}

/// Creates short-lived document-store clients.
pub trait DocumentConnector: Send + Sync {
    fn connect(
        &self,
        target: &DocumentTarget,
        policy: &FailFastPolicy,
    ) -> StoreResult<Arc<dyn DocumentStore>>;
}

/// Builds one HTTP client per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl DocumentConnector for HttpConnector {
    fn connect(
        &self,
        target: &DocumentTarget,
        policy: &FailFastPolicy,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(HttpDocumentStore::connect(target, policy)?))
    }
}

/// Hands out the same store to every caller.
#[derive(Clone)]
pub struct FixedConnector {
    store: Arc<dyn DocumentStore>,
}

impl FixedConnector {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl Debug for FixedConnector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedConnector").finish_non_exhaustive()
    }
}

impl DocumentConnector for FixedConnector {
    fn connect(
        &self,
        _target: &DocumentTarget,
        _policy: &FailFastPolicy,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        Ok(Arc::clone(&self.store))
    }
}

/// Picks a connector from the URI scheme.
///
/// `memory://` yields a fresh in-process engine shared by every client the
/// returned connector creates; `http://` and `https://` use the HTTP adapter.
pub fn connector_for_uri(uri: &str) -> StoreResult<Arc<dyn DocumentConnector>> {
    let trimmed = uri.trim();
    if trimmed.starts_with(MEMORY_SCHEME) {
        return Ok(Arc::new(FixedConnector::new(Arc::new(
            MemoryDocumentStore::new(),
        ))));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(Arc::new(HttpConnector));
    }
    Err(StoreError::InvalidTarget(format!(
        "unsupported document store uri `{trimmed}`"
    )))
}

#[cfg(test)]
mod tests {
    use super::{connector_for_uri, DocumentTarget};
    use crate::docstore::{FailFastPolicy, StoreError};
    use serde_json::Map;

    #[test]
    fn memory_connector_shares_one_engine() {
        let connector = connector_for_uri("memory://").unwrap();
        let target = DocumentTarget::new("memory://", "internhub");
        let policy = FailFastPolicy::default();

        let first = connector.connect(&target, &policy).unwrap();
        let id = first.insert_one("opportunities", Map::new()).unwrap();
        let second = connector.connect(&target, &policy).unwrap();
        assert!(second.find_by_id("opportunities", &id).unwrap().is_some());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(
            connector_for_uri("mongodb://localhost:27017"),
            Err(StoreError::InvalidTarget(_))
        ));
    }
}
