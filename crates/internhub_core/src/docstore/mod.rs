//! Document-store port and engine adapters.
//!
//! # Responsibility
//! - Define the minimal document-engine surface the opportunity DAO needs.
//! - Provide an HTTP adapter for CouchDB-compatible servers and an
//!   in-process engine with the same semantics.
//!
//! # Invariants
//! - Identifiers are always store-generated; callers never choose `_id`.
//! - Every network-backed call is bounded by a `FailFastPolicy` ceiling.
//! - Storage-internal fields (`_id`, `_rev`) never leave the DAO layer.

use regex::Regex;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod connector;
mod http;
mod memory;
mod policy;

pub use connector::{connector_for_uri, DocumentConnector, DocumentTarget, FixedConnector, HttpConnector};
pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;
pub use policy::{FailFastPolicy, DEFAULT_CEILING};

/// Storage-internal identifier field.
pub const ID_FIELD: &str = "_id";
/// Storage-internal revision field (CouchDB MVCC token).
pub const REVISION_FIELD: &str = "_rev";

const DOCUMENT_ID_LEN: usize = 32;

pub type Document = Map<String, Value>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connect, discovery or socket ceiling was hit.
    Unreachable(String),
    /// The engine answered with an error status.
    Rejected { status: u16, message: String },
    /// The engine answered with a body this adapter cannot interpret.
    Malformed(String),
    /// The configured connection string cannot be used.
    InvalidTarget(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "document store unreachable: {message}"),
            Self::Rejected { status, message } => {
                write!(f, "document store rejected request ({status}): {message}")
            }
            Self::Malformed(message) => write!(f, "document store response malformed: {message}"),
            Self::InvalidTarget(message) => write!(f, "invalid document store target: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Store-generated document identifier: 32 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Parses a caller-supplied id. Returns `None` for any other shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let well_formed = trimmed.len() == DOCUMENT_ID_LEN
            && trimmed
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        well_formed.then(|| Self(trimmed.to_string()))
    }

    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query predicate understood by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Every listed field equals the value, ignoring case.
    CaseInsensitiveEquals(Vec<(String, String)>),
}

impl DocumentFilter {
    pub fn case_insensitive_equals<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::CaseInsensitiveEquals(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Renders a Mango selector (`$regex` per field).
    pub fn to_selector(&self) -> Value {
        match self {
            Self::CaseInsensitiveEquals(fields) => {
                let mut selector = Map::new();
                for (field, value) in fields {
                    let mut clause = Map::new();
                    clause.insert("$regex".to_string(), Value::String(anchored_pattern(value)));
                    selector.insert(field.clone(), Value::Object(clause));
                }
                Value::Object(selector)
            }
        }
    }

    /// Evaluates the predicate in-process.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::CaseInsensitiveEquals(fields) => fields.iter().all(|(field, value)| {
                let Some(Value::String(stored)) = document.get(field) else {
                    return false;
                };
                Regex::new(&anchored_pattern(value))
                    .map(|pattern| pattern.is_match(stored))
                    .unwrap_or(false)
            }),
        }
    }
}

/// Result of a `$set`-style update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: bool,
    pub modified: bool,
}

/// Minimal document-engine surface.
///
/// Implementations are shared across threads; every call may block up to the
/// adapter's fail-fast ceiling.
pub trait DocumentStore: Send + Sync {
    fn find_one(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Option<Document>>;
    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>>;
    fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>>;
    /// Inserts a document and returns the identifier the store assigned.
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<DocumentId>;
    /// Overwrites the listed fields only.
    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        set: Document,
    ) -> StoreResult<UpdateOutcome>;
    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool>;
}

fn anchored_pattern(value: &str) -> String {
    format!("(?i)^{}$", regex::escape(value))
}

/// Applies `$set` semantics and reports whether any value changed.
pub(crate) fn apply_set(document: &mut Document, set: Document) -> bool {
    let mut modified = false;
    for (field, value) in set {
        if field == ID_FIELD || field == REVISION_FIELD {
            continue;
        }
        if document.get(&field) != Some(&value) {
            document.insert(field, value);
            modified = true;
        }
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::{apply_set, Document, DocumentFilter, DocumentId, ID_FIELD};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn document_id_accepts_only_store_shape() {
        let generated = DocumentId::generate();
        assert_eq!(DocumentId::parse(generated.as_str()), Some(generated));
        assert!(DocumentId::parse("not-an-id").is_none());
        assert!(DocumentId::parse("ABCDEF0123456789ABCDEF0123456789").is_none());
        assert!(DocumentId::parse("../_all_dbs").is_none());
    }

    #[test]
    fn filter_is_case_insensitive_and_anchored() {
        let filter = DocumentFilter::case_insensitive_equals([
            ("title", "Backend Intern"),
            ("company_name", "Acme"),
        ]);
        assert!(filter.matches(&doc(json!({"title": "backend INTERN", "company_name": "ACME"}))));
        assert!(!filter.matches(&doc(json!({"title": "Backend Intern II", "company_name": "Acme"}))));
        assert!(!filter.matches(&doc(json!({"title": "Backend Intern"}))));
    }

    #[test]
    fn filter_escapes_pattern_metacharacters() {
        let filter = DocumentFilter::case_insensitive_equals([("title", "C++ (Dev).*")]);
        assert!(filter.matches(&doc(json!({"title": "c++ (dev).*"}))));
        assert!(!filter.matches(&doc(json!({"title": "C++ (Dev) anything"}))));

        let selector = filter.to_selector();
        assert_eq!(selector["title"]["$regex"], r"(?i)^C\+\+ \(Dev\)\.\*$");
    }

    #[test]
    fn apply_set_reports_changes_and_protects_internal_fields() {
        let mut stored = doc(json!({"_id": "x", "title": "A", "company_name": "B"}));
        assert!(!apply_set(&mut stored, doc(json!({"title": "A"}))));
        assert!(apply_set(&mut stored, doc(json!({"title": "C", "_id": "y"}))));
        assert_eq!(stored["title"], "C");
        assert_eq!(stored[ID_FIELD], "x");
    }
}
