//! CouchDB-compatible HTTP adapter.
//!
//! # Responsibility
//! - Translate `DocumentStore` calls into CouchDB REST requests.
//! - Map transport failures onto `StoreError::Unreachable`.
//!
//! # Invariants
//! - The underlying client carries the fail-fast ceilings; no request can
//!   outlive `FailFastPolicy::socket_timeout`.
//! - Collection `c` of database `d` lives in the server database `d-c`.
//! - Design documents are never returned from listings.
//! - A server database that was never created reads as an empty collection;
//!   the first insert creates it.

use super::{
    apply_set, Document, DocumentFilter, DocumentId, DocumentStore, DocumentTarget,
    FailFastPolicy, StoreError, StoreResult, UpdateOutcome, REVISION_FIELD,
};
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

const DESIGN_DOC_PREFIX: &str = "_design/";
const MISSING_DATABASE_REASON: &str = "Database does not exist";

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
    #[serde(default)]
    doc: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
}

/// A successful body, or CouchDB's "Database does not exist" 404.
enum Reply<T> {
    Body(T),
    MissingDatabase,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_uri: String,
    database: String,
}

impl HttpDocumentStore {
    /// Builds a client bounded by `policy`. Performs no network I/O.
    pub fn connect(target: &DocumentTarget, policy: &FailFastPolicy) -> StoreResult<Self> {
        let base_uri = target.uri.trim().trim_end_matches('/').to_string();
        if !(base_uri.starts_with("http://") || base_uri.starts_with("https://")) {
            return Err(StoreError::InvalidTarget(format!(
                "expected an http(s) uri, got `{}`",
                target.uri
            )));
        }
        let database = target.database.trim().to_string();
        if database.is_empty() {
            return Err(StoreError::InvalidTarget(
                "document database name cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(policy.connect_ceiling())
            .timeout(policy.socket_timeout)
            .build()
            .map_err(|err| StoreError::InvalidTarget(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            base_uri,
            database,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}-{}", self.base_uri, self.database, collection)
    }

    fn document_url(&self, collection: &str, id: &DocumentId) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    fn fetch(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .send()
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).map(Some)
    }

    fn post_document(&self, collection: &str, document: &Document) -> StoreResult<Reply<WriteResponse>> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(document)
            .send()
            .map_err(transport_error)?;
        read_reply(response)
    }

    /// Creates the server database backing `collection`. A concurrent
    /// creation (412) counts as success.
    fn create_database(&self, collection: &str) -> StoreResult<()> {
        let response = self
            .client
            .put(self.collection_url(collection))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
            info!(
                "event=doc_database_create module=docstore.http status=ok database={}-{collection} http_status={}",
                self.database,
                status.as_u16()
            );
            return Ok(());
        }
        Err(rejected(status, response))
    }
}

impl DocumentStore for HttpDocumentStore {
    fn find_one(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Option<Document>> {
        let response = self
            .client
            .post(format!("{}/_find", self.collection_url(collection)))
            .json(&json!({ "selector": filter.to_selector(), "limit": 1 }))
            .send()
            .map_err(transport_error)?;

        match read_reply::<FindResponse>(response)? {
            Reply::Body(found) => Ok(found.docs.into_iter().next()),
            Reply::MissingDatabase => Ok(None),
        }
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let response = self
            .client
            .get(format!("{}/_all_docs", self.collection_url(collection)))
            .query(&[("include_docs", "true")])
            .send()
            .map_err(transport_error)?;

        let listing = match read_reply::<AllDocsResponse>(response)? {
            Reply::Body(listing) => listing,
            Reply::MissingDatabase => return Ok(Vec::new()),
        };
        Ok(listing
            .rows
            .into_iter()
            .filter(|row| !row.id.starts_with(DESIGN_DOC_PREFIX))
            .filter_map(|row| row.doc)
            .collect())
    }

    fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.fetch(collection, id)
    }

    fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<DocumentId> {
        document.remove(super::ID_FIELD);
        document.remove(REVISION_FIELD);

        let written = match self.post_document(collection, &document)? {
            Reply::Body(written) => written,
            Reply::MissingDatabase => {
                self.create_database(collection)?;
                match self.post_document(collection, &document)? {
                    Reply::Body(written) => written,
                    Reply::MissingDatabase => {
                        return Err(StoreError::Rejected {
                            status: StatusCode::NOT_FOUND.as_u16(),
                            message: format!("database {}-{collection} is still missing", self.database),
                        })
                    }
                }
            }
        };
        DocumentId::parse(&written.id).ok_or_else(|| {
            StoreError::Malformed(format!("server assigned unexpected id `{}`", written.id))
        })
    }

    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        set: Document,
    ) -> StoreResult<UpdateOutcome> {
        let Some(mut current) = self.fetch(collection, id)? else {
            return Ok(UpdateOutcome::default());
        };
        if !apply_set(&mut current, set) {
            debug!("event=doc_update module=docstore.http status=unchanged id={id}");
            return Ok(UpdateOutcome {
                matched: true,
                modified: false,
            });
        }

        let response = self
            .client
            .put(self.document_url(collection, id))
            .json(&current)
            .send()
            .map_err(transport_error)?;
        read_json::<WriteResponse>(response)?;

        Ok(UpdateOutcome {
            matched: true,
            modified: true,
        })
    }

    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        let Some(current) = self.fetch(collection, id)? else {
            return Ok(false);
        };
        let revision = current
            .get(REVISION_FIELD)
            .and_then(|value| value.as_str())
            .ok_or_else(|| StoreError::Malformed(format!("document {id} has no revision")))?;

        let response = self
            .client
            .delete(self.document_url(collection, id))
            .query(&[("rev", revision)])
            .send()
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        read_json::<WriteResponse>(response)?;
        Ok(true)
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unreachable(err.to_string())
}

fn read_json<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejected(status, response));
    }
    decode(response)
}

fn read_reply<T: DeserializeOwned>(response: Response) -> StoreResult<Reply<T>> {
    let status = response.status();
    if status.is_success() {
        return decode(response).map(Reply::Body);
    }
    let body: ErrorBody = response.json().unwrap_or_default();
    if status == StatusCode::NOT_FOUND && body.reason.contains(MISSING_DATABASE_REASON) {
        return Ok(Reply::MissingDatabase);
    }
    Err(rejection(status, body))
}

fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    response.json::<T>().map_err(|err| {
        if err.is_timeout() {
            StoreError::Unreachable(err.to_string())
        } else {
            StoreError::Malformed(err.to_string())
        }
    })
}

fn rejected(status: StatusCode, response: Response) -> StoreError {
    rejection(status, response.json().unwrap_or_default())
}

fn rejection(status: StatusCode, body: ErrorBody) -> StoreError {
    let message = match (body.error.is_empty(), body.reason.is_empty()) {
        (true, true) => status.canonical_reason().unwrap_or("unknown").to_string(),
        (false, true) => body.error,
        (_, false) => format!("{}: {}", body.error, body.reason),
    };
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}
