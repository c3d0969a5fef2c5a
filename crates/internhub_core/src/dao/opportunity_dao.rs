//! Document-store accessor for opportunities, guarded by the shared breaker.
//!
//! # Responsibility
//! - Map between stored documents and the logical `Opportunity` shape.
//! - Run every create/read as one breaker-guarded unit of work.
//! - Degrade reads to placeholders instead of failing while the store is
//!   unreachable or isolated.
//!
//! # Invariants
//! - No document I/O happens before the first call; the client is created
//!   lazily and reused afterwards.
//! - The duplicate check and the insert share one guarded unit, so a store
//!   failure between them counts once. The pair is not atomic: two racing
//!   creates may both pass the check.
//! - A duplicate is a successful round trip and never trips the breaker.
//! - `update` and `delete` bypass the breaker and report failures as `false`.

use crate::breaker::{BreakerError, BreakerState, CircuitBreaker};
use crate::dao::{DaoError, DaoResult, OpportunityDao, RecordDao};
use crate::docstore::{
    Document, DocumentConnector, DocumentFilter, DocumentId, DocumentStore, DocumentTarget,
    FailFastPolicy, StoreError, StoreResult, ID_FIELD, REVISION_FIELD,
};
use crate::model::ids::canonical_id;
use crate::model::opportunity::{
    Metadata, NewOpportunity, Opportunity, OpportunityChanges, OpportunityId,
};
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub const OPPORTUNITY_COLLECTION: &str = "opportunities";

const REQUIREMENTS_FIELD: &str = "requirements";
const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_COMPANY: &str = "Anonymous";

/// Cheap to clone; clones share the lazily created client.
#[derive(Clone)]
pub struct DocumentOpportunityDao {
    store: Arc<LazyStore>,
    breaker: Arc<CircuitBreaker>,
}

struct LazyStore {
    target: DocumentTarget,
    policy: FailFastPolicy,
    connector: Arc<dyn DocumentConnector>,
    client: OnceCell<Arc<dyn DocumentStore>>,
}

impl LazyStore {
    fn get(&self) -> StoreResult<&Arc<dyn DocumentStore>> {
        self.client.get_or_try_init(|| {
            info!(
                "event=docstore_connect module=dao.opportunity status=start database={}",
                self.target.database
            );
            self.connector.connect(&self.target, &self.policy)
        })
    }
}

enum CreateOutcome {
    Inserted(DocumentId),
    Duplicate,
}

impl DocumentOpportunityDao {
    pub fn new(
        target: DocumentTarget,
        policy: FailFastPolicy,
        connector: Arc<dyn DocumentConnector>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            store: Arc::new(LazyStore {
                target,
                policy,
                connector,
                client: OnceCell::new(),
            }),
            breaker,
        }
    }

    /// Whether the underlying client has been created yet.
    pub fn is_connected(&self) -> bool {
        self.store.client.get().is_some()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn unavailable_error(&self, err: BreakerError<StoreError>) -> DaoError {
        match err {
            BreakerError::Open => {
                warn!(
                    "event=opportunity_create module=dao.opportunity status=rejected breaker={}",
                    self.breaker.name()
                );
                DaoError::BreakerOpen {
                    breaker: self.breaker.name().to_string(),
                }
            }
            BreakerError::Inner(err) => {
                error!("event=opportunity_create module=dao.opportunity status=error error={err}");
                DaoError::Connectivity(err)
            }
        }
    }
}

impl Debug for DocumentOpportunityDao {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentOpportunityDao")
            .field("database", &self.store.target.database)
            .field("connected", &self.is_connected())
            .field("breaker", &self.breaker.name())
            .finish()
    }
}

impl RecordDao for DocumentOpportunityDao {
    type Id = str;
    type Record = Opportunity;
    type NewRecord = NewOpportunity;
    type Changes = OpportunityChanges;
    type Created = OpportunityId;

    fn create(&self, fields: &NewOpportunity) -> DaoResult<OpportunityId> {
        fields.validate()?;
        let title = fields.title.trim();
        let company_name = fields.company_name.trim();

        let outcome = self.breaker.call(|| -> StoreResult<CreateOutcome> {
            let store = self.store.get()?;
            let duplicate_filter = DocumentFilter::case_insensitive_equals([
                ("title", title),
                ("company_name", company_name),
            ]);
            if store
                .find_one(OPPORTUNITY_COLLECTION, &duplicate_filter)?
                .is_some()
            {
                return Ok(CreateOutcome::Duplicate);
            }
            store
                .insert_one(OPPORTUNITY_COLLECTION, new_document(fields))
                .map(CreateOutcome::Inserted)
        });

        match outcome {
            Ok(CreateOutcome::Inserted(id)) => {
                info!("event=opportunity_create module=dao.opportunity status=ok opportunity_id={id}");
                Ok(id.to_string())
            }
            Ok(CreateOutcome::Duplicate) => {
                warn!("event=opportunity_create module=dao.opportunity status=duplicate");
                Err(DaoError::Conflict(format!(
                    "an opportunity titled `{title}` already exists for `{company_name}`"
                )))
            }
            Err(err) => Err(self.unavailable_error(err)),
        }
    }

    fn get(&self, id: &str) -> DaoResult<Option<Opportunity>> {
        let Some(document_id) = DocumentId::parse(id) else {
            return Ok(None);
        };

        let found = self.breaker.call(|| -> StoreResult<Option<Document>> {
            self.store
                .get()?
                .find_by_id(OPPORTUNITY_COLLECTION, &document_id)
        });

        match found {
            Ok(document) => Ok(document.map(opportunity_from_document)),
            Err(err) => {
                warn!("event=opportunity_get module=dao.opportunity status=degraded error={err}");
                Ok(Some(Opportunity::unavailable(&canonical_id(id))))
            }
        }
    }

    fn get_all(&self) -> DaoResult<Vec<Opportunity>> {
        let listed = self.breaker.call(|| -> StoreResult<Vec<Document>> {
            self.store.get()?.find_all(OPPORTUNITY_COLLECTION)
        });

        match listed {
            Ok(documents) => Ok(documents
                .into_iter()
                .map(opportunity_from_document)
                .collect()),
            Err(err) => {
                warn!("event=opportunity_list module=dao.opportunity status=degraded error={err}");
                Ok(vec![Opportunity::maintenance()])
            }
        }
    }

    fn update(&self, id: &str, changes: &OpportunityChanges) -> DaoResult<bool> {
        changes.validate()?;
        let Some(document_id) = DocumentId::parse(id) else {
            return Ok(false);
        };

        let set = changes_document(changes);
        let matched = self.store.get().and_then(|store| {
            if set.is_empty() {
                return store
                    .find_by_id(OPPORTUNITY_COLLECTION, &document_id)
                    .map(|document| document.is_some());
            }
            store
                .update_one(OPPORTUNITY_COLLECTION, &document_id, set)
                .map(|outcome| outcome.matched)
        });

        match matched {
            Ok(matched) => Ok(matched),
            Err(err) => {
                error!("event=opportunity_update module=dao.opportunity status=error error={err}");
                Ok(false)
            }
        }
    }

    fn delete(&self, id: &str) -> DaoResult<bool> {
        let Some(document_id) = DocumentId::parse(id) else {
            return Ok(false);
        };

        match self
            .store
            .get()
            .and_then(|store| store.delete_one(OPPORTUNITY_COLLECTION, &document_id))
        {
            Ok(deleted) => Ok(deleted),
            Err(err) => {
                error!("event=opportunity_delete module=dao.opportunity status=error error={err}");
                Ok(false)
            }
        }
    }
}

impl OpportunityDao for DocumentOpportunityDao {
    fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }
}

fn new_document(fields: &NewOpportunity) -> Document {
    let mut document = Document::new();
    document.insert("title".to_string(), Value::String(fields.title.trim().to_string()));
    document.insert(
        "company_name".to_string(),
        Value::String(fields.company_name.trim().to_string()),
    );
    document.insert(
        "description".to_string(),
        Value::String(fields.description.clone()),
    );
    document.insert(
        REQUIREMENTS_FIELD.to_string(),
        Value::Object(fields.metadata.clone()),
    );
    document
}

fn changes_document(changes: &OpportunityChanges) -> Document {
    let mut set = Document::new();
    if let Some(title) = changes.title.as_deref() {
        set.insert("title".to_string(), Value::String(title.trim().to_string()));
    }
    if let Some(company_name) = changes.company_name.as_deref() {
        set.insert(
            "company_name".to_string(),
            Value::String(company_name.trim().to_string()),
        );
    }
    if let Some(description) = changes.description.as_deref() {
        set.insert("description".to_string(), Value::String(description.to_string()));
    }
    if let Some(metadata) = changes.metadata.as_ref() {
        set.insert(REQUIREMENTS_FIELD.to_string(), Value::Object(metadata.clone()));
    }
    set
}

/// Maps a stored document to the logical shape.
///
/// `_id` becomes the string `id`, `_rev` is dropped, missing attributes take
/// their defaults, and every remaining field lands in `metadata`.
pub(crate) fn opportunity_from_document(mut document: Document) -> Opportunity {
    let id = match document.remove(ID_FIELD) {
        Some(Value::String(raw)) => canonical_id(&raw),
        Some(other) => canonical_id(&other),
        None => String::new(),
    };
    document.remove(REVISION_FIELD);

    let title = take_text(&mut document, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let company_name =
        take_text(&mut document, "company_name").unwrap_or_else(|| DEFAULT_COMPANY.to_string());
    let description = take_text(&mut document, "description").unwrap_or_default();

    let mut metadata = match document.remove(REQUIREMENTS_FIELD) {
        Some(Value::Object(requirements)) => requirements,
        Some(Value::Null) | None => Metadata::new(),
        Some(other) => {
            let mut wrapped = Metadata::new();
            wrapped.insert(REQUIREMENTS_FIELD.to_string(), other);
            wrapped
        }
    };
    for (field, value) in document {
        metadata.entry(field).or_insert(value);
    }

    Opportunity {
        id,
        title,
        company_name,
        description,
        metadata,
        degraded: false,
    }
}

fn take_text(document: &mut Document, field: &str) -> Option<String> {
    match document.remove(field) {
        Some(Value::String(text)) => Some(text),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
