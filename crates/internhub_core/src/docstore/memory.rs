//! In-process document engine.
//!
//! Mirrors the HTTP adapter's semantics (store-generated ids, `$set` updates,
//! case-insensitive filters) without any I/O. Selected by `memory://`.

use super::{
    apply_set, Document, DocumentFilter, DocumentId, DocumentStore, StoreResult, UpdateOutcome,
    ID_FIELD,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type Collection = BTreeMap<DocumentId, Document>;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<BTreeMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Collection>> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find_one(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Option<Document>> {
        Ok(self.lock().get(collection).and_then(|documents| {
            documents
                .values()
                .find(|document| filter.matches(document))
                .cloned()
        }))
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self
            .lock()
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        set: Document,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.lock();
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Ok(UpdateOutcome::default());
        };

        Ok(UpdateOutcome {
            matched: true,
            modified: apply_set(document, set),
        })
    }

    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        Ok(self
            .lock()
            .get_mut(collection)
            .is_some_and(|documents| documents.remove(id).is_some()))
    }
}
