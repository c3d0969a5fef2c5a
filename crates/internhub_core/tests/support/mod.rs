//! Shared fixtures for integration suites.

#![allow(dead_code)]

use internhub_core::docstore::{
    Document, DocumentFilter, DocumentId, DocumentStore, FixedConnector, MemoryDocumentStore,
    StoreError, StoreResult, UpdateOutcome,
};
use internhub_core::{
    AccessConfig, AccessContext, Argon2SecretHasher, BreakerConfig, CircuitBreaker, Clock,
    SecretHasher,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub const COOLDOWN: Duration = Duration::from_secs(10);

/// In-memory document store that counts calls and can simulate an outage.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryDocumentStore,
    calls: AtomicUsize,
    failing: AtomicBool,
    held: AtomicBool,
}

impl FlakyStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn documents(&self, collection: &str) -> usize {
        self.inner.len(collection)
    }

    /// While held, every call blocks after being counted (for at most five
    /// seconds) until `hold(false)`.
    pub fn hold(&self, held: bool) {
        self.held.store(held, Ordering::SeqCst);
    }

    /// Inserts straight into the backing engine without counting a call.
    pub fn seed(&self, collection: &str, document: Document) -> DocumentId {
        self.inner.insert_one(collection, document).unwrap()
    }

    fn enter(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.held.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::yield_now();
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    fn find_one(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Option<Document>> {
        self.enter()?;
        self.inner.find_one(collection, filter)
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.enter()?;
        self.inner.find_all(collection)
    }

    fn find_by_id(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.enter()?;
        self.inner.find_by_id(collection, id)
    }

    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<DocumentId> {
        self.enter()?;
        self.inner.insert_one(collection, document)
    }

    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        set: Document,
    ) -> StoreResult<UpdateOutcome> {
        self.enter()?;
        self.inner.update_one(collection, id, set)
    }

    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        self.enter()?;
        self.inner.delete_one(collection, id)
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Argon2id with minimal cost so suites stay fast.
pub fn cheap_hasher() -> Arc<dyn SecretHasher> {
    Arc::new(Argon2SecretHasher::with_params(32, 1, 1).unwrap())
}

/// A context backed by a temp-file SQLite database and a `FlakyStore`.
///
/// Every factory opened from `context` sees the same relational rows and the
/// same documents, and shares one breaker driven by `clock`.
pub struct Harness {
    pub context: AccessContext,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub breaker: Arc<CircuitBreaker>,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with_threshold(3)
}

pub fn harness_with_threshold(failure_threshold: u32) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = AccessConfig {
        relational_url: dir.path().join("internhub.db").display().to_string(),
        document_uri: "memory://".to_string(),
        breaker: BreakerConfig {
            failure_threshold,
            reset_timeout: COOLDOWN,
        },
        ..AccessConfig::default()
    };

    let store = Arc::new(FlakyStore::default());
    let clock = Arc::new(ManualClock::new());
    let breaker = Arc::new(CircuitBreaker::with_clock(
        "document-store",
        config.breaker,
        clock.clone(),
    ));
    let context = AccessContext::builder(config)
        .breaker(breaker.clone())
        .connector(Arc::new(FixedConnector::new(store.clone())))
        .hasher(cheap_hasher())
        .build()
        .unwrap();

    Harness {
        context,
        store,
        clock,
        breaker,
        _dir: dir,
    }
}
