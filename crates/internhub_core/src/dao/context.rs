//! Process-lifetime owner of the shared data-access collaborators.
//!
//! One `AccessContext` per process holds the breaker, the document connector
//! and the secret hasher. Factories opened from it share all three, so a
//! breaker tripped through one request isolates the store for every other.
//!
//! A `:memory:` relational url gives the context one private in-memory
//! database. Every factory opened from the context (and its clones) sees the
//! same rows, and the database is dropped with the last clone.

use crate::breaker::CircuitBreaker;
use crate::config::AccessConfig;
use crate::dao::factory::{DaoFactory, PolyglotDaoFactory};
use crate::dao::{DaoError, DaoResult};
use crate::db::{is_memory_url, open_relational, open_shared_memory};
use crate::docstore::{connector_for_uri, DocumentConnector, DocumentTarget};
use crate::secrets::{Argon2SecretHasher, SecretHasher};
use log::{error, info};
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const DOCUMENT_BREAKER_NAME: &str = "document-store";

/// Where factories open their relational sessions.
#[derive(Clone)]
enum RelationalSource {
    Url(String),
    /// Keeps the named in-memory database alive between factories.
    SharedMemory {
        name: String,
        _anchor: Arc<Mutex<Connection>>,
    },
}

impl RelationalSource {
    fn resolve(url: &str) -> DaoResult<Self> {
        if !is_memory_url(url) {
            return Ok(Self::Url(url.trim().to_string()));
        }
        let name = format!("internhub-{}", Uuid::new_v4().simple());
        let anchor = open_shared_memory(&name)?;
        Ok(Self::SharedMemory {
            name,
            _anchor: Arc::new(Mutex::new(anchor)),
        })
    }

    fn open(&self) -> DaoResult<Connection> {
        let session = match self {
            Self::Url(url) => open_relational(url)?,
            Self::SharedMemory { name, .. } => open_shared_memory(name)?,
        };
        Ok(session)
    }
}

#[derive(Clone)]
pub struct AccessContext {
    config: AccessConfig,
    relational: RelationalSource,
    breaker: Arc<CircuitBreaker>,
    connector: Arc<dyn DocumentConnector>,
    hasher: Arc<dyn SecretHasher>,
}

impl AccessContext {
    /// Builds a context with production collaborators for `config`.
    pub fn new(config: AccessConfig) -> DaoResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: AccessConfig) -> AccessContextBuilder {
        AccessContextBuilder {
            config,
            breaker: None,
            connector: None,
            hasher: None,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn hasher(&self) -> &Arc<dyn SecretHasher> {
        &self.hasher
    }

    /// Opens a relational session and wraps it in a factory.
    ///
    /// The document store is not contacted.
    pub fn open_factory(&self) -> DaoResult<PolyglotDaoFactory> {
        let session = self.relational.open()?;
        info!("event=factory_open module=dao.context status=ok");
        Ok(PolyglotDaoFactory::new(
            session,
            Arc::clone(&self.hasher),
            Arc::clone(&self.breaker),
            Arc::clone(&self.connector),
            DocumentTarget::new(
                self.config.document_uri.clone(),
                self.config.document_database.clone(),
            ),
            self.config.fail_fast,
        ))
    }

    /// Runs `work` with a fresh factory and releases it on every exit path.
    ///
    /// An error from `work` takes precedence over a release error.
    pub fn with_factory<T, F>(&self, work: F) -> DaoResult<T>
    where
        F: FnOnce(&PolyglotDaoFactory) -> DaoResult<T>,
    {
        let mut factory = self.open_factory()?;
        let outcome = work(&factory);
        let released = factory.release();
        match (outcome, released) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }
}

impl Debug for AccessContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessContext")
            .field("config", &self.config)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

/// Lets callers substitute any shared collaborator.
pub struct AccessContextBuilder {
    config: AccessConfig,
    breaker: Option<Arc<CircuitBreaker>>,
    connector: Option<Arc<dyn DocumentConnector>>,
    hasher: Option<Arc<dyn SecretHasher>>,
}

impl AccessContextBuilder {
    pub fn breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn DocumentConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn SecretHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn build(self) -> DaoResult<AccessContext> {
        self.config.validate().map_err(|err| {
            error!("event=context_build module=dao.context status=error error={err}");
            DaoError::Config(err)
        })?;

        let breaker = self.breaker.unwrap_or_else(|| {
            Arc::new(CircuitBreaker::new(DOCUMENT_BREAKER_NAME, self.config.breaker))
        });
        let connector = match self.connector {
            Some(connector) => connector,
            None => connector_for_uri(&self.config.document_uri).map_err(DaoError::Connectivity)?,
        };
        let hasher: Arc<dyn SecretHasher> = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(Argon2SecretHasher::new()?),
        };

        let relational = RelationalSource::resolve(&self.config.relational_url)?;

        info!(
            "event=context_build module=dao.context status=ok document_database={} breaker_threshold={}",
            self.config.document_database,
            breaker.config().failure_threshold
        );
        Ok(AccessContext {
            config: self.config,
            relational,
            breaker,
            connector,
            hasher,
        })
    }
}
