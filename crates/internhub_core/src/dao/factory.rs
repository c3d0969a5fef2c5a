//! Per-request data-access factory.
//!
//! # Responsibility
//! - Own one relational session and hand out accessors bound to it.
//! - Create the document-store accessor lazily and reuse it.
//!
//! # Invariants
//! - Construction performs no document-store I/O.
//! - `release` is idempotent, runs on drop, and never touches the document
//!   store when no opportunity accessor was requested.
//! - Every getter fails with `DaoError::SessionReleased` after release.

use crate::breaker::CircuitBreaker;
use crate::dao::application_dao::SqliteApplicationDao;
use crate::dao::opportunity_dao::DocumentOpportunityDao;
use crate::dao::student_dao::SqliteStudentDao;
use crate::dao::user_dao::SqliteUserDao;
use crate::dao::{ApplicationDao, DaoError, DaoResult, OpportunityDao, StudentDao, UserDao};
use crate::db::DbError;
use crate::docstore::{DocumentConnector, DocumentTarget, FailFastPolicy};
use crate::secrets::SecretHasher;
use log::{error, info};
use once_cell::unsync::OnceCell;
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Uniform entry point for obtaining accessors.
pub trait DaoFactory {
    fn user_dao(&self) -> DaoResult<Box<dyn UserDao + '_>>;
    fn student_dao(&self) -> DaoResult<Box<dyn StudentDao + '_>>;
    fn application_dao(&self) -> DaoResult<Box<dyn ApplicationDao + '_>>;
    fn opportunity_dao(&self) -> DaoResult<Box<dyn OpportunityDao + '_>>;
    /// Closes the relational session. Safe to call more than once.
    fn release(&mut self) -> DaoResult<()>;
}

/// Hands out SQLite-backed relational accessors and a document-backed
/// opportunity accessor.
pub struct PolyglotDaoFactory {
    session: Option<Connection>,
    hasher: Arc<dyn SecretHasher>,
    breaker: Arc<CircuitBreaker>,
    connector: Arc<dyn DocumentConnector>,
    target: DocumentTarget,
    policy: FailFastPolicy,
    opportunities: OnceCell<DocumentOpportunityDao>,
}

impl PolyglotDaoFactory {
    pub fn new(
        session: Connection,
        hasher: Arc<dyn SecretHasher>,
        breaker: Arc<CircuitBreaker>,
        connector: Arc<dyn DocumentConnector>,
        target: DocumentTarget,
        policy: FailFastPolicy,
    ) -> Self {
        Self {
            session: Some(session),
            hasher,
            breaker,
            connector,
            target,
            policy,
            opportunities: OnceCell::new(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.session.is_none()
    }

    /// Whether an opportunity accessor has been handed out.
    pub fn has_opportunity_dao(&self) -> bool {
        self.opportunities.get().is_some()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn session(&self) -> DaoResult<&Connection> {
        self.session.as_ref().ok_or(DaoError::SessionReleased)
    }
}

impl DaoFactory for PolyglotDaoFactory {
    fn user_dao(&self) -> DaoResult<Box<dyn UserDao + '_>> {
        Ok(Box::new(SqliteUserDao::new(
            self.session()?,
            Arc::clone(&self.hasher),
        )))
    }

    fn student_dao(&self) -> DaoResult<Box<dyn StudentDao + '_>> {
        Ok(Box::new(SqliteStudentDao::new(self.session()?)))
    }

    fn application_dao(&self) -> DaoResult<Box<dyn ApplicationDao + '_>> {
        Ok(Box::new(SqliteApplicationDao::new(self.session()?)))
    }

    fn opportunity_dao(&self) -> DaoResult<Box<dyn OpportunityDao + '_>> {
        self.session()?;
        let dao = self.opportunities.get_or_init(|| {
            DocumentOpportunityDao::new(
                self.target.clone(),
                self.policy,
                Arc::clone(&self.connector),
                Arc::clone(&self.breaker),
            )
        });
        Ok(Box::new(dao.clone()))
    }

    fn release(&mut self) -> DaoResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.opportunities.take();

        session.close().map_err(|(_, err)| {
            error!("event=factory_release module=dao.factory status=error error={err}");
            DaoError::Db(DbError::Sqlite(err))
        })?;
        info!("event=factory_release module=dao.factory status=ok");
        Ok(())
    }
}

impl Drop for PolyglotDaoFactory {
    fn drop(&mut self) {
        // Errors are already logged by release.
        let _ = self.release();
    }
}

impl Debug for PolyglotDaoFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyglotDaoFactory")
            .field("released", &self.is_released())
            .field("document_database", &self.target.database)
            .field("breaker", &self.breaker.name())
            .finish_non_exhaustive()
    }
}
