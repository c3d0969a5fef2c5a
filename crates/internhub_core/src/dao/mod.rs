//! Data-access contracts, storage-specific implementations and the factory
//! that hands them out.
//!
//! # Responsibility
//! - Define one uniform record contract (`RecordDao`) and per-entity
//!   extensions.
//! - Hide which engine backs each entity behind those traits.
//! - Translate engine failures into the contract-level `DaoError` taxonomy.
//!
//! # Invariants
//! - Relational writes commit immediately; no staging spans two calls.
//! - `get` reports absence as `Ok(None)`, never as an error.
//! - `update` returns `true` when a record matched, whether or not a value
//!   changed.
//! - Only the opportunity DAO converts failures into degraded successes, and
//!   only on read paths.

use crate::breaker::BreakerState;
use crate::config::ConfigError;
use crate::db::DbError;
use crate::docstore::StoreError;
use crate::model::application::{Application, ApplicationChanges, ApplicationId, NewApplication};
use crate::model::ids::same_id;
use crate::model::opportunity::{NewOpportunity, Opportunity, OpportunityChanges, OpportunityId};
use crate::model::student::{NewStudent, Student, StudentChanges, StudentId};
use crate::model::user::{NewUser, User, UserChanges, UserId};
use crate::model::validation::ValidationError;
use crate::secrets::HashError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod application_dao;
pub mod context;
pub mod factory;
pub mod opportunity_dao;
mod sql;
pub mod student_dao;
pub mod user_dao;

pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug)]
pub enum DaoError {
    Validation(ValidationError),
    /// A uniqueness invariant was violated.
    Conflict(String),
    /// The document store could not be reached.
    Connectivity(StoreError),
    /// The document store is isolated by the named breaker.
    BreakerOpen { breaker: String },
    Db(DbError),
    InvalidData(String),
    /// The factory that produced this accessor has been released.
    SessionReleased,
    Hashing(HashError),
    Config(ConfigError),
}

impl DaoError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// True when persistence did not happen because the store is unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::BreakerOpen { .. })
    }
}

impl Display for DaoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Connectivity(err) => write!(f, "{err}"),
            Self::BreakerOpen { breaker } => {
                write!(f, "document store isolated by open circuit breaker `{breaker}`")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::SessionReleased => write!(f, "data-access factory has already been released"),
            Self::Hashing(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl Error for DaoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Connectivity(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Hashing(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Conflict(_)
            | Self::BreakerOpen { .. }
            | Self::InvalidData(_)
            | Self::SessionReleased => None,
        }
    }
}

impl From<ValidationError> for DaoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for DaoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DaoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ConfigError> for DaoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<HashError> for DaoError {
    fn from(value: HashError) -> Self {
        Self::Hashing(value)
    }
}

/// Uniform record contract implemented by every accessor.
pub trait RecordDao {
    type Id: ?Sized;
    type Record;
    type NewRecord;
    type Changes;
    /// What `create` hands back: the full record or just its id.
    type Created;

    fn create(&self, fields: &Self::NewRecord) -> DaoResult<Self::Created>;
    fn get(&self, id: &Self::Id) -> DaoResult<Option<Self::Record>>;
    fn get_all(&self) -> DaoResult<Vec<Self::Record>>;
    /// `true` iff a record with `id` existed (matched), changed or not.
    fn update(&self, id: &Self::Id, changes: &Self::Changes) -> DaoResult<bool>;
    /// `true` iff a record with `id` existed and was removed.
    fn delete(&self, id: &Self::Id) -> DaoResult<bool>;
}

pub trait UserDao:
    RecordDao<Id = UserId, Record = User, NewRecord = NewUser, Changes = UserChanges, Created = User>
{
    fn find_by_email(&self, email: &str) -> DaoResult<Option<User>>;

    /// Returns the user only when `plaintext` matches the stored digest.
    ///
    /// Unknown email and wrong secret are indistinguishable: both return
    /// `Ok(None)` after exactly one digest verification.
    fn validate_login(&self, email: &str, plaintext: &str) -> DaoResult<Option<User>>;
}

pub trait StudentDao:
    RecordDao<
    Id = StudentId,
    Record = Student,
    NewRecord = NewStudent,
    Changes = StudentChanges,
    Created = Student,
>
{
}

pub trait ApplicationDao:
    RecordDao<
    Id = ApplicationId,
    Record = Application,
    NewRecord = NewApplication,
    Changes = ApplicationChanges,
    Created = Application,
>
{
    fn list_by_user(&self, user_id: UserId) -> DaoResult<Vec<Application>>;
}

pub trait OpportunityDao:
    RecordDao<
    Id = str,
    Record = Opportunity,
    NewRecord = NewOpportunity,
    Changes = OpportunityChanges,
    Created = OpportunityId,
>
{
    /// State of the breaker guarding this accessor.
    fn breaker_state(&self) -> BreakerState;
}

/// Post-filter for callers that fall back to `get_all`.
///
/// Compares canonical string forms so an integer id and its string
/// rendering always match.
pub fn filter_by_user<U>(applications: Vec<Application>, user_id: &U) -> Vec<Application>
where
    U: Display + ?Sized,
{
    applications
        .into_iter()
        .filter(|application| same_id(&application.user_id, user_id))
        .collect()
}
