//! Resilient polyglot data-access layer for the internship platform.
//!
//! Users, students and applications live in SQLite; opportunities live in a
//! document store guarded by a process-wide circuit breaker. Callers obtain
//! every accessor through a factory and never see which engine backs it.

pub mod breaker;
pub mod config;
pub mod dao;
pub mod db;
pub mod docstore;
pub mod logging;
pub mod model;
pub mod secrets;
pub mod service;

pub use breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker, Clock, SystemClock};
pub use config::{AccessConfig, ConfigError};
pub use dao::context::{AccessContext, AccessContextBuilder};
pub use dao::factory::{DaoFactory, PolyglotDaoFactory};
pub use dao::{
    filter_by_user, ApplicationDao, DaoError, DaoResult, OpportunityDao, RecordDao, StudentDao,
    UserDao,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::application::{Application, ApplicationChanges, ApplicationStatus, NewApplication};
pub use model::ids::{canonical_id, same_id};
pub use model::opportunity::{
    count_live_opportunities, NewOpportunity, Opportunity, OpportunityChanges,
};
pub use model::student::{NewStudent, Student, StudentChanges};
pub use model::user::{NewUser, Role, User, UserChanges};
pub use model::validation::ValidationError;
pub use secrets::{Argon2SecretHasher, HashError, SecretHasher};
pub use service::account_service::AccountService;
pub use service::application_service::{ApplicationService, ApplicationView};
pub use service::report_service::{CombinedReportRow, PlatformSnapshot, ReportService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
