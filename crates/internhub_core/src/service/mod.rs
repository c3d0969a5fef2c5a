//! Use-case services built on the data-access factory.
//!
//! # Responsibility
//! - Orchestrate accessor calls that span both stores.
//! - Keep callers decoupled from which engine backs each entity.

pub mod account_service;
pub mod application_service;
pub mod report_service;
