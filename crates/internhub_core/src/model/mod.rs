//! Domain records for the internship platform.
//!
//! # Responsibility
//! - Define the records exchanged across the DAO boundary.
//! - Keep storage-engine details (row layout, document field names) out of
//!   these types.
//!
//! # Invariants
//! - Relational records are identified by engine-assigned integers.
//! - Opportunities are identified by the document store's string ids.
//! - Ids from different stores are only compared by canonical string form.

pub mod application;
pub mod ids;
pub mod opportunity;
pub mod student;
pub mod user;
pub mod validation;
