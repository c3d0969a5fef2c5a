//! Canonical identifier handling across the two stores.
//!
//! Relational ids are integers, document ids are strings. Code that relates
//! records from both stores compares the canonical string form only, never
//! the native types.

use std::fmt::Display;

/// Returns the canonical string form of any identifier.
pub fn canonical_id<T: Display + ?Sized>(id: &T) -> String {
    id.to_string().trim().to_string()
}

/// Compares two identifiers by canonical string form.
pub fn same_id<A, B>(left: &A, right: &B) -> bool
where
    A: Display + ?Sized,
    B: Display + ?Sized,
{
    canonical_id(left) == canonical_id(right)
}
