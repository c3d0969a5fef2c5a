//! Platform account model.
//!
//! # Invariants
//! - `email` is unique across users (enforced by the relational store).
//! - Only a secret digest is ever stored; plaintext never reaches this type.
//! - `User` never exposes the digest to callers.

use crate::model::validation::{require_email, require_optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

const ENTITY: &str = "user";

pub type UserId = i64;

/// Authorization role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// Account as exposed upward. The stored digest is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Registration input. `password_hash` must already be a digest.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_email(ENTITY, "email", &self.email)?;
        require_text(ENTITY, "password_hash", &self.password_hash)?;
        require_text(ENTITY, "name", &self.name)
    }
}

impl Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = self.email.as_deref() {
            require_email(ENTITY, "email", email)?;
        }
        require_optional_text(ENTITY, "password_hash", self.password_hash.as_deref())?;
        require_optional_text(ENTITY, "name", self.name.as_deref())
    }
}

impl Debug for UserChanges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserChanges")
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, Role};

    #[test]
    fn debug_output_never_contains_digest() {
        let user = NewUser {
            email: "a@b.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            name: "Ada".to_string(),
            role: Role::Student,
        };
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn role_round_trips_through_storage_names() {
        for role in [Role::Admin, Role::Student] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
