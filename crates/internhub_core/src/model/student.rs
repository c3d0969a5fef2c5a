//! Academic record model, owned by the relational store.

use crate::model::validation::{require_email, require_optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "student";

pub type StudentId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub gpa: f64,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub gpa: f64,
    pub department: String,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "name", &self.name)?;
        require_email(ENTITY, "email", &self.email)?;
        validate_gpa(self.gpa)?;
        require_text(ENTITY, "department", &self.department)
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub gpa: Option<f64>,
    pub department: Option<String>,
}

impl StudentChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_optional_text(ENTITY, "name", self.name.as_deref())?;
        if let Some(email) = self.email.as_deref() {
            require_email(ENTITY, "email", email)?;
        }
        if let Some(gpa) = self.gpa {
            validate_gpa(gpa)?;
        }
        require_optional_text(ENTITY, "department", self.department.as_deref())
    }
}

fn validate_gpa(gpa: f64) -> Result<(), ValidationError> {
    if !gpa.is_finite() || gpa < 0.0 {
        return Err(ValidationError::InvalidField {
            entity: ENTITY,
            field: "gpa",
            reason: format!("expected a non-negative number, got {gpa}"),
        });
    }
    Ok(())
}
