//! Field-level validation errors shared by all record types.

use crate::model::application::ApplicationStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied data violates a required-field or type constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "{entity}.{field} is required")
            }
            Self::InvalidField {
                entity,
                field,
                reason,
            } => write!(f, "{entity}.{field} is invalid: {reason}"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "application status cannot move from `{}` to `{}`",
                from.as_str(),
                to.as_str()
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { entity, field });
    }
    Ok(())
}

pub(crate) fn require_optional_text(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(text) => require_text(entity, field, text),
        None => Ok(()),
    }
}

pub(crate) fn require_email(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    require_text(entity, field, value)?;
    let trimmed = value.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !trimmed.contains(char::is_whitespace);
    if !valid {
        return Err(ValidationError::InvalidField {
            entity,
            field,
            reason: format!("`{trimmed}` is not an email address"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_email, require_text, ValidationError};

    #[test]
    fn blank_text_is_reported_as_missing() {
        let err = require_text("student", "name", "   ").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                entity: "student",
                field: "name"
            }
        );
        assert_eq!(err.to_string(), "student.name is required");
    }

    #[test]
    fn email_requires_local_part_and_domain() {
        assert!(require_email("user", "email", "a@b.com").is_ok());
        assert!(matches!(
            require_email("user", "email", "@b.com"),
            Err(ValidationError::InvalidField { .. })
        ));
        assert!(matches!(
            require_email("user", "email", "a b@c.com"),
            Err(ValidationError::InvalidField { .. })
        ));
    }
}
