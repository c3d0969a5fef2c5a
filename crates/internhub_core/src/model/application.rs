//! Application model: a relational row pointing at a user (enforced foreign
//! key) and at an opportunity (logical reference into the document store).
//!
//! # Invariants
//! - `opportunity_id` is opaque to the relational store and may dangle once
//!   the opportunity is deleted.
//! - The data layer stores any status it is given. Transition rules live in
//!   `ApplicationStatus::can_transition_to` for callers to apply.

use crate::model::user::UserId;
use crate::model::validation::{require_optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};

const ENTITY: &str = "application";

pub type ApplicationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Review rule applied by callers, not by the DAO: only a submitted
    /// application can be decided, and only as approved or rejected.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Approved | Self::Rejected)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub opportunity_id: String,
    pub status: ApplicationStatus,
    /// Unix epoch milliseconds, assigned by the relational store.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub user_id: UserId,
    pub opportunity_id: String,
    pub status: ApplicationStatus,
}

impl NewApplication {
    pub fn submitted(user_id: UserId, opportunity_id: impl Into<String>) -> Self {
        Self {
            user_id,
            opportunity_id: opportunity_id.into(),
            status: ApplicationStatus::Submitted,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "opportunity_id", &self.opportunity_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationChanges {
    pub status: Option<ApplicationStatus>,
    pub opportunity_id: Option<String>,
}

impl ApplicationChanges {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            opportunity_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_optional_text(ENTITY, "opportunity_id", self.opportunity_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::{Approved, Rejected, Submitted, UnderReview};
    use super::ApplicationStatus;

    #[test]
    fn review_rule_only_decides_submitted_applications() {
        assert!(Submitted.can_transition_to(Approved));
        assert!(Submitted.can_transition_to(Rejected));
        assert!(!Submitted.can_transition_to(UnderReview));
        assert!(!Submitted.can_transition_to(Submitted));
        for from in [UnderReview, Approved, Rejected] {
            for to in [Submitted, UnderReview, Approved, Rejected] {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn status_names_round_trip() {
        for status in [Submitted, UnderReview, Approved, Rejected] {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("pending"), None);
    }
}
