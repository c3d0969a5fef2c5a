//! Internship opportunity model, owned by the document store.
//!
//! # Responsibility
//! - Define the logical shape of an opportunity (canonical attributes plus an
//!   open-ended metadata map).
//! - Define the degraded placeholders returned while the document store is
//!   unreachable.
//!
//! # Invariants
//! - `id` is the store-generated identifier in canonical string form.
//! - No two live opportunities share `(title, company_name)` under
//!   case-insensitive comparison. Enforced at write time only.
//! - Degraded records are never counted as real data.

use crate::model::validation::{require_optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ENTITY: &str = "opportunity";

/// Id carried by the single record listing calls return while degraded.
pub const MAINTENANCE_ID: &str = "maintenance";

pub type OpportunityId = String;

/// Free-form requirement attributes (languages, clearance level, ...).
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub title: String,
    pub company_name: String,
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Set on synthetic placeholders produced in degraded mode.
    #[serde(default, skip_serializing_if = "is_false")]
    pub degraded: bool,
}

impl Opportunity {
    /// Placeholder listing entry shown while the document store is isolated.
    pub fn maintenance() -> Self {
        Self {
            id: MAINTENANCE_ID.to_string(),
            title: "System under maintenance".to_string(),
            company_name: "Please try again later".to_string(),
            description: "The opportunity catalogue is temporarily unavailable.".to_string(),
            metadata: Metadata::new(),
            degraded: true,
        }
    }

    /// Placeholder for a single lookup; echoes the requested id.
    pub fn unavailable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: "Opportunity unavailable".to_string(),
            company_name: "System offline".to_string(),
            description: "Maintenance".to_string(),
            metadata: Metadata::new(),
            degraded: true,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded || self.id == MAINTENANCE_ID
    }
}

/// Counts real opportunities, skipping degraded placeholders.
pub fn count_live_opportunities(items: &[Opportunity]) -> usize {
    items.iter().filter(|item| !item.is_degraded()).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOpportunity {
    pub title: String,
    pub company_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewOpportunity {
    pub fn new(title: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company_name: company_name.into(),
            description: String::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(ENTITY, "title", &self.title)?;
        require_text(ENTITY, "company_name", &self.company_name)
    }
}

/// Partial update; `None` leaves the field untouched. A provided `metadata`
/// map replaces the stored one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityChanges {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<Metadata>,
}

impl OpportunityChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_optional_text(ENTITY, "title", self.title.as_deref())?;
        require_optional_text(ENTITY, "company_name", self.company_name.as_deref())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
