//! Read-only reporting across both stores.
//!
//! Reports tolerate a degraded document store: rows fall back to the
//! unavailable placeholder and the snapshot flags the store as down. Layout
//! and rendering are left to callers.

use crate::breaker::BreakerState;
use crate::dao::factory::DaoFactory;
use crate::dao::{DaoResult, RecordDao};
use crate::model::application::ApplicationStatus;
use crate::model::ids::canonical_id;
use crate::model::opportunity::{count_live_opportunities, Opportunity};
use serde::Serialize;
use std::collections::HashMap;

/// One applicant/opportunity pairing of the combined report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedReportRow {
    pub applicant_name: String,
    pub applicant_email: String,
    pub opportunity_title: String,
    pub company_name: String,
    pub status: ApplicationStatus,
}

/// Headline numbers for dashboards and the status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformSnapshot {
    pub student_count: usize,
    /// Excludes degraded placeholders.
    pub live_opportunity_count: usize,
    pub document_store_available: bool,
    #[serde(serialize_with = "serialize_state")]
    pub breaker_state: BreakerState,
}

pub struct ReportService<'f> {
    factory: &'f dyn DaoFactory,
}

impl<'f> ReportService<'f> {
    pub fn new(factory: &'f dyn DaoFactory) -> Self {
        Self { factory }
    }

    /// Every application with its applicant and opportunity, oldest first.
    ///
    /// Applications whose user no longer exists are skipped.
    pub fn combined_report(&self) -> DaoResult<Vec<CombinedReportRow>> {
        let users: HashMap<_, _> = self
            .factory
            .user_dao()?
            .get_all()?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        let opportunities: HashMap<String, Opportunity> = self
            .factory
            .opportunity_dao()?
            .get_all()?
            .into_iter()
            .filter(|opportunity| !opportunity.is_degraded())
            .map(|opportunity| (canonical_id(&opportunity.id), opportunity))
            .collect();

        let rows = self
            .factory
            .application_dao()?
            .get_all()?
            .into_iter()
            .filter_map(|application| {
                let user = users.get(&application.user_id)?;
                let key = canonical_id(&application.opportunity_id);
                let opportunity = opportunities
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Opportunity::unavailable(&key));
                Some(CombinedReportRow {
                    applicant_name: user.name.clone(),
                    applicant_email: user.email.clone(),
                    opportunity_title: opportunity.title,
                    company_name: opportunity.company_name,
                    status: application.status,
                })
            })
            .collect();
        Ok(rows)
    }

    pub fn snapshot(&self) -> DaoResult<PlatformSnapshot> {
        let student_count = self.factory.student_dao()?.get_all()?.len();
        let opportunity_dao = self.factory.opportunity_dao()?;
        let opportunities = opportunity_dao.get_all()?;

        Ok(PlatformSnapshot {
            student_count,
            live_opportunity_count: count_live_opportunities(&opportunities),
            document_store_available: !opportunities.iter().any(Opportunity::is_degraded),
            breaker_state: opportunity_dao.breaker_state(),
        })
    }
}

fn serialize_state<S: serde::Serializer>(state: &BreakerState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(state.as_str())
}
