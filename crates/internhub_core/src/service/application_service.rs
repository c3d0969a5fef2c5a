//! Application use-cases spanning both stores.
//!
//! # Responsibility
//! - Check the referenced opportunity before recording an application.
//! - Apply the review workflow rule the DAO deliberately does not enforce.
//! - Join applications with their opportunity for display.
//!
//! # Invariants
//! - Submitting twice for the same (user, opportunity) pair returns the
//!   existing application instead of creating a second one.
//! - Opportunity ids are compared by canonical string form only.

use crate::dao::factory::DaoFactory;
use crate::dao::{filter_by_user, DaoError, DaoResult, RecordDao};
use crate::docstore::StoreError;
use crate::model::application::{
    Application, ApplicationChanges, ApplicationId, ApplicationStatus, NewApplication,
};
use crate::model::ids::{canonical_id, same_id};
use crate::model::opportunity::Opportunity;
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use log::{info, warn};

/// An application joined with the opportunity it points at.
///
/// `opportunity` is `None` when the reference dangles, and a degraded
/// placeholder while the document store is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationView {
    pub application: Application,
    pub opportunity: Option<Opportunity>,
}

pub struct ApplicationService<'f> {
    factory: &'f dyn DaoFactory,
}

impl<'f> ApplicationService<'f> {
    pub fn new(factory: &'f dyn DaoFactory) -> Self {
        Self { factory }
    }

    /// Records that `user_id` applied to `opportunity_id`.
    ///
    /// # Errors
    /// - `Validation` when the opportunity does not exist.
    /// - `Connectivity` when the opportunity cannot be confirmed because the
    ///   document store is degraded.
    /// - `Db` when `user_id` does not reference a user.
    pub fn submit(&self, user_id: UserId, opportunity_id: &str) -> DaoResult<Application> {
        let opportunity_id = canonical_id(opportunity_id);
        let opportunities = self.factory.opportunity_dao()?;
        match opportunities.get(&opportunity_id)? {
            None => {
                return Err(DaoError::Validation(ValidationError::InvalidField {
                    entity: "application",
                    field: "opportunity_id",
                    reason: format!("no opportunity with id `{opportunity_id}`"),
                }))
            }
            Some(opportunity) if opportunity.is_degraded() => {
                warn!("event=application_submit module=service.application status=degraded");
                return Err(DaoError::Connectivity(StoreError::Unreachable(
                    "opportunity catalogue is unavailable".to_string(),
                )));
            }
            Some(_) => {}
        }

        let applications = self.factory.application_dao()?;
        if let Some(existing) = applications
            .list_by_user(user_id)?
            .into_iter()
            .find(|application| same_id(&application.opportunity_id, &opportunity_id))
        {
            info!(
                "event=application_submit module=service.application status=existing application_id={}",
                existing.id
            );
            return Ok(existing);
        }

        applications.create(&NewApplication::submitted(user_id, opportunity_id))
    }

    /// Moves an application to `next` if the workflow allows it.
    ///
    /// Returns `Ok(None)` when the application does not exist.
    pub fn review(
        &self,
        application_id: ApplicationId,
        next: ApplicationStatus,
    ) -> DaoResult<Option<Application>> {
        let applications = self.factory.application_dao()?;
        let Some(current) = applications.get(&application_id)? else {
            return Ok(None);
        };
        if !current.status.can_transition_to(next) {
            return Err(DaoError::Validation(ValidationError::InvalidTransition {
                from: current.status,
                to: next,
            }));
        }

        if !applications.update(&application_id, &ApplicationChanges::status(next))? {
            return Ok(None);
        }
        info!(
            "event=application_review module=service.application status=ok application_id={application_id} next={}",
            next.as_str()
        );
        applications.get(&application_id)
    }

    /// Lists a user's applications, newest first, with their opportunities.
    pub fn list_for_user(&self, user_id: UserId) -> DaoResult<Vec<ApplicationView>> {
        let applications = self.factory.application_dao()?;
        let listed = match applications.list_by_user(user_id) {
            Ok(listed) => listed,
            Err(err) => {
                warn!(
                    "event=application_list module=service.application status=fallback error={err}"
                );
                let mut filtered = filter_by_user(applications.get_all()?, &user_id);
                filtered.sort_by(|left, right| {
                    right
                        .created_at
                        .cmp(&left.created_at)
                        .then(right.id.cmp(&left.id))
                });
                filtered
            }
        };

        let opportunities = self.factory.opportunity_dao()?;
        listed
            .into_iter()
            .map(|application| -> DaoResult<ApplicationView> {
                let opportunity = opportunities.get(&application.opportunity_id)?;
                Ok(ApplicationView {
                    application,
                    opportunity,
                })
            })
            .collect()
    }
}
