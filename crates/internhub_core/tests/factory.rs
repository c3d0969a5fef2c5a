mod support;

use internhub_core::docstore::{
    DocumentConnector, DocumentStore, DocumentTarget, FailFastPolicy, StoreError, StoreResult,
};
use internhub_core::{
    count_live_opportunities, AccessConfig, AccessContext, AccountService, ApplicationService,
    ApplicationStatus, DaoError, DaoFactory, NewOpportunity, NewStudent, RecordDao,
    ReportService, Role,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use support::{cheap_hasher, harness, FlakyStore};

/// Connector that counts how often a client is requested.
struct CountingConnector {
    store: Arc<FlakyStore>,
    connects: AtomicUsize,
}

impl DocumentConnector for CountingConnector {
    fn connect(
        &self,
        _target: &DocumentTarget,
        _policy: &FailFastPolicy,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}

/// Connector for a store that cannot be reached at all.
struct DownConnector;

impl DocumentConnector for DownConnector {
    fn connect(
        &self,
        _target: &DocumentTarget,
        _policy: &FailFastPolicy,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        Err(StoreError::Unreachable("connection refused".to_string()))
    }
}

fn counting_context() -> (AccessContext, Arc<CountingConnector>) {
    let connector = Arc::new(CountingConnector {
        store: Arc::new(FlakyStore::default()),
        connects: AtomicUsize::new(0),
    });
    let context = AccessContext::builder(AccessConfig::in_memory())
        .connector(connector.clone())
        .hasher(cheap_hasher())
        .build()
        .unwrap();
    (context, connector)
}

#[test]
fn factory_construction_and_relational_work_never_touch_the_document_store() {
    let (context, connector) = counting_context();

    let mut factory = context.open_factory().unwrap();
    factory
        .student_dao()
        .unwrap()
        .create(&NewStudent {
            name: "Ada".to_string(),
            email: "ada@uni.edu".to_string(),
            gpa: 3.5,
            department: "CS".to_string(),
        })
        .unwrap();
    assert!(!factory.has_opportunity_dao());
    factory.release().unwrap();

    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    assert_eq!(connector.store.calls(), 0);
}

#[test]
fn opportunity_client_is_created_once_on_first_use() {
    let (context, connector) = counting_context();
    let factory = context.open_factory().unwrap();

    let first = factory.opportunity_dao().unwrap();
    let second = factory.opportunity_dao().unwrap();
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);

    first.get_all().unwrap();
    second.get_all().unwrap();
    first.get_all().unwrap();
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[test]
fn in_memory_context_keeps_rows_across_factories() {
    let (context, _) = counting_context();
    let id = context
        .with_factory(|factory| {
            let created = factory.student_dao()?.create(&NewStudent {
                name: "Ada".to_string(),
                email: "ada@uni.edu".to_string(),
                gpa: 3.5,
                department: "CS".to_string(),
            })?;
            Ok(created.id)
        })
        .unwrap();

    let found = context
        .with_factory(|factory| factory.student_dao()?.get(&id))
        .unwrap()
        .unwrap();
    assert_eq!(found.email, "ada@uni.edu");

    let clone = context.clone();
    drop(context);
    let still_there = clone
        .with_factory(|factory| factory.student_dao()?.get(&id))
        .unwrap();
    assert!(still_there.is_some());

    let (unrelated, _) = counting_context();
    let students = unrelated
        .with_factory(|factory| factory.student_dao()?.get_all())
        .unwrap();
    assert!(students.is_empty());
}

#[test]
fn release_is_idempotent_and_disables_the_factory() {
    let harness = harness();
    let mut factory = harness.context.open_factory().unwrap();

    factory.release().unwrap();
    factory.release().unwrap();
    assert!(factory.is_released());

    assert!(matches!(factory.user_dao(), Err(DaoError::SessionReleased)));
    assert!(matches!(factory.student_dao(), Err(DaoError::SessionReleased)));
    assert!(matches!(factory.application_dao(), Err(DaoError::SessionReleased)));
    assert!(matches!(factory.opportunity_dao(), Err(DaoError::SessionReleased)));
}

#[test]
fn with_factory_surfaces_the_work_error_and_still_releases() {
    let harness = harness();

    let err = harness
        .context
        .with_factory(|factory| -> Result<(), DaoError> {
            factory.student_dao()?.get_all()?;
            Err(DaoError::Conflict("boom".to_string()))
        })
        .unwrap_err();
    assert!(err.is_conflict());

    let students = harness
        .context
        .with_factory(|factory| factory.student_dao()?.get_all())
        .unwrap();
    assert!(students.is_empty());
}

#[test]
fn unreachable_store_degrades_reads_and_fails_writes() {
    let context = AccessContext::builder(AccessConfig::in_memory())
        .connector(Arc::new(DownConnector))
        .hasher(cheap_hasher())
        .build()
        .unwrap();
    let factory = context.open_factory().unwrap();
    let opportunities = factory.opportunity_dao().unwrap();

    let listed = opportunities.get_all().unwrap();
    assert_eq!(count_live_opportunities(&listed), 0);

    let err = opportunities
        .create(&NewOpportunity::new("Backend Intern", "Acme"))
        .unwrap_err();
    assert!(err.is_unavailable(), "unexpected error: {err}");
}

#[test]
fn end_to_end_application_flow_across_both_stores() {
    let harness = harness();

    let (user_id, opportunity_id) = harness
        .context
        .with_factory(|factory| {
            let accounts = AccountService::new(factory, harness.context.hasher().clone());
            let user = accounts.register("a@b.com", "s3cret", "Ada", Role::Student)?;
            let opportunity_id = factory
                .opportunity_dao()?
                .create(&NewOpportunity::new("Backend Intern", "Acme"))?;
            Ok((user.id, opportunity_id))
        })
        .unwrap();

    let application = harness
        .context
        .with_factory(|factory| {
            let applications = ApplicationService::new(factory);
            let first = applications.submit(user_id, &opportunity_id)?;
            let again = applications.submit(user_id, &opportunity_id)?;
            assert_eq!(first.id, again.id);
            applications.review(first.id, ApplicationStatus::Approved)
        })
        .unwrap()
        .unwrap();
    assert_eq!(application.status, ApplicationStatus::Approved);

    let views = harness
        .context
        .with_factory(|factory| ApplicationService::new(factory).list_for_user(user_id))
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(
        views[0].opportunity.as_ref().map(|found| found.title.as_str()),
        Some("Backend Intern")
    );

    let rows = harness
        .context
        .with_factory(|factory| ReportService::new(factory).combined_report())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].applicant_email, "a@b.com");
    assert_eq!(rows[0].company_name, "Acme");
    assert_eq!(rows[0].status, ApplicationStatus::Approved);

    harness.store.set_failing(true);
    let snapshot = harness
        .context
        .with_factory(|factory| ReportService::new(factory).snapshot())
        .unwrap();
    assert_eq!(snapshot.live_opportunity_count, 0);
    assert!(!snapshot.document_store_available);
}
