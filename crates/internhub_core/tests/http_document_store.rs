use internhub_core::docstore::{
    DocumentFilter, DocumentId, DocumentStore, DocumentTarget, FailFastPolicy, HttpDocumentStore,
    StoreError, StoreResult,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOC_ID: &str = "0123456789abcdef0123456789abcdef";
const COLLECTION_PATH: &str = "/internhub-opportunities";

/// Runs `work` against a store pointed at `uri` on a blocking thread.
async fn with_store<T, F>(uri: String, work: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&HttpDocumentStore) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let store = HttpDocumentStore::connect(
            &DocumentTarget::new(uri, "internhub"),
            &FailFastPolicy::uniform(Duration::from_millis(500)),
        )
        .unwrap();
        work(&store)
    })
    .await
    .unwrap()
}

fn doc_id() -> DocumentId {
    DocumentId::parse(DOC_ID).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn find_all_skips_design_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/_all_docs")))
        .and(query_param("include_docs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "rows": [
                { "id": "_design/search", "doc": { "_id": "_design/search", "views": {} } },
                { "id": DOC_ID, "doc": { "_id": DOC_ID, "_rev": "1-a", "title": "Backend Intern" } }
            ]
        })))
        .mount(&server)
        .await;

    let docs = with_store(server.uri(), |store| store.find_all("opportunities"))
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("title"), Some(&json!("Backend Intern")));
}

#[tokio::test(flavor = "multi_thread")]
async fn find_one_sends_an_anchored_case_insensitive_selector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{COLLECTION_PATH}/_find")))
        .and(body_partial_json(json!({
            "selector": {
                "title": { "$regex": "(?i)^C\\+\\+ Intern$" },
                "company_name": { "$regex": "(?i)^Acme$" }
            },
            "limit": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{ "_id": DOC_ID, "title": "c++ intern", "company_name": "ACME" }]
        })))
        .mount(&server)
        .await;

    let found = with_store(server.uri(), |store| {
        store.find_one(
            "opportunities",
            &DocumentFilter::case_insensitive_equals([
                ("title", "C++ Intern"),
                ("company_name", "Acme"),
            ]),
        )
    })
    .await
    .unwrap();
    assert_eq!(
        found.and_then(|doc| doc.get("company_name").cloned()),
        Some(json!("ACME"))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_returns_the_server_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COLLECTION_PATH))
        .and(body_partial_json(json!({ "title": "Backend Intern" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": DOC_ID, "rev": "1-a"
        })))
        .mount(&server)
        .await;

    let id = with_store(server.uri(), |store| {
        store.insert_one(
            "opportunities",
            json!({ "title": "Backend Intern" }).as_object().cloned().unwrap(),
        )
    })
    .await
    .unwrap();
    assert_eq!(id, doc_id());
}

fn missing_database() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": "not_found", "reason": "Database does not exist."
    }))
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_documents_and_databases_read_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/{DOC_ID}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found", "reason": "missing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/internhub-archive/{DOC_ID}")))
        .respond_with(missing_database())
        .mount(&server)
        .await;

    let (document, archive): (StoreResult<_>, StoreResult<_>) =
        with_store(server.uri(), |store| {
            (
                store.find_by_id("opportunities", &doc_id()),
                store.find_by_id("archive", &doc_id()),
            )
        })
        .await;
    assert_eq!(document.unwrap(), None);
    assert_eq!(archive.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn never_created_database_lists_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/_all_docs")))
        .respond_with(missing_database())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{COLLECTION_PATH}/_find")))
        .respond_with(missing_database())
        .mount(&server)
        .await;

    let (listed, found) = with_store(server.uri(), |store| {
        (
            store.find_all("opportunities"),
            store.find_one(
                "opportunities",
                &DocumentFilter::case_insensitive_equals([("title", "Backend Intern")]),
            ),
        )
    })
    .await;
    assert!(listed.unwrap().is_empty());
    assert_eq!(found.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn first_insert_creates_the_database_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COLLECTION_PATH))
        .respond_with(missing_database())
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": DOC_ID, "rev": "1-a"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = with_store(server.uri(), |store| {
        store.insert_one(
            "opportunities",
            json!({ "title": "Backend Intern" }).as_object().cloned().unwrap(),
        )
    })
    .await
    .unwrap();
    assert_eq!(id, doc_id());
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_resolves_the_current_revision_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/{DOC_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": DOC_ID, "_rev": "3-cafe", "title": "Backend Intern"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{COLLECTION_PATH}/{DOC_ID}")))
        .and(query_param("rev", "3-cafe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "id": DOC_ID, "rev": "4-dead"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deleted = with_store(server.uri(), |store| store.delete_one("opportunities", &doc_id()))
        .await
        .unwrap();
    assert!(deleted);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_writes_back_the_merged_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/{DOC_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": DOC_ID, "_rev": "1-a", "title": "Backend Intern", "company_name": "Acme"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{COLLECTION_PATH}/{DOC_ID}")))
        .and(body_partial_json(json!({
            "_rev": "1-a", "title": "Platform Intern", "company_name": "Acme"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": DOC_ID, "rev": "2-b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = with_store(server.uri(), |store| {
        store.update_one(
            "opportunities",
            &doc_id(),
            json!({ "title": "Platform Intern" }).as_object().cloned().unwrap(),
        )
    })
    .await
    .unwrap();
    assert!(outcome.matched);
    assert!(outcome.modified);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{COLLECTION_PATH}/_all_docs")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "internal_server_error", "reason": "boom"
        })))
        .mount(&server)
        .await;

    let err = with_store(server.uri(), |store| store.find_all("opportunities"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::Rejected {
            status: 500,
            message: "internal_server_error: boom".to_string(),
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connections_are_unreachable() {
    let err = with_store("http://127.0.0.1:9".to_string(), |store| {
        store.find_all("opportunities")
    })
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::Unreachable(_)), "unexpected error: {err}");
}
