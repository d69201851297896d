#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;
use crate::{
    notify::RecordingRelay,
    params::DbParameterStore,
    test_support::{StaticDirectory, TempDatabase, ids, seeded_database},
};

struct TestApp {
    _db: TempDatabase,
    relay: Arc<RecordingRelay>,
    router: Router,
}

#[fixture]
async fn app() -> TestApp {
    let db = seeded_database().await.expect("seeded database");
    let relay = Arc::new(RecordingRelay::default());
    let params: Arc<dyn ParameterStore> = Arc::new(DbParameterStore::new(db.pool.clone()));
    let directory = StaticDirectory::default()
        .with_user("alice", "secret", true)
        .with_user("jdoe", "secret", false)
        .with_user("helpdesk", "secret", false);
    let state = AppState::new(&db.pool, &params, relay.clone(), Arc::new(directory), 25);
    TestApp {
        router: router(Arc::new(state)),
        relay,
        _db: db,
    }
}

fn basic(user: &str) -> String { format!("Basic {}", STANDARD.encode(format!("{user}:secret"))) }

impl TestApp {
    async fn call(&self, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, basic(user));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn ticket_body() -> Value {
    json!({
        "first_name": "Jane",
        "email": "jdoe@example.org",
        "category_id": ids::HVAC,
        "location_id": ids::MAIN_CAMPUS,
        "description": "Air conditioning is broken",
        "severity": "High",
    })
}

#[rstest]
#[tokio::test]
async fn missing_credentials_are_challenged(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .uri("/tickets")
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()),
        Some("Basic realm=\"helpdesk\"")
    );
}

#[rstest]
#[tokio::test]
async fn wrong_password_is_unauthorized(#[future] app: TestApp) {
    let app = app.await;
    let request = Request::builder()
        .uri("/tickets")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("jdoe:wrong")),
        )
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[tokio::test]
async fn submitted_ticket_is_listed_and_notified(#[future] app: TestApp) {
    let app = app.await;
    let (status, created) = app
        .call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["ticket"]["status"], "Submitted");
    assert_eq!(created["category"]["id"], ids::HVAC);

    let (status, page) = app.call(Method::GET, "/tickets", Some("jdoe"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"]["total_items"], 1);
    assert!(page["filters"]["statuses"].is_array());

    let (status, hidden) = app.call(Method::GET, "/tickets", Some("helpdesk"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["page"]["total_items"], 0);

    for _ in 0..10 {
        if !app.relay.messages().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let sent = app.relay.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent.iter().all(|m| m.subject.contains("Air conditioning")));
}

#[rstest]
#[tokio::test]
async fn filtered_listing_decodes_selectors(#[future] app: TestApp) {
    let app = app.await;
    app.call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;

    let (status, page) = app
        .call(Method::GET, "/tickets/All/Submitted/High", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"]["total_items"], 1);

    let (status, page) = app
        .call(Method::GET, "/tickets/All/Closed/All", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"]["total_items"], 0);

    let (status, _) = app
        .call(Method::GET, "/tickets/All/99/All", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[tokio::test]
async fn invalid_ticket_lists_fields(#[future] app: TestApp) {
    let app = app.await;
    let mut body = ticket_body();
    body["email"] = json!("nope");
    let (status, error) = app.call(Method::POST, "/tickets", Some("jdoe"), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["fields"][0]["field"], "email");
}

#[rstest]
#[tokio::test]
async fn hidden_ticket_is_forbidden_and_missing_is_not_found(#[future] app: TestApp) {
    let app = app.await;
    let (_, created) = app
        .call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;
    let id = created["ticket"]["id"].as_str().expect("id").to_owned();

    let (status, _) = app
        .call(Method::GET, &format!("/tickets/{id}"), Some("helpdesk"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, "/tickets/missing", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn update_closes_ticket(#[future] app: TestApp) {
    let app = app.await;
    let (_, created) = app
        .call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;
    let id = created["ticket"]["id"].as_str().expect("id").to_owned();

    let (status, updated) = app
        .call(
            Method::POST,
            &format!("/tickets/{id}/updates"),
            Some("alice"),
            Some(json!({ "notes": "fixed", "is_resolved": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated["ticket"]["status"], "Closed");
    assert_eq!(updated["updates"][0]["notes"], "fixed");
}

#[rstest]
#[tokio::test]
async fn stale_edit_is_opaque_server_error(#[future] app: TestApp) {
    let app = app.await;
    let (_, created) = app
        .call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;
    let id = created["ticket"]["id"].as_str().expect("id").to_owned();
    let mut edit = ticket_body();
    edit["version"] = json!(0);

    let (status, _) = app
        .call(Method::PUT, &format!("/tickets/{id}"), Some("alice"), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, error) = app
        .call(Method::PUT, &format!("/tickets/{id}"), Some("alice"), Some(edit))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"], "internal server error");
}

#[rstest]
#[tokio::test]
async fn delete_returns_no_content(#[future] app: TestApp) {
    let app = app.await;
    let (_, created) = app
        .call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;
    let id = created["ticket"]["id"].as_str().expect("id").to_owned();
    let (status, _) = app
        .call(Method::DELETE, &format!("/tickets/{id}"), Some("jdoe"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[rstest]
#[tokio::test]
async fn categories_are_public_but_writes_are_admin_only(#[future] app: TestApp) {
    let app = app.await;
    let (status, list) = app.call(Method::GET, "/categories", Some("jdoe"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[1]["display_name"], "Buildings - HVAC");

    let form = json!({
        "name": "Printers",
        "parent_category_id": ids::IT,
        "primary_contact": "Print Desk",
        "user_name": "printer-tech",
        "primary_email": "print@example.org",
    });
    let (status, _) = app
        .call(Method::POST, "/categories", Some("jdoe"), Some(form.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = app
        .call(Method::POST, "/categories", Some("alice"), Some(form))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["parent_category_id"], ids::IT);
}

#[rstest]
#[tokio::test]
async fn parameters_are_masked_and_admin_only(#[future] app: TestApp) {
    let app = app.await;
    let (status, _) = app.call(Method::GET, "/parameters", Some("jdoe"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, view) = app
        .call(
            Method::PUT,
            "/parameters/3",
            Some("alice"),
            Some(json!({ "value": "hunter2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["value"], crate::services::MASKED_VALUE);
    assert_eq!(view["updated_by"], "alice");
}

#[rstest]
#[tokio::test]
async fn dashboard_charts_use_parameter_titles(#[future] app: TestApp) {
    let app = app.await;
    app.call(Method::POST, "/tickets", Some("jdoe"), Some(ticket_body()))
        .await;

    let (status, chart) = app
        .call(Method::GET, "/dashboard/status/All/Default/All", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["title"], "Open Tickets by Category");
    assert_eq!(chart["data"][0]["label"], "Buildings - HVAC");
    assert_eq!(chart["data"][0]["value"], 1);

    let (status, chart) = app
        .call(Method::GET, "/dashboard/request-types", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["title"], "Requests by Type");
    assert_eq!(chart["data"][0]["value"], 1);

    let (status, chart) = app
        .call(
            Method::GET,
            "/dashboard/activity?from=2000-01-01&to=2000-01-31",
            Some("alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["data"], json!([]));
}
