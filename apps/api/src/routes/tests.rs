use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::build_router;
use crate::config::Config;
use crate::orchestrator::testing::{
    backend_profile, deps, three_postings, Call, FakeBackend, RecordingPacer,
};
use crate::orchestrator::{AutomationStage, SessionRegistry};
use crate::records::InMemoryRecordStore;
use crate::state::AppState;

fn app(fake: FakeBackend) -> (Router, AppState, Arc<FakeBackend>) {
    let fake = Arc::new(fake);
    let records = Arc::new(InMemoryRecordStore::new());
    let state = AppState {
        config: Config::from_lookup(|_| None).unwrap(),
        records: records.clone(),
        automation: deps(&fake, records, Arc::new(RecordingPacer::default())),
        sessions: SessionRegistry::default(),
    };
    (build_router(state.clone()), state, fake)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn open_session(app: &Router, user_id: Uuid) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/api/v1/automation/sessions",
            json!({ "user_id": user_id }),
        ),
    )
    .await
}

fn session_id(body: &Value) -> String {
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = app(FakeBackend::available());
    let (status, body) = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "jobx-api");
}

#[tokio::test]
async fn test_backend_status_reports_availability() {
    let (app, _, fake) = app(FakeBackend::unavailable());
    for _ in 0..2 {
        let (status, body) =
            send(&app, empty_request(Method::GET, "/api/v1/automation/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], false);
        assert_eq!(body["base_url"], "http://localhost:8000");
    }
    assert_eq!(fake.calls(), vec![Call::Probe, Call::Probe]);
}

#[tokio::test]
async fn test_unavailable_backend_allows_manual_entry_only() {
    let (app, _, _) = app(FakeBackend::unavailable());
    let user_id = Uuid::new_v4();

    let (status, body) = open_session(&app, user_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["snapshot"]["availability"], "manual_only");

    let id = session_id(&body);
    let (status, body) = send(
        &app,
        empty_request(Method::POST, &format!("/api/v1/automation/sessions/{id}/search")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "AUTOMATION_UNAVAILABLE");

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/applications",
            json!({
                "user_id": user_id,
                "company_name": "Acme",
                "position": "Backend Engineer",
                "status": "applied",
                "application_date": "2026-10-01T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (app, _, _) = app(FakeBackend::available());
    let uri = format!("/api/v1/automation/sessions/{}", Uuid::new_v4());
    let (status, body) = send(&app, empty_request(Method::GET, &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_resume_upload_via_multipart() {
    let (app, _, fake) = app(FakeBackend::available());
    let (_, body) = open_session(&app, Uuid::new_v4()).await;
    let id = session_id(&body);

    let boundary = "jobx-boundary";
    let payload = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"resume\"; filename=\"cv.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.4 resume\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/automation/sessions/{id}/resume"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(payload))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["stage"], "profile_ready");
    assert_eq!(body["snapshot"]["profile"]["job_profile"], "Backend Engineer");
    assert!(fake.calls().contains(&Call::Analyze("cv.pdf".to_string())));
}

#[tokio::test]
async fn test_resume_upload_requires_resume_field() {
    let (app, _, _) = app(FakeBackend::available());
    let (_, body) = open_session(&app, Uuid::new_v4()).await;
    let id = session_id(&body);

    let boundary = "jobx-boundary";
    let payload = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"other\"\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/automation/sessions/{id}/resume"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(payload))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_select_and_apply_flow() {
    let (app, state, fake) = app(
        FakeBackend::available()
            .with_stored_profile(backend_profile())
            .with_jobs(three_postings()),
    );
    let user_id = Uuid::new_v4();

    let (status, body) = open_session(&app, user_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["snapshot"]["stage"], "profile_ready");
    let id = session_id(&body);
    let base = format!("/api/v1/automation/sessions/{id}");

    let (status, body) = send(&app, empty_request(Method::POST, &format!("{base}/search"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["stage"], "jobs_ready");
    assert_eq!(body["snapshot"]["postings"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, empty_request(Method::POST, &format!("{base}/apply"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            &format!("{base}/selection"),
            json!({ "job_url": "https://jobs.example/missing" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("{base}/selection"),
            json!({ "job_url": "https://jobs.example/b" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["selected"], json!(["https://jobs.example/b"]));

    let (status, body) = send(&app, empty_request(Method::POST, &format!("{base}/apply"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["snapshot"]["stage"], "applying");

    let handle = state.sessions.get(id.parse().unwrap()).await.unwrap();
    handle
        .subscribe()
        .wait_for(|s| s.stage == AutomationStage::Completed)
        .await
        .unwrap();

    let (status, body) = send(&app, empty_request(Method::GET, &base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["batch"]["success_count"], 1);
    assert_eq!(body["snapshot"]["batch"]["persistence"]["state"], "saved");

    let (status, _) = send(&app, empty_request(Method::POST, &format!("{base}/apply"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(fake.submitted(), vec!["https://jobs.example/b".to_string()]);

    let (status, body) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/applications?user_id={user_id}"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["company_name"], "Globex");
    assert_eq!(records[0]["job_url"], "https://jobs.example/b");

    let (status, _) = send(&app, empty_request(Method::DELETE, &base)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, empty_request(Method::GET, &base)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_application_lifecycle() {
    let (app, _, _) = app(FakeBackend::available());
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/applications",
            json!({
                "user_id": user_id,
                "company_name": " ",
                "position": "Engineer",
                "status": "applied",
                "application_date": "2026-10-01T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/applications",
            json!({
                "user_id": user_id,
                "company_name": "Acme",
                "position": "Engineer",
                "status": "applied",
                "application_date": "2026-10-01T00:00:00Z",
                "notes": "Referred by a friend"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/api/v1/applications/{id}"),
            json!({ "user_id": user_id, "status": "interview" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "interview");
    assert_eq!(body["notes"], "Referred by a friend");

    let uri = format!("/api/v1/applications/{id}?user_id={user_id}");
    let (status, _) = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn create_application(app: &Router, user_id: Uuid, fields: Value) -> String {
    let mut body = json!({
        "user_id": user_id,
        "application_date": "2026-10-01T00:00:00Z"
    });
    for (key, value) in fields.as_object().unwrap() {
        body[key] = value.clone();
    }
    let (status, body) = send(app, json_request(Method::POST, "/api/v1/applications", body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_application_filters_and_stats() {
    let (app, _, _) = app(FakeBackend::available());
    let user_id = Uuid::new_v4();
    for (company, position, status) in [
        ("Acme", "Backend Engineer", "applied"),
        ("Globex", "Platform Engineer", "interview"),
        ("Initech", "API Engineer", "offer"),
        ("Hooli", "Backend Engineer", "screening"),
    ] {
        create_application(
            &app,
            user_id,
            json!({ "company_name": company, "position": position, "status": status }),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/applications?user_id={user_id}&status=interview"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["company_name"], "Globex");

    let (_, body) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/applications?user_id={user_id}&q=backend"),
        ),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/applications/stats?user_id={user_id}"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "total": 4, "interviews": 1, "offers": 1, "pending": 2 })
    );
}

#[tokio::test]
async fn test_patch_edits_descriptive_fields() {
    let (app, _, _) = app(FakeBackend::available());
    let user_id = Uuid::new_v4();
    let id = create_application(
        &app,
        user_id,
        json!({ "company_name": "Acme", "position": "Engineer", "status": "applied" }),
    )
    .await;
    let uri = format!("/api/v1/applications/{id}");

    let (status, _) = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            json!({ "user_id": user_id, "position": "  " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            json!({
                "user_id": user_id,
                "company_name": "Acme Robotics",
                "position": "Staff Engineer",
                "application_date": "2026-10-05T00:00:00Z",
                "resume_url": "https://files.example/cv-v2.pdf"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company_name"], "Acme Robotics");
    assert_eq!(body["position"], "Staff Engineer");
    assert_eq!(body["resume_url"], "https://files.example/cv-v2.pdf");
    assert_eq!(body["status"], "applied");
}
