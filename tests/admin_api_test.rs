//! End-to-end tests over the full route table: auth middleware, handlers,
//! services and the in-memory store, with a recording mail transport.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use portal_backend::config::init_config;
use portal_backend::middleware::auth::create_token;
use portal_backend::models::admin::{Admin, AdminRole};
use portal_backend::models::application::ApplicationStatus;
use portal_backend::routes::app_router;
use portal_backend::services::notification_service::{MailTransport, OutgoingMail};
use portal_backend::storage::{ApplicationStore, MemoryStore, NewApplication};
use portal_backend::utils::crypto::hash_password;
use portal_backend::AppState;

static INIT: Once = Once::new();

fn ensure_config() {
    INIT.call_once(|| {
        std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        std::env::set_var("DATABASE_URL", "postgres://localhost/portal_test");
        std::env::set_var("JWT_SECRET", "integration-test-secret");
        init_config().expect("test config");
    });
}

/// Transport that records every delivery; optionally fails all of them.
struct RecordingTransport {
    fail: bool,
    attempts: AtomicU32,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingTransport {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            attempts: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, mail: OutgoingMail) -> anyhow::Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(mail);
        Ok("queued".to_string())
    }
}

struct Fixture {
    app: axum::Router,
    store: Arc<MemoryStore>,
    transport: Arc<RecordingTransport>,
    acme: Uuid,
    globex: Uuid,
    acme_role: Uuid,
    super_token: String,
    acme_token: String,
}

fn make_admin(role: AdminRole, tenant_id: Option<Uuid>, email: &str, password: &str) -> Admin {
    Admin {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: hash_password(password).expect("hash"),
        role,
        tenant_id,
        name: Some("Test Admin".to_string()),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn fixture() -> Fixture {
    fixture_with_mail(false)
}

fn fixture_with_mail(fail_mail: bool) -> Fixture {
    ensure_config();
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_tenant("Acme Corp");
    let globex = store.add_tenant("Globex");
    let acme_role = store.add_role("Backend Engineer");

    let super_admin = make_admin(AdminRole::SuperAdmin, None, "root@thecage.com", "rootpass1");
    let acme_admin = make_admin(
        AdminRole::TenantAdmin,
        Some(acme),
        "hr@acme.com",
        "acmepass1",
    );
    let super_token = create_token(&super_admin).expect("token");
    let acme_token = create_token(&acme_admin).expect("token");
    store.add_admin(super_admin);
    store.add_admin(acme_admin);

    let transport = Arc::new(RecordingTransport::new(fail_mail));
    let state = AppState::new(
        store.clone(),
        store.clone(),
        transport.clone(),
        "noreply@thecage.com".to_string(),
        Duration::ZERO,
    );
    Fixture {
        app: app_router(state),
        store,
        transport,
        acme,
        globex,
        acme_role,
        super_token,
        acme_token,
    }
}

async fn seed_application(fx: &Fixture, tenant: Uuid, fields: JsonValue) -> Uuid {
    fx.store
        .insert(NewApplication {
            tenant_id: tenant,
            role_id: fx.acme_role,
            applicant_id: None,
            fields,
        })
        .await
        .expect("seed")
        .application
        .id
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Wait for the spawned acknowledgement task to reach the transport.
async fn wait_for_attempts(transport: &RecordingTransport, expected: u32) {
    for _ in 0..200 {
        if transport.attempts.load(Ordering::SeqCst) >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} delivery attempts, saw {}",
        expected,
        transport.attempts.load(Ordering::SeqCst)
    );
}

async fn body_json(response: axum::response::Response) -> JsonValue {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let fx = fixture();
    let response = fx.app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let fx = fixture();
    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            None,
            json!({ "email": "hr@acme.com", "password": "acmepass1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["admin"]["email"], "hr@acme.com");
    assert_eq!(body["admin"]["role"], "tenant_admin");
    assert!(body["admin"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let response = fx
        .app
        .oneshot(get("/api/admin/applications", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let fx = fixture();
    for (email, password) in [
        ("hr@acme.com", "wrong-password"),
        ("nobody@acme.com", "acmepass1"),
    ] {
        let response = fx
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/login",
                None,
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid email or password");
    }

    // Malformed email fails validation before any lookup.
    let response = fx
        .app
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            None,
            json!({ "email": "not-an-email", "password": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_a_live_admin() {
    let fx = fixture();

    let response = fx
        .app
        .clone()
        .oneshot(get("/api/admin/applications", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "missing_authorization");

    let response = fx
        .app
        .clone()
        .oneshot(get("/api/admin/applications", Some("garbage")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");

    // A valid token is not enough: the admin row must still be active.
    let mut deactivated =
        make_admin(AdminRole::SuperAdmin, None, "gone@thecage.com", "gonepass1");
    deactivated.is_active = false;
    let token = create_token(&deactivated).unwrap();
    fx.store.add_admin(deactivated);
    let response = fx
        .app
        .oneshot(get("/api/admin/applications", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "inactive_admin");
}

#[tokio::test]
async fn status_change_reports_the_email_outcome() {
    let fx = fixture();
    let id = seed_application(
        &fx,
        fx.acme,
        json!({"fullName": "Jane Doe", "email": "jane@example.com"}),
    )
    .await;

    let response = fx
        .app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}/status", id),
            Some(&fx.super_token),
            json!({ "status": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["application"]["status"], "approved");
    assert!(!body["application"]["reviewedAt"].is_null());
    assert_eq!(body["emailSent"], true);
    assert!(body["emailError"].is_null());

    let sent = fx.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
}

#[tokio::test]
async fn status_change_without_email_still_commits() {
    let fx = fixture();
    let id = seed_application(&fx, fx.acme, json!({"fullName": "Jane"})).await;

    let response = fx
        .app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}/status", id),
            Some(&fx.super_token),
            json!({ "status": "rejected" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["application"]["status"], "rejected");
    assert_eq!(body["emailSent"], false);
    assert_eq!(body["emailError"], "No applicant email in application data");
    assert_eq!(fx.transport.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_change_error_mapping() {
    let fx = fixture();
    let id = seed_application(&fx, fx.globex, json!({})).await;

    // Unknown status value.
    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}/status", id),
            Some(&fx.super_token),
            json!({ "status": "archived" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("status must be one of:"));

    // Unknown application id.
    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}/status", Uuid::new_v4()),
            Some(&fx.super_token),
            json!({ "status": "reviewed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Wrong tenant.
    let response = fx
        .app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}/status", id),
            Some(&fx.acme_token),
            json!({ "status": "reviewed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "You can only access applications for your own company"
    );
}

#[tokio::test]
async fn listing_and_summary_respect_scope_and_filters() {
    let fx = fixture();
    let acme_app = seed_application(
        &fx,
        fx.acme,
        json!({"fullName": "Jane Doe", "email": "jane@example.com"}),
    )
    .await;
    seed_application(&fx, fx.acme, json!({"fullName": "Bob Smith"})).await;
    seed_application(&fx, fx.globex, json!({"fullName": "Carol King"})).await;
    fx.store
        .set_status(acme_app, ApplicationStatus::Hired, Utc::now(), Uuid::new_v4())
        .await
        .unwrap();

    // Super admin sees everything.
    let response = fx
        .app
        .clone()
        .oneshot(get("/api/admin/applications", Some(&fx.super_token)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

    // Tenant admin is pinned to their tenant even with an explicit filter.
    let uri = format!("/api/admin/applications?tenantId={}", fx.globex);
    let response = fx
        .app
        .clone()
        .oneshot(get(&uri, Some(&fx.acme_token)))
        .await
        .unwrap();
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    for item in list.as_array().unwrap() {
        assert_eq!(item["tenantId"], json!(fx.acme));
    }

    // Status and search filters.
    let response = fx
        .app
        .clone()
        .oneshot(get(
            "/api/admin/applications?status=hired&search=jane",
            Some(&fx.super_token),
        ))
        .await
        .unwrap();
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], json!(acme_app));

    let response = fx
        .app
        .clone()
        .oneshot(get(
            "/api/admin/applications/summary",
            Some(&fx.acme_token),
        ))
        .await
        .unwrap();
    let summary = body_json(response).await;
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["pending"], 1);
    assert_eq!(summary["interviewing"], 0);
    assert_eq!(summary["hired"], 1);
}

#[tokio::test]
async fn csv_export_is_served_as_an_attachment() {
    let fx = fixture();
    seed_application(
        &fx,
        fx.acme,
        json!({"fullName": "Jane Doe", "email": "jane@example.com"}),
    )
    .await;

    let response = fx
        .app
        .oneshot(get(
            "/api/admin/applications/export-csv",
            Some(&fx.super_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/csv"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"admin-dashboard-applications-"));
    assert!(disposition.ends_with(".csv\""));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("Application ID,Company,Role,"));
    assert!(text.contains("Jane Doe"));
}

#[tokio::test]
async fn public_submission_is_created_pending() {
    let fx = fixture();
    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/public/applications",
            None,
            json!({
                "tenantId": fx.acme,
                "roleId": fx.acme_role,
                "fullName": "Jane Doe",
                "email": "jane@example.com",
                "coverLetter": ""
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    let id: Uuid = serde_json::from_value(body["id"].clone()).unwrap();

    let view = fx.store.find(id).await.unwrap().unwrap();
    assert_eq!(view.application.status, ApplicationStatus::Pending);
    // The empty form value was dropped on intake.
    assert!(view.application.fields.get("coverLetter").is_none());
}

#[tokio::test]
async fn submission_acknowledgement_is_emailed() {
    let fx = fixture();
    let response = fx
        .app
        .oneshot(json_request(
            "POST",
            "/api/public/applications",
            None,
            json!({
                "tenantId": fx.acme,
                "roleId": fx.acme_role,
                "fullName": "Jane Doe",
                "email": "jane@example.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Delivery happens on a spawned task after the response.
    wait_for_attempts(&fx.transport, 1).await;
    let sent = fx.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    assert!(sent[0].body.contains("We received your application"));
    assert!(sent[0].body.contains("Backend Engineer"));
    assert!(sent[0].body.contains("Acme Corp"));
}

#[tokio::test]
async fn submission_succeeds_even_when_acknowledgement_delivery_fails() {
    let fx = fixture_with_mail(true);
    let response = fx
        .app
        .oneshot(json_request(
            "POST",
            "/api/public/applications",
            None,
            json!({
                "tenantId": fx.acme,
                "roleId": fx.acme_role,
                "fullName": "Jane Doe",
                "email": "jane@example.com"
            }),
        ))
        .await
        .unwrap();
    // The response never waits on SMTP and never reflects its failure.
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");

    // The spawned task retries and gives up without delivering anything.
    wait_for_attempts(&fx.transport, 3).await;
    assert!(fx.transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submission_without_email_never_hits_the_transport() {
    let fx = fixture();
    let response = fx
        .app
        .oneshot(json_request(
            "POST",
            "/api/public/applications",
            None,
            json!({
                "tenantId": fx.acme,
                "roleId": fx.acme_role,
                "fullName": "Jane Doe"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Give a would-be spawned task room to run before asserting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fx.transport.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn patch_and_delete_round_trip() {
    let fx = fixture();
    let id = seed_application(&fx, fx.acme, json!({"fullName": "Jane"})).await;

    let response = fx
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/admin/applications/{}", id),
            Some(&fx.acme_token),
            json!({ "phone": "+1 555 0100", "status": "hired" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["fields"]["phone"], "+1 555 0100");
    // Review metadata is only reachable through the status endpoint.
    assert_eq!(body["status"], "pending");

    let response = fx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/applications/{}", id))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", fx.acme_token),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], true);

    let response = fx
        .app
        .oneshot(get(
            &format!("/api/admin/applications/{}", id),
            Some(&fx.acme_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
