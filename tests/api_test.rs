use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt; // for `oneshot`

use vidgrab::api::models::{AuthResponse, DownloadJob, JobListResponse, JobStatus};
use vidgrab::api::state::AppState;
use vidgrab::auth::TokenService;
use vidgrab::config::Config;
use vidgrab::ledger::Ledger;
use vidgrab::queue::{JobBroker, JobEnvelope};

/// Creates a minimal config for testing
///
/// The actual config loading would normally happen via Config::load()
/// but for tests we bypass that and parse it directly.
fn create_test_config() -> Config {
    let config_toml = r#"
[server]
bind_addr = "127.0.0.1:8080"
ledger_path = "/tmp/unused"

[auth]
token_ttl_secs = 1200

[download]
workers = 2
queue_depth = 10
    "#;

    toml::from_str(config_toml).expect("Failed to parse test config")
}

/// Builds a test app with isolated dependencies.
///
/// No download workers are spawned: dispatched envelopes sit in the
/// returned receivers, so submitted jobs stay exactly as the API left
/// them. That is deliberate: several tests assert on the pre-worker
/// snapshot.
fn build_test_app() -> (Router, AppState, Vec<mpsc::Receiver<JobEnvelope>>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let store = Ledger::open(temp_dir.path().join("ledger")).expect("Failed to open test ledger");
    let tokens = TokenService::new("test-secret", 1200);
    let (broker, receivers) = JobBroker::new(2, 10);

    let state = AppState::new(create_test_config(), store, tokens, Arc::new(broker));
    let app = vidgrab::api::router(state.clone());

    (app, state, receivers, temp_dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_authed(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Registers a user through the real endpoint and returns its token.
async fn register_user(app: &Router, username: &str) -> AuthResponse {
    let request = post_json(
        "/auth/register",
        json!({"username": username, "password": "correct-horse-battery"}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_register_returns_token_and_stripped_profile() {
    let (app, _state, _rx, _temp) = build_test_app();

    let request = post_json(
        "/auth/register",
        json!({"username": "alice", "password": "hunter2hunter2"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let (app, _state, _rx, _temp) = build_test_app();
    register_user(&app, "alice").await;

    let request = post_json(
        "/auth/register",
        json!({"username": "alice", "password": "another-password"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = read_json(response).await;
    assert_eq!(body["code"], "USERNAME_TAKEN");
}

#[tokio::test]
async fn test_register_rejects_weak_input() {
    let (app, _state, _rx, _temp) = build_test_app();

    let request = post_json(
        "/auth/register",
        json!({"username": "alice", "password": "short"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_roundtrip_and_wrong_password() {
    let (app, _state, _rx, _temp) = build_test_app();
    register_user(&app, "alice").await;

    let ok = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"username": "alice", "password": "correct-horse-battery"}),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = read_json(ok).await;
    assert!(!body["token"].as_str().unwrap().is_empty());

    let wrong = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            json!({"username": "alice", "password": "wrong-password-123"}),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // Unknown username answers exactly like a wrong password
    let unknown = app
        .oneshot(post_json(
            "/auth/login",
            json!({"username": "mallory", "password": "whatever-password"}),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submit_without_token_is_rejected() {
    let (app, state, _rx, _temp) = build_test_app();

    let request = Request::builder()
        .uri("/downloads")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"url": "https://example.com/video.mp4"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["code"], "NO_TOKEN");

    assert_eq!(state.store.stats().unwrap().job_count, 0);
}

#[tokio::test]
async fn test_submit_with_garbage_token_is_rejected() {
    let (app, state, _rx, _temp) = build_test_app();

    let request = post_json_authed(
        "/downloads",
        "garbage",
        json!({"url": "https://example.com/video.mp4"}),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["code"], "INVALID_TOKEN");

    assert_eq!(state.store.stats().unwrap().job_count, 0);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (app, _state, _rx, _temp) = build_test_app();
    let auth = register_user(&app, "alice").await;

    // Same secret, zero TTL: expired the instant it is issued
    let expired = TokenService::new("test-secret", 0)
        .issue(auth.user.id, "alice")
        .unwrap();

    let response = app
        .oneshot(get_authed("/downloads", &expired))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_for_deleted_identity_is_rejected() {
    let (app, _state, _rx, _temp) = build_test_app();

    // Signed with the right secret, but no such user row exists
    let orphan = TokenService::new("test-secret", 1200)
        .issue(uuid::Uuid::new_v4(), "ghost")
        .unwrap();

    let response = app.oneshot(get_authed("/downloads", &orphan)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["code"], "IDENTITY_MISSING");
}

#[tokio::test]
async fn test_submit_invalid_url_creates_no_job() {
    let (app, state, _rx, _temp) = build_test_app();
    let auth = register_user(&app, "alice").await;

    for bad in ["not-a-url", "ftp://example.com/v.mp4", ""] {
        let response = app
            .clone()
            .oneshot(post_json_authed(
                "/downloads",
                &auth.token,
                json!({"url": bad}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "url: {bad:?}");

        let body = read_json(response).await;
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    assert_eq!(state.store.stats().unwrap().job_count, 0);
}

#[tokio::test]
async fn test_submit_returns_pending_snapshot() {
    let (app, state, mut receivers, _temp) = build_test_app();
    let auth = register_user(&app, "alice").await;

    let response = app
        .oneshot(post_json_authed(
            "/downloads",
            &auth.token,
            json!({"url": "https://example.com/video.mp4"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let job: DownloadJob = serde_json::from_slice(&body).unwrap();

    // The snapshot is captured before dispatch: pending, nothing else
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.user_id, auth.user.id);
    assert!(job.file_path.is_none());

    // The row was persisted before the envelope went out
    let stored = state.store.get_job(&job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Pending);

    // And the envelope did reach a worker channel (round-robin starts at 0)
    let envelope = receivers[0].try_recv().unwrap();
    assert_eq!(envelope.job_id, job.id);
}

#[tokio::test]
async fn test_listing_is_owner_scoped_and_paginated() {
    let (app, _state, _rx, _temp) = build_test_app();
    let alice = register_user(&app, "alice").await;
    let bob = register_user(&app, "bob").await;

    let mut alice_ids = Vec::new();
    for i in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json_authed(
                "/downloads",
                &alice.token,
                json!({"url": format!("https://example.com/clip-{i}.mp4")}),
            ))
            .await
            .unwrap();
        let job: DownloadJob = serde_json::from_slice(
            &axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap(),
        )
        .unwrap();
        alice_ids.push(job.id);
    }
    app.clone()
        .oneshot(post_json_authed(
            "/downloads",
            &bob.token,
            json!({"url": "https://example.com/bob.mp4"}),
        ))
        .await
        .unwrap();

    // First page, newest first
    let response = app
        .clone()
        .oneshot(get_authed("/downloads?limit=2", &alice.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page: JobListResponse = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(page.limit, 2);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].id, alice_ids[2]);
    assert_eq!(page.data[1].id, alice_ids[1]);

    // Second page
    let response = app
        .clone()
        .oneshot(get_authed("/downloads?limit=2&offset=2", &alice.token))
        .await
        .unwrap();
    let page: JobListResponse = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, alice_ids[0]);

    // Bob only ever sees his own job
    let response = app
        .oneshot(get_authed("/downloads", &bob.token))
        .await
        .unwrap();
    let page: JobListResponse = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].user_id, bob.user.id);
}

#[tokio::test]
async fn test_session_status_reports_remaining_validity() {
    let (app, _state, _rx, _temp) = build_test_app();
    let auth = register_user(&app, "alice").await;

    let response = app
        .oneshot(get_authed("/session/status", &auth.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let expires_in = body["expires_in"].as_u64().unwrap();
    assert!(expires_in > 0 && expires_in <= 1200);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state, _rx, _temp) = build_test_app();

    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["ledger"], "healthy");
}
