use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use super::{
    models::{
        AuthResponse, DownloadJob, HealthResponse, JobListResponse, ListParams, LoginRequest,
        RegisterRequest, SessionStatusResponse, SubmitDownloadRequest, User,
    },
    state::AppState,
    validation::{validate_credentials, validate_download_url},
};
use crate::api::error::ApiError;
use crate::auth::CurrentUser;
use crate::queue::JobEnvelope;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Registration endpoint (POST /auth/register)
///
/// Creates an identity and returns it with a fresh bearer token, so a
/// client can start submitting downloads without a separate login.
/// Usernames are unique; a duplicate registration gets 409.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&payload.username, &payload.password)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    if state.store.username_exists(&payload.username)? {
        return Err(ApiError::UsernameTaken(payload.username));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    let user = User::new(payload.username, password_hash);
    state.store.create_user(&user)?;

    let token = state
        .tokens
        .issue(user.id, &user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.profile(),
            token,
        }),
    ))
}

/// Login endpoint (POST /auth/login)
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller: both answer 401 invalid credentials.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get_user_by_username(&payload.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let password_matches = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
    if !password_matches {
        warn!(username = %payload.username, "Login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(user.id, &user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.profile(),
        token,
    }))
}

/// Token validity probe (GET /session/status)
///
/// The gate has already verified the token; all that is left is reporting
/// how long it stays valid.
pub async fn session_status(user: CurrentUser) -> Json<SessionStatusResponse> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(SessionStatusResponse {
        message: "Session is valid".to_string(),
        expires_in: user.token_expires_at.saturating_sub(now),
    })
}

/// Download submission endpoint (POST /downloads)
///
/// This is the entry point for asynchronous downloads. It handles:
/// - Syntactic URL validation (http/https only)
/// - Creating the `pending` job row, owned by the caller
/// - Dispatching a job envelope to the worker pool
///
/// ## Flow:
/// 1. Validate the URL; reject with 400 before anything is persisted
/// 2. Insert the job with status `pending`
/// 3. Hand the envelope to the broker (bounded channel, round-robin)
/// 4. Return 201 with the pre-dispatch snapshot
///
/// The snapshot is captured before the envelope is dispatched, so the
/// response body always shows `pending` no matter how fast a worker picks
/// the job up. Worker failures never surface here; they are observable
/// only by polling GET /downloads.
pub async fn submit_download(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SubmitDownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_download_url(&payload.url).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    let job = DownloadJob::new(user.id, payload.url);

    // Persist before dispatch: a worker must never see a job id that is
    // not yet in the ledger.
    state.store.upsert_job(&job)?;
    state.broker.dispatch(JobEnvelope { job_id: job.id }).await;

    state.metrics.job_submitted();
    info!(job_id = %job.id, user_id = %user.id, url = %job.url, "Download job accepted");

    Ok((StatusCode::CREATED, Json(job)))
}

/// Download listing endpoint (GET /downloads?limit&offset)
///
/// The caller's jobs, newest-first. Reads are eventually consistent with
/// the workers: `pending` and `downloading` entries are normal here.
pub async fn list_downloads(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<JobListResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let data = state.store.jobs_for_user(&user.id, limit, offset)?;

    Ok(Json(JobListResponse {
        data,
        limit,
        offset,
    }))
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable if any component is unhealthy,
/// 200 OK otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let ledger_status = match state.store.stats() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    components.insert("ledger".to_string(), ledger_status.to_string());

    let broker_status = if state.broker.health_check() {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("broker".to_string(), broker_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
