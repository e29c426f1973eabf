//! Auth gate: bearer-token middleware for protected routes.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it with the token
//! service, loads the identity row and attaches a [`CurrentUser`] (secret
//! fields stripped) to request extensions. Runs on every request; there is
//! no session cache and no process-wide session slot.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::api::models::ErrorResponse;
use crate::api::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token provided")]
    NoToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("identity no longer exists")]
    IdentityMissing,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoToken | AuthError::InvalidToken | AuthError::IdentityMissing => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoToken => "NO_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::IdentityMissing => "IDENTITY_MISSING",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// The verified caller, attached to request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    /// Expiry of the presented token (unix seconds)
    pub token_expires_at: u64,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::NoToken)
    }
}

/// Middleware protecting authenticated routes.
///
/// Failure taxonomy:
/// - `NoToken`: header absent or missing the `Bearer ` prefix
/// - `InvalidToken`: signature/expiry verification failed, or the subject
///   claim is not a user id
/// - `IdentityMissing`: token verified but the user row is gone
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::NoToken)?;

    let claims = state.tokens.verify(token).map_err(|_| {
        warn!("Rejected request with invalid token");
        AuthError::InvalidToken
    })?;

    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

    let user = state
        .store
        .get_user(&user_id)
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or_else(|| {
            warn!(%user_id, "Token subject has no identity row");
            AuthError::IdentityMissing
        })?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        token_expires_at: claims.exp,
    });

    Ok(next.run(request).await)
}
