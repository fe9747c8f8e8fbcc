//! Bearer token authentication

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use ushare_core::domain::UserId;
use ushare_security::JwtError;

use crate::error::ApiError;
use crate::state::AppState;

/// Verified caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: UserId,
}

/// Missing header is 401, a header that is not `Bearer <token>` is 400, and a
/// token that fails validation is 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Authorization header must be 'Bearer <token>'".to_string())
        })?;

    let claims = state.jwt.validate_token(token).map_err(|e| match e {
        JwtError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
        _ => ApiError::Unauthorized("Invalid token".to_string()),
    })?;

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

    debug!(user_id, "Request authenticated");
    request.extensions_mut().insert(CurrentUser { user_id });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
    }
}
