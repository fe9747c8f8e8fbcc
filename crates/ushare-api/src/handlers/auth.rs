// ============================================================================
// UShare API - Auth Handlers
// File: crates/ushare-api/src/handlers/auth.rs
// ============================================================================
//! Account HTTP handlers (register, login, delete account, list users)

use axum::{extract::State, http::StatusCode, Json};

use crate::dto::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, UserInfo};
use crate::error::ApiError;
use crate::handlers::run_detached;
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::validated;

/// Register handler - POST /v1/public/user/registration
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    let payload = validated(payload)?;

    let auth = state.auth.clone();
    let user = run_detached(async move {
        auth.register(&payload.username, &payload.password).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

/// Login handler - POST /v1/public/user/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let payload = validated(payload)?;

    let auth = state.auth.clone();
    let result = run_detached(async move {
        auth.login(&payload.username, &payload.password).await
    })
    .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: result.token,
    })))
}

/// Delete own account - DELETE /v1/protected/group/user/deletion
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let auth = state.auth.clone();
    run_detached(async move { auth.delete_user(user.user_id).await }).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted",
    ))))
}

/// GET /v1/protected/users
pub async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let users = state.auth.list_users().await?;
    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserInfo::from).collect(),
    )))
}
