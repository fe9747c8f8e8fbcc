// ============================================================================
// UShare API - Group Handlers
// File: crates/ushare-api/src/handlers/groups.rs
// ============================================================================
//! Group lifecycle and membership HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::dto::{GroupInfo, GroupQuery, GroupRequest, MembershipRequest, MessageResponse, UserInfo};
use crate::error::ApiError;
use crate::handlers::run_detached;
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::validated;

/// POST /v1/protected/group/creation
pub async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<GroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GroupInfo>>), ApiError> {
    let payload = validated(payload)?;

    let groups = state.groups.clone();
    let group = run_detached(async move {
        groups.create_group(user.user_id, &payload.group_name).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(group.into()))))
}

/// POST /v1/protected/group/invitation
pub async fn add_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<MembershipRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    let payload = validated(payload)?;

    let groups = state.groups.clone();
    let message = format!("{} added to {}", payload.username, payload.group_name);
    run_detached(async move {
        groups
            .add_member(user.user_id, &payload.username, &payload.group_name)
            .await
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new(message))),
    ))
}

/// DELETE /v1/protected/group/membership/revocation
pub async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<MembershipRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let payload = validated(payload)?;

    let groups = state.groups.clone();
    let message = format!("{} removed from {}", payload.username, payload.group_name);
    run_detached(async move {
        groups
            .remove_member(user.user_id, &payload.username, &payload.group_name)
            .await
    })
    .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// DELETE /v1/protected/group/deletion
///
/// Deactivates the group; content is erased later by the reaper.
pub async fn deactivate_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<GroupRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let payload = validated(payload)?;

    let groups = state.groups.clone();
    let message = format!("Group {} scheduled for deletion", payload.group_name);
    run_detached(async move {
        groups
            .deactivate_group(user.user_id, &payload.group_name)
            .await
    })
    .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// GET /v1/protected/groups
pub async fn list_groups(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<GroupInfo>>>, ApiError> {
    let groups = state.groups.list_groups().await?;
    Ok(Json(ApiResponse::success(
        groups.into_iter().map(GroupInfo::from).collect(),
    )))
}

/// GET /v1/protected/group/users?group_name=
pub async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<GroupQuery>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let query = validated(query)?;
    let members = state
        .groups
        .list_members(user.user_id, &query.group_name)
        .await?;
    Ok(Json(ApiResponse::success(
        members.into_iter().map(UserInfo::from).collect(),
    )))
}
