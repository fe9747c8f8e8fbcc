// ============================================================================
// UShare API - File Handlers
// File: crates/ushare-api/src/handlers/files.rs
// ============================================================================
//! Group-scoped file HTTP handlers

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::dto::{FileInfoResponse, FileQuery, FileRequest, GroupQuery, MessageResponse, UploadResponse};
use crate::error::ApiError;
use crate::handlers::run_detached;
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::validated;

/// POST /v1/protected/group/file/upload?group_name= (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<GroupQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let query = validated(query)?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
        upload = Some((filename, content));
        break;
    }

    let (filename, content) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".to_string()))?;
    info!(
        "Upload of {} ({} bytes) to {} requested",
        filename,
        content.len(),
        query.group_name
    );

    let files = state.files.clone();
    let info = run_detached(async move {
        files
            .upload(&query.group_name, user.user_id, &filename, content)
            .await
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UploadResponse { file_id: info.id })),
    ))
}

/// GET /v1/protected/group/file/download?group_name=&file_id=
pub async fn download(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let query = validated(query)?;
    let file = state
        .files
        .download(&query.group_name, user.user_id, query.file_id)
        .await?;

    let disposition = content_disposition(&file.info.name);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    )
        .into_response())
}

/// GET /v1/protected/group/file?group_name=&file_id=
pub async fn file_info(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<FileQuery>,
) -> Result<Json<ApiResponse<FileInfoResponse>>, ApiError> {
    let query = validated(query)?;
    let info = state
        .files
        .file_info(&query.group_name, user.user_id, query.file_id)
        .await?;
    Ok(Json(ApiResponse::success(info.into())))
}

/// DELETE /v1/protected/group/file/deletion
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<FileRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let payload = validated(payload)?;

    let files = state.files.clone();
    let message = format!("File {} deleted", payload.file_id);
    run_detached(async move {
        files
            .delete(&payload.group_name, user.user_id, payload.file_id)
            .await
    })
    .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// GET /v1/protected/group/files?group_name=
pub async fn list_files(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<GroupQuery>,
) -> Result<Json<ApiResponse<Vec<FileInfoResponse>>>, ApiError> {
    let query = validated(query)?;
    let files = state
        .files
        .list_files(&query.group_name, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        files.into_iter().map(FileInfoResponse::from).collect(),
    )))
}

/// ASCII `filename` fallback plus the exact name as RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitize_filename(name),
        urlencoding::encode(name)
    )
}

/// Keep the header value printable and the quoting intact.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("a\"b\\c\r\n.txt"), "a_b_c__.txt");
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
    }

    #[test]
    fn test_content_disposition_keeps_utf8_name() {
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(
            content_disposition("notes 1.txt"),
            "attachment; filename=\"notes 1.txt\"; filename*=UTF-8''notes%201.txt"
        );
    }
}
