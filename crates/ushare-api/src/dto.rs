//! Request and response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use ushare_core::domain::{FileId, FileInfo, Group, User};

use crate::validation::{validate_group_name, validate_password, validate_username};

/// Registration payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

/// Login payload. Format rules are not applied, a bad pair is just a failed login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GroupRequest {
    #[validate(custom(function = "validate_group_name"))]
    pub group_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MembershipRequest {
    #[validate(custom(function = "validate_group_name"))]
    pub group_name: String,
    #[validate(custom(function = "validate_username"))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FileRequest {
    #[validate(custom(function = "validate_group_name"))]
    pub group_name: String,
    #[validate(range(min = 1, message = "file_id must be positive"))]
    pub file_id: FileId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GroupQuery {
    #[validate(custom(function = "validate_group_name"))]
    pub group_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FileQuery {
    #[validate(custom(function = "validate_group_name"))]
    pub group_name: String,
    #[validate(range(min = 1, message = "file_id must be positive"))]
    pub file_id: FileId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

impl From<Group> for GroupInfo {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            owner_id: group.owner_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileInfoResponse {
    pub file_id: FileId,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub owner_id: i64,
}

impl From<FileInfo> for FileInfoResponse {
    fn from(info: FileInfo) -> Self {
        Self {
            file_id: info.id,
            file_name: info.name,
            uploaded_at: info.created_at,
            owner_id: info.owner_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: FileId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
