// ============================================================================
// UShare Core - File Info Entity
// File: crates/ushare-core/src/domain/file_info.rs
// Description: Metadata of a stored file; the id is also its on-disk name
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, UserId};

pub type FileId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: FileId,
    pub name: String,
    pub owner_id: UserId,
    pub group_id: GroupId,
    pub created_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn belongs_to(&self, group_id: GroupId) -> bool {
        self.group_id == group_id
    }
}
