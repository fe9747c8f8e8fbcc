// ============================================================================
// UShare Core - Membership Entity
// File: crates/ushare-core/src/domain/membership.rs
// Description: User-Group membership, no payload beyond the timestamp
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}
