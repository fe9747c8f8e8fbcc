//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}
