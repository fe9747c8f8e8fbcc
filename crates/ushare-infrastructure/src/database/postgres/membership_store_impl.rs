// ============================================================================
// UShare Infrastructure - PostgreSQL Membership Store
// File: crates/ushare-infrastructure/src/database/postgres/membership_store_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, error};

use ushare_core::domain::{
    FileId, FileInfo, Group, GroupId, GroupState, Membership, User, UserId,
};
use ushare_core::error::DomainError;
use ushare_core::repositories::{MembershipStore, StoreTx};

pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        let tx = self.pool.begin().await.map_err(db_error("beginning transaction"))?;
        Ok(Box::new(PgStoreTx { tx: Some(tx) }))
    }
}

/// Rolled back by sqlx when dropped uncommitted.
pub struct PgStoreTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTx {
    fn conn(&mut self) -> Result<&mut PgConnection, DomainError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| DomainError::InternalError("transaction already committed".into()))
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct GroupRow {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            state: GroupState::from_active(row.active),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct FileInfoRow {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub group_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<FileInfoRow> for FileInfo {
    fn from(row: FileInfoRow) -> Self {
        FileInfo {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e: sqlx::Error| {
        error!("Database error {}: {}", context, e);
        DomainError::DatabaseError(e.to_string())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

const USER_COLUMNS: &str = "id, username, password_hash, created_at";
const GROUP_COLUMNS: &str = "id, name, owner_id, active, created_at, updated_at";

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.conn()?)
                .await
                .map_err(db_error("finding user by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(self.conn()?)
                .await
                .map_err(db_error("finding user by username"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn insert_user(&mut self, username: &str, password_hash: &str) -> Result<User, DomainError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::UsernameAlreadyExists(username.to_string())
            } else {
                db_error("inserting user")(e)
            }
        })?;

        Ok(row.into())
    }

    async fn delete_user(&mut self, id: UserId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("deleting user"))?;

        Ok(result.rows_affected())
    }

    async fn list_users(&mut self) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(self.conn()?)
                .await
                .map_err(db_error("listing users"))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<Group>, DomainError> {
        let row: Option<GroupRow> =
            sqlx::query_as(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE name = $1"))
                .bind(name)
                .fetch_optional(self.conn()?)
                .await
                .map_err(db_error("finding group"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn lock_group(&mut self, name: &str) -> Result<Option<Group>, DomainError> {
        let row: Option<GroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE name = $1 FOR UPDATE"
        ))
        .bind(name)
        .fetch_optional(self.conn()?)
        .await
        .map_err(db_error("locking group"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn insert_group(&mut self, name: &str, owner_id: UserId) -> Result<Group, DomainError> {
        let row: GroupRow = sqlx::query_as(&format!(
            "INSERT INTO groups (name, owner_id, active) VALUES ($1, $2, TRUE) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(name)
        .bind(owner_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::GroupNameAlreadyExists(name.to_string())
            } else {
                db_error("inserting group")(e)
            }
        })?;

        Ok(row.into())
    }

    async fn set_group_state(&mut self, group_id: GroupId, state: GroupState) -> Result<(), DomainError> {
        if state == GroupState::Erased {
            return Err(DomainError::InternalError(
                "erased is not a stored group state".into(),
            ));
        }

        sqlx::query("UPDATE groups SET active = $2, updated_at = now() WHERE id = $1")
            .bind(group_id)
            .bind(state.is_active())
            .execute(self.conn()?)
            .await
            .map_err(db_error("updating group state"))?;

        Ok(())
    }

    async fn list_groups(&mut self, state: GroupState) -> Result<Vec<Group>, DomainError> {
        if state == GroupState::Erased {
            return Ok(Vec::new());
        }

        let rows: Vec<GroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE active = $1 ORDER BY id"
        ))
        .bind(state.is_active())
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("listing groups"))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn groups_owned_by(&mut self, owner_id: UserId) -> Result<Vec<Group>, DomainError> {
        let rows: Vec<GroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE owner_id = $1 ORDER BY id FOR UPDATE"
        ))
        .bind(owner_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("listing owned groups"))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn erase_group(&mut self, name: &str) -> Result<u64, DomainError> {
        // Memberships and file infos go with the row (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM groups WHERE name = $1 AND active = FALSE")
            .bind(name)
            .execute(self.conn()?)
            .await
            .map_err(db_error("erasing group"))?;

        debug!("Erase of group [{}] affected {} row(s)", name, result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn membership_exists(&mut self, group_id: GroupId, user_id: UserId) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM memberships WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(db_error("checking membership"))?;

        Ok(exists)
    }

    async fn insert_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<Membership, DomainError> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO memberships (group_id, user_id) VALUES ($1, $2) RETURNING created_at",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::AlreadyMember {
                    username: user_id.to_string(),
                    group: group_id.to_string(),
                }
            } else {
                db_error("inserting membership")(e)
            }
        })?;

        Ok(Membership {
            group_id,
            user_id,
            created_at,
        })
    }

    async fn delete_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("deleting membership"))?;

        Ok(result.rows_affected())
    }

    async fn delete_group_memberships(&mut self, group_id: GroupId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE group_id = $1")
            .bind(group_id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("deleting group memberships"))?;

        Ok(result.rows_affected())
    }

    async fn delete_user_memberships(&mut self, user_id: UserId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE user_id = $1")
            .bind(user_id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("deleting user memberships"))?;

        Ok(result.rows_affected())
    }

    async fn list_members(&mut self, group_id: GroupId) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.password_hash, u.created_at
            FROM users u
            JOIN memberships m ON m.user_id = u.id
            WHERE m.group_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(group_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("listing members"))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn insert_file_info(&mut self, group_id: GroupId, owner_id: UserId, name: &str) -> Result<FileInfo, DomainError> {
        let row: FileInfoRow = sqlx::query_as(
            r#"
            INSERT INTO file_infos (name, owner_id, group_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, owner_id, group_id, created_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .bind(group_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(db_error("inserting file info"))?;

        Ok(row.into())
    }

    async fn find_file_info(&mut self, file_id: FileId) -> Result<Option<FileInfo>, DomainError> {
        let row: Option<FileInfoRow> = sqlx::query_as(
            "SELECT id, name, owner_id, group_id, created_at FROM file_infos WHERE id = $1",
        )
        .bind(file_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(db_error("finding file info"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete_file_info(&mut self, file_id: FileId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM file_infos WHERE id = $1")
            .bind(file_id)
            .execute(self.conn()?)
            .await
            .map_err(db_error("deleting file info"))?;

        Ok(result.rows_affected())
    }

    async fn list_file_infos(&mut self, group_id: GroupId) -> Result<Vec<FileInfo>, DomainError> {
        let rows: Vec<FileInfoRow> = sqlx::query_as(
            "SELECT id, name, owner_id, group_id, created_at FROM file_infos WHERE group_id = $1 ORDER BY id",
        )
        .bind(group_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(db_error("listing file infos"))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DomainError::InternalError("transaction already committed".into()))?;
        tx.commit().await.map_err(db_error("committing transaction"))
    }
}
