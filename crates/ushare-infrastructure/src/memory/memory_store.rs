// ============================================================================
// UShare Infrastructure - In-Memory Membership Store
// File: crates/ushare-infrastructure/src/memory/memory_store.rs
// Description: Serializable in-process store for development and tests
// ============================================================================
//! A transaction holds the store-wide lock and works on a copy of the tables;
//! `commit` swaps the copy in, dropping it discards the copy. Identifier
//! sequences live outside the copy so, like database sequences, they never
//! roll back.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use ushare_core::domain::{
    FileId, FileInfo, Group, GroupId, GroupState, Membership, User, UserId,
};
use ushare_core::error::DomainError;
use ushare_core::repositories::{MembershipStore, StoreTx};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeMap<(GroupId, UserId), Membership>,
    files: BTreeMap<FileId, FileInfo>,
}

#[derive(Debug, Default)]
struct Sequences {
    user: i64,
    group: i64,
    file: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    sequences: Sequences,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.tables.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            committed: false,
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: Tables,
    committed: bool,
}

impl MemoryTx {
    fn tables(&mut self) -> Result<&mut Tables, DomainError> {
        if self.committed {
            return Err(DomainError::InternalError("transaction already committed".into()));
        }
        Ok(&mut self.working)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&mut self, username: &str, password_hash: &str) -> Result<User, DomainError> {
        if self.tables()?.users.values().any(|u| u.username == username) {
            return Err(DomainError::UsernameAlreadyExists(username.to_string()));
        }

        let user = User {
            id: next(&mut self.guard.sequences.user),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&mut self, id: UserId) -> Result<u64, DomainError> {
        Ok(self.tables()?.users.remove(&id).map_or(0, |_| 1))
    }

    async fn list_users(&mut self) -> Result<Vec<User>, DomainError> {
        Ok(self.tables()?.users.values().cloned().collect())
    }

    async fn find_group(&mut self, name: &str) -> Result<Option<Group>, DomainError> {
        Ok(self
            .tables()?
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn lock_group(&mut self, name: &str) -> Result<Option<Group>, DomainError> {
        // The transaction already holds the store-wide lock.
        self.find_group(name).await
    }

    async fn insert_group(&mut self, name: &str, owner_id: UserId) -> Result<Group, DomainError> {
        if self.tables()?.groups.values().any(|g| g.name == name) {
            return Err(DomainError::GroupNameAlreadyExists(name.to_string()));
        }

        let now = Utc::now();
        let group = Group {
            id: next(&mut self.guard.sequences.group),
            name: name.to_string(),
            owner_id,
            state: GroupState::Active,
            created_at: now,
            updated_at: now,
        };
        self.working.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn set_group_state(&mut self, group_id: GroupId, state: GroupState) -> Result<(), DomainError> {
        if state == GroupState::Erased {
            return Err(DomainError::InternalError(
                "erased is not a stored group state".into(),
            ));
        }

        if let Some(group) = self.tables()?.groups.get_mut(&group_id) {
            group.state = state;
            group.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_groups(&mut self, state: GroupState) -> Result<Vec<Group>, DomainError> {
        Ok(self
            .tables()?
            .groups
            .values()
            .filter(|g| g.state == state)
            .cloned()
            .collect())
    }

    async fn groups_owned_by(&mut self, owner_id: UserId) -> Result<Vec<Group>, DomainError> {
        Ok(self
            .tables()?
            .groups
            .values()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn erase_group(&mut self, name: &str) -> Result<u64, DomainError> {
        let tables = self.tables()?;
        let Some(id) = tables
            .groups
            .values()
            .find(|g| g.name == name && g.state == GroupState::Inactive)
            .map(|g| g.id)
        else {
            return Ok(0);
        };

        tables.groups.remove(&id);
        tables.memberships.retain(|(group_id, _), _| *group_id != id);
        tables.files.retain(|_, f| f.group_id != id);
        Ok(1)
    }

    async fn membership_exists(&mut self, group_id: GroupId, user_id: UserId) -> Result<bool, DomainError> {
        Ok(self.tables()?.memberships.contains_key(&(group_id, user_id)))
    }

    async fn insert_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<Membership, DomainError> {
        let tables = self.tables()?;
        if !tables.groups.contains_key(&group_id) {
            return Err(DomainError::DatabaseError(format!(
                "membership references missing group {}",
                group_id
            )));
        }
        if tables.memberships.contains_key(&(group_id, user_id)) {
            return Err(DomainError::AlreadyMember {
                username: user_id.to_string(),
                group: group_id.to_string(),
            });
        }

        let membership = Membership {
            group_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.memberships.insert((group_id, user_id), membership.clone());
        Ok(membership)
    }

    async fn delete_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<u64, DomainError> {
        Ok(self
            .tables()?
            .memberships
            .remove(&(group_id, user_id))
            .map_or(0, |_| 1))
    }

    async fn delete_group_memberships(&mut self, group_id: GroupId) -> Result<u64, DomainError> {
        let memberships = &mut self.tables()?.memberships;
        let before = memberships.len();
        memberships.retain(|(g, _), _| *g != group_id);
        Ok((before - memberships.len()) as u64)
    }

    async fn delete_user_memberships(&mut self, user_id: UserId) -> Result<u64, DomainError> {
        let memberships = &mut self.tables()?.memberships;
        let before = memberships.len();
        memberships.retain(|(_, u), _| *u != user_id);
        Ok((before - memberships.len()) as u64)
    }

    async fn list_members(&mut self, group_id: GroupId) -> Result<Vec<User>, DomainError> {
        let tables = self.tables()?;
        let mut members: Vec<User> = tables
            .memberships
            .keys()
            .filter(|(g, _)| *g == group_id)
            .filter_map(|(_, u)| tables.users.get(u).cloned())
            .collect();
        members.sort_by_key(|u| u.id);
        Ok(members)
    }

    async fn insert_file_info(&mut self, group_id: GroupId, owner_id: UserId, name: &str) -> Result<FileInfo, DomainError> {
        if !self.tables()?.groups.contains_key(&group_id) {
            return Err(DomainError::DatabaseError(format!(
                "file info references missing group {}",
                group_id
            )));
        }

        let info = FileInfo {
            id: next(&mut self.guard.sequences.file),
            name: name.to_string(),
            owner_id,
            group_id,
            created_at: Utc::now(),
        };
        self.working.files.insert(info.id, info.clone());
        Ok(info)
    }

    async fn find_file_info(&mut self, file_id: FileId) -> Result<Option<FileInfo>, DomainError> {
        Ok(self.tables()?.files.get(&file_id).cloned())
    }

    async fn delete_file_info(&mut self, file_id: FileId) -> Result<u64, DomainError> {
        Ok(self.tables()?.files.remove(&file_id).map_or(0, |_| 1))
    }

    async fn list_file_infos(&mut self, group_id: GroupId) -> Result<Vec<FileInfo>, DomainError> {
        Ok(self
            .tables()?
            .files
            .values()
            .filter(|f| f.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tables = std::mem::take(self.tables()?);
        self.guard.tables = tables;
        self.committed = true;
        Ok(())
    }
}
