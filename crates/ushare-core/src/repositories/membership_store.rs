//! Membership store traits (ports)
//!
//! Every read and write of users, groups, memberships, and file metadata goes
//! through a [`StoreTx`]. A transaction that is dropped without [`StoreTx::commit`]
//! rolls back.

use async_trait::async_trait;

use crate::domain::{FileId, FileInfo, Group, GroupId, GroupState, Membership, User, UserId};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreTx: Send {
    // Users
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, DomainError>;
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, DomainError>;
    /// Fails with `UsernameAlreadyExists` on a duplicate username.
    async fn insert_user(&mut self, username: &str, password_hash: &str) -> Result<User, DomainError>;
    async fn delete_user(&mut self, id: UserId) -> Result<u64, DomainError>;
    async fn list_users(&mut self) -> Result<Vec<User>, DomainError>;

    // Groups
    async fn find_group(&mut self, name: &str) -> Result<Option<Group>, DomainError>;
    /// Like `find_group` but holds the row until the transaction ends.
    async fn lock_group(&mut self, name: &str) -> Result<Option<Group>, DomainError>;
    /// Fails with `GroupNameAlreadyExists` when any row holds the name.
    async fn insert_group(&mut self, name: &str, owner_id: UserId) -> Result<Group, DomainError>;
    async fn set_group_state(&mut self, group_id: GroupId, state: GroupState) -> Result<(), DomainError>;
    async fn list_groups(&mut self, state: GroupState) -> Result<Vec<Group>, DomainError>;
    async fn groups_owned_by(&mut self, owner_id: UserId) -> Result<Vec<Group>, DomainError>;
    /// Hard delete of an inactive group row together with anything still attached to it.
    async fn erase_group(&mut self, name: &str) -> Result<u64, DomainError>;

    // Memberships
    async fn membership_exists(&mut self, group_id: GroupId, user_id: UserId) -> Result<bool, DomainError>;
    /// Fails with `AlreadyMember` on a duplicate pair.
    async fn insert_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<Membership, DomainError>;
    async fn delete_membership(&mut self, group_id: GroupId, user_id: UserId) -> Result<u64, DomainError>;
    async fn delete_group_memberships(&mut self, group_id: GroupId) -> Result<u64, DomainError>;
    async fn delete_user_memberships(&mut self, user_id: UserId) -> Result<u64, DomainError>;
    async fn list_members(&mut self, group_id: GroupId) -> Result<Vec<User>, DomainError>;

    // File metadata
    async fn insert_file_info(&mut self, group_id: GroupId, owner_id: UserId, name: &str) -> Result<FileInfo, DomainError>;
    async fn find_file_info(&mut self, file_id: FileId) -> Result<Option<FileInfo>, DomainError>;
    async fn delete_file_info(&mut self, file_id: FileId) -> Result<u64, DomainError>;
    async fn list_file_infos(&mut self, group_id: GroupId) -> Result<Vec<FileInfo>, DomainError>;

    async fn commit(&mut self) -> Result<(), DomainError>;
}
