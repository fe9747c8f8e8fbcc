// ============================================================================
// UShare Core - Group Service
// File: crates/ushare-core/src/services/group_service.rs
// Description: Group lifecycle and membership mutations
// ============================================================================
//! Group service: create/deactivate groups, add/remove members, listings.
//!
//! Every mutation is one store transaction. `create_group` is the only
//! operation that touches the blob area before commit; it removes the new
//! directory again when the transaction fails, and recreates it after commit
//! if a concurrent reap took it.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::access::{
    load_active_group_for_member, load_user, load_user_by_id, lock_group, require_owner,
};
use crate::domain::{Group, GroupState, User, UserId};
use crate::error::DomainError;
use crate::repositories::{BlobArea, BlobError, MembershipStore};

pub struct GroupService {
    store: Arc<dyn MembershipStore>,
    blobs: Arc<dyn BlobArea>,
}

impl GroupService {
    pub fn new(store: Arc<dyn MembershipStore>, blobs: Arc<dyn BlobArea>) -> Self {
        Self { store, blobs }
    }

    /// Create a group owned by `owner_id`, who also becomes its first member.
    pub async fn create_group(&self, owner_id: UserId, name: &str) -> Result<Group, DomainError> {
        info!("Create group [{}] requested by user {}", name, owner_id);

        // 1. Directory first. An existing directory means the name is taken
        //    (possibly by an inactive group the reaper has not reached yet).
        match self.blobs.create_group_dir(name).await {
            Ok(()) => {}
            Err(BlobError::AlreadyExists(_)) => {
                warn!("Create group failed: directory for [{}] already exists", name);
                return Err(DomainError::GroupNameAlreadyExists(name.to_string()));
            }
            Err(BlobError::InvalidName(n)) => {
                return Err(DomainError::ValidationError(format!("invalid group name: {}", n)));
            }
            Err(e) => {
                error!("Create group failed: cannot create directory for [{}]: {}", name, e);
                return Err(e.into());
            }
        }

        // 2. Rows. On failure the directory created above is compensated.
        let group = match self.insert_group_rows(owner_id, name).await {
            Ok(group) => group,
            Err(e) => {
                warn!("Create group [{}] rolled back: {}", name, e);
                if let Err(cleanup) = self.blobs.remove_group_dir(name).await {
                    error!(
                        "Orphaned directory for group [{}] left behind: {}",
                        name, cleanup
                    );
                }
                return Err(e);
            }
        };

        // 3. A reaper tick finishing an older inactive group of the same name
        //    may have removed our directory between steps 1 and 2.
        self.ensure_group_dir(name).await?;

        info!("Group [{}] created with id {}", group.name, group.id);
        Ok(group)
    }

    /// Recreates the directory of a committed active group if it is missing.
    async fn ensure_group_dir(&self, name: &str) -> Result<(), DomainError> {
        if self.blobs.group_dir_exists(name).await? {
            return Ok(());
        }

        warn!("Directory of new group [{}] vanished before commit, recreating", name);
        match self.blobs.create_group_dir(name).await {
            Ok(()) | Err(BlobError::AlreadyExists(_)) => Ok(()),
            Err(e) => {
                error!(
                    "Data consistency warning: active group [{}] has no directory: {}",
                    name, e
                );
                Err(e.into())
            }
        }
    }

    async fn insert_group_rows(&self, owner_id: UserId, name: &str) -> Result<Group, DomainError> {
        let mut tx = self.store.begin().await?;

        load_user_by_id(tx.as_mut(), owner_id).await?;

        // Inactive rows still reserve the name.
        if let Some(existing) = tx.find_group(name).await? {
            warn!(
                "Create group failed: [{}] exists in state {}",
                name,
                existing.state.as_str()
            );
            return Err(DomainError::GroupNameAlreadyExists(name.to_string()));
        }

        let group = tx.insert_group(name, owner_id).await?;
        tx.insert_membership(group.id, owner_id).await?;
        tx.commit().await?;

        Ok(group)
    }

    /// Owner-only. Adds `username` to an active group.
    pub async fn add_member(
        &self,
        acting_user_id: UserId,
        username: &str,
        group_name: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        let group = lock_group(tx.as_mut(), group_name).await?;
        group.require_active()?;
        require_owner(&group, acting_user_id)?;

        let user = load_user(tx.as_mut(), username).await?;

        let already_member = || DomainError::AlreadyMember {
            username: username.to_string(),
            group: group_name.to_string(),
        };

        if tx.membership_exists(group.id, user.id).await? {
            warn!("{} is already a member of [{}]", username, group_name);
            return Err(already_member());
        }

        // A concurrent insert of the same pair surfaces as a uniqueness violation.
        tx.insert_membership(group.id, user.id)
            .await
            .map_err(|e| match e {
                DomainError::AlreadyMember { .. } => already_member(),
                other => other,
            })?;
        tx.commit().await?;

        info!("{} added to group [{}]", username, group_name);
        Ok(())
    }

    /// The owner may remove anyone but themself; members may remove themselves.
    pub async fn remove_member(
        &self,
        acting_user_id: UserId,
        username: &str,
        group_name: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        let group = lock_group(tx.as_mut(), group_name).await?;
        group.require_active()?;

        let user = load_user(tx.as_mut(), username).await?;

        if user.id == acting_user_id {
            if group.is_owned_by(acting_user_id) {
                warn!("Owner of [{}] tried to leave the group", group_name);
                return Err(DomainError::OwnerCannotLeave(group_name.to_string()));
            }
        } else {
            require_owner(&group, acting_user_id)?;
        }

        let removed = tx.delete_membership(group.id, user.id).await?;
        if removed == 0 {
            return Err(DomainError::MembershipNotFound {
                username: username.to_string(),
                group: group_name.to_string(),
            });
        }
        tx.commit().await?;

        info!("{} removed from group [{}]", username, group_name);
        Ok(())
    }

    /// First phase of group deletion. Revokes every membership and marks the
    /// group inactive; the reaper erases it later.
    pub async fn deactivate_group(
        &self,
        acting_user_id: UserId,
        group_name: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        let mut group = lock_group(tx.as_mut(), group_name).await?;
        group.require_active()?;
        require_owner(&group, acting_user_id)?;

        let revoked = tx.delete_group_memberships(group.id).await?;
        group.deactivate()?;
        tx.set_group_state(group.id, group.state).await?;
        tx.commit().await?;

        info!(
            "Group [{}] deactivated, {} membership(s) revoked",
            group_name, revoked
        );
        Ok(())
    }

    /// Active groups ordered by id.
    pub async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        let mut tx = self.store.begin().await?;
        let groups = tx.list_groups(GroupState::Active).await?;
        tx.commit().await?;
        Ok(groups)
    }

    pub async fn list_members(
        &self,
        acting_user_id: UserId,
        group_name: &str,
    ) -> Result<Vec<User>, DomainError> {
        let mut tx = self.store.begin().await?;
        let group = load_active_group_for_member(tx.as_mut(), group_name, acting_user_id).await?;
        let members = tx.list_members(group.id).await?;
        tx.commit().await?;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Membership;
    use crate::error::ErrorKind;
    use crate::repositories::{MockBlobArea, MockMembershipStore, MockStoreTx, StoreTx};
    use chrono::Utc;

    fn user(id: UserId, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    fn group(owner_id: UserId, state: GroupState) -> Group {
        Group {
            id: 7,
            name: "team-x-files".to_string(),
            owner_id,
            state,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store_with(tx: MockStoreTx) -> MockMembershipStore {
        let mut store = MockMembershipStore::new();
        store
            .expect_begin()
            .return_once(move || Ok(Box::new(tx) as Box<dyn StoreTx>));
        store
    }

    #[tokio::test]
    async fn test_create_group_removes_directory_when_insert_fails() {
        let mut blobs = MockBlobArea::new();
        blobs.expect_create_group_dir().times(1).returning(|_| Ok(()));
        blobs.expect_remove_group_dir().times(1).returning(|_| Ok(()));

        let mut tx = MockStoreTx::new();
        tx.expect_find_user_by_id().returning(|id| Ok(Some(user(id, "alice_owner"))));
        tx.expect_find_group().returning(|_| Ok(None));
        tx.expect_insert_group()
            .returning(|_, _| Err(DomainError::DatabaseError("connection reset".into())));
        tx.expect_commit().never();

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(blobs));
        let err = service.create_group(1, "team-x-files").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreFailure);
    }

    #[tokio::test]
    async fn test_create_group_removes_directory_when_begin_fails() {
        let mut blobs = MockBlobArea::new();
        blobs.expect_create_group_dir().returning(|_| Ok(()));
        blobs.expect_remove_group_dir().times(1).returning(|_| Ok(()));

        let mut store = MockMembershipStore::new();
        store
            .expect_begin()
            .returning(|| Err(DomainError::DatabaseError("pool timed out".into())));

        let service = GroupService::new(Arc::new(store), Arc::new(blobs));
        assert!(service.create_group(1, "team-x-files").await.is_err());
    }

    #[tokio::test]
    async fn test_create_group_with_existing_directory_is_conflict_and_keeps_it() {
        let mut blobs = MockBlobArea::new();
        blobs
            .expect_create_group_dir()
            .returning(|name| Err(BlobError::AlreadyExists(name.to_string())));
        blobs.expect_remove_group_dir().never();

        let mut store = MockMembershipStore::new();
        store.expect_begin().never();

        let service = GroupService::new(Arc::new(store), Arc::new(blobs));
        let err = service.create_group(1, "team-x-files").await.unwrap_err();
        assert!(matches!(err, DomainError::GroupNameAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_group_conflicts_with_inactive_row() {
        let mut blobs = MockBlobArea::new();
        blobs.expect_create_group_dir().returning(|_| Ok(()));
        blobs.expect_remove_group_dir().times(1).returning(|_| Ok(()));

        let mut tx = MockStoreTx::new();
        tx.expect_find_user_by_id().returning(|id| Ok(Some(user(id, "alice_owner"))));
        tx.expect_find_group()
            .returning(|_| Ok(Some(group(1, GroupState::Inactive))));
        tx.expect_insert_group().never();

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(blobs));
        let err = service.create_group(1, "team-x-files").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    fn creatable_tx() -> MockStoreTx {
        let mut tx = MockStoreTx::new();
        tx.expect_find_user_by_id().returning(|id| Ok(Some(user(id, "alice_owner"))));
        tx.expect_find_group().returning(|_| Ok(None));
        tx.expect_insert_group()
            .returning(|_, owner| Ok(group(owner, GroupState::Active)));
        tx.expect_insert_membership().returning(|g, u| {
            Ok(Membership {
                user_id: u,
                group_id: g,
                created_at: Utc::now(),
            })
        });
        tx.expect_commit().times(1).returning(|| Ok(()));
        tx
    }

    #[tokio::test]
    async fn test_create_group_recreates_directory_reaped_before_commit() {
        let mut blobs = MockBlobArea::new();
        // Once before the transaction, once more after finding it gone.
        blobs.expect_create_group_dir().times(2).returning(|_| Ok(()));
        blobs.expect_group_dir_exists().times(1).returning(|_| Ok(false));
        blobs.expect_remove_group_dir().never();

        let service = GroupService::new(Arc::new(store_with(creatable_tx())), Arc::new(blobs));
        let group = service.create_group(1, "team-x-files").await.unwrap();
        assert!(group.is_active());
    }

    #[tokio::test]
    async fn test_create_group_keeps_existing_directory_after_commit() {
        let mut blobs = MockBlobArea::new();
        blobs.expect_create_group_dir().times(1).returning(|_| Ok(()));
        blobs.expect_group_dir_exists().times(1).returning(|_| Ok(true));
        blobs.expect_remove_group_dir().never();

        let service = GroupService::new(Arc::new(store_with(creatable_tx())), Arc::new(blobs));
        service.create_group(1, "team-x-files").await.unwrap();
    }

    #[tokio::test]
    async fn test_add_member_by_non_owner_is_denied() {
        let mut tx = MockStoreTx::new();
        tx.expect_lock_group()
            .returning(|_| Ok(Some(group(1, GroupState::Active))));
        tx.expect_insert_membership().never();
        tx.expect_commit().never();

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(MockBlobArea::new()));
        let err = service.add_member(2, "carol_member", "team-x-files").await.unwrap_err();
        assert!(matches!(err, DomainError::NotGroupOwner(_)));
    }

    #[tokio::test]
    async fn test_add_member_maps_uniqueness_race_to_conflict() {
        let mut tx = MockStoreTx::new();
        tx.expect_lock_group()
            .returning(|_| Ok(Some(group(1, GroupState::Active))));
        tx.expect_find_user_by_username()
            .returning(|name| Ok(Some(user(3, name))));
        tx.expect_membership_exists().returning(|_, _| Ok(false));
        tx.expect_insert_membership().returning(|g, u| {
            Err(DomainError::AlreadyMember {
                username: u.to_string(),
                group: g.to_string(),
            })
        });
        tx.expect_commit().never();

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(MockBlobArea::new()));
        let err = service.add_member(1, "carol_member", "team-x-files").await.unwrap_err();
        match err {
            DomainError::AlreadyMember { username, group } => {
                assert_eq!(username, "carol_member");
                assert_eq!(group, "team-x-files");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deactivate_inactive_group_is_conflict_for_anyone() {
        let mut tx = MockStoreTx::new();
        tx.expect_lock_group()
            .returning(|_| Ok(Some(group(1, GroupState::Inactive))));
        tx.expect_delete_group_memberships().never();

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(MockBlobArea::new()));
        let err = service.deactivate_group(2, "team-x-files").await.unwrap_err();
        assert!(matches!(err, DomainError::GroupInactive(_)));
    }

    #[tokio::test]
    async fn test_deactivate_revokes_memberships_then_flips_state() {
        let mut seq = mockall::Sequence::new();
        let mut tx = MockStoreTx::new();
        tx.expect_lock_group()
            .returning(|_| Ok(Some(group(1, GroupState::Active))));
        tx.expect_delete_group_memberships()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(3));
        tx.expect_set_group_state()
            .withf(|id, state| *id == 7 && *state == GroupState::Inactive)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        tx.expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let service = GroupService::new(Arc::new(store_with(tx)), Arc::new(MockBlobArea::new()));
        service.deactivate_group(1, "team-x-files").await.unwrap();
    }
}
