//! Lookups and authorization checks shared by the engine services.
//!
//! All helpers run inside a caller-owned transaction.

use tracing::warn;

use crate::domain::{Group, User, UserId};
use crate::error::DomainError;
use crate::repositories::StoreTx;

/// Load a group by name, `GroupNotFound` when there is no row.
pub(crate) async fn load_group(tx: &mut dyn StoreTx, name: &str) -> Result<Group, DomainError> {
    tx.find_group(name)
        .await?
        .ok_or_else(|| DomainError::GroupNotFound(name.to_string()))
}

/// Same as [`load_group`] but the row stays locked until the transaction ends.
pub(crate) async fn lock_group(tx: &mut dyn StoreTx, name: &str) -> Result<Group, DomainError> {
    tx.lock_group(name)
        .await?
        .ok_or_else(|| DomainError::GroupNotFound(name.to_string()))
}

pub(crate) async fn load_user(tx: &mut dyn StoreTx, username: &str) -> Result<User, DomainError> {
    tx.find_user_by_username(username)
        .await?
        .ok_or_else(|| DomainError::UserNotFound(username.to_string()))
}

pub(crate) async fn load_user_by_id(tx: &mut dyn StoreTx, id: UserId) -> Result<User, DomainError> {
    tx.find_user_by_id(id)
        .await?
        .ok_or(DomainError::UserNotFoundById(id))
}

pub(crate) fn require_owner(group: &Group, user_id: UserId) -> Result<(), DomainError> {
    if group.is_owned_by(user_id) {
        Ok(())
    } else {
        warn!("User {} is not the owner of group [{}]", user_id, group.name);
        Err(DomainError::NotGroupOwner(group.name.clone()))
    }
}

pub(crate) async fn require_member(
    tx: &mut dyn StoreTx,
    group: &Group,
    user_id: UserId,
) -> Result<(), DomainError> {
    if tx.membership_exists(group.id, user_id).await? {
        Ok(())
    } else {
        warn!("User {} is not a member of group [{}]", user_id, group.name);
        Err(DomainError::NotGroupMember(group.name.clone()))
    }
}

/// Existence, then activeness, then membership. An inactive group answers
/// `GroupInactive` to everyone, members or not.
pub(crate) async fn load_active_group_for_member(
    tx: &mut dyn StoreTx,
    name: &str,
    user_id: UserId,
) -> Result<Group, DomainError> {
    let group = load_group(tx, name).await?;
    group.require_active()?;
    require_member(tx, &group, user_id).await?;
    Ok(group)
}
