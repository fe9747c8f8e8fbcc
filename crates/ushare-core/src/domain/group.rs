// ============================================================================
// UShare Core - Group Entity
// File: crates/ushare-core/src/domain/group.rs
// Description: Sharing group and its two-phase deletion lifecycle
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::DomainError;

pub type GroupId = i64;

/// Lifecycle of a group: `Active -> Inactive -> Erased`, never backwards.
///
/// `Erased` is never stored; it is what a missing row means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Active,
    Inactive,
    Erased,
}

impl GroupState {
    pub fn from_active(active: bool) -> Self {
        if active {
            GroupState::Active
        } else {
            GroupState::Inactive
        }
    }

    /// State of a looked-up group, `Erased` when there is no row.
    pub fn of(group: Option<&Group>) -> Self {
        group.map_or(GroupState::Erased, |g| g.state)
    }

    pub fn is_active(self) -> bool {
        self == GroupState::Active
    }

    pub fn deactivate(self, name: &str) -> Result<Self, DomainError> {
        match self {
            GroupState::Active => Ok(GroupState::Inactive),
            GroupState::Inactive => Err(DomainError::GroupInactive(name.to_string())),
            GroupState::Erased => Err(DomainError::GroupErased(name.to_string())),
        }
    }

    pub fn erase(self, name: &str) -> Result<Self, DomainError> {
        match self {
            GroupState::Inactive => Ok(GroupState::Erased),
            GroupState::Active => Err(DomainError::GroupStillActive(name.to_string())),
            GroupState::Erased => Err(DomainError::GroupErased(name.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupState::Active => "active",
            GroupState::Inactive => "inactive",
            GroupState::Erased => "erased",
        }
    }
}

/// Group entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub owner_id: UserId,
    pub state: GroupState,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn require_active(&self) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::GroupInactive(self.name.clone()))
        }
    }

    pub fn deactivate(&mut self) -> Result<(), DomainError> {
        self.state = self.state.deactivate(&self.name)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(state: GroupState) -> Group {
        Group {
            id: 1,
            name: "team-x-files".to_string(),
            owner_id: 10,
            state,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_lifecycle_moves_forward_only() {
        let state = GroupState::Active.deactivate("g").unwrap();
        assert_eq!(state, GroupState::Inactive);
        assert_eq!(state.erase("g").unwrap(), GroupState::Erased);

        assert!(matches!(
            GroupState::Inactive.deactivate("g"),
            Err(DomainError::GroupInactive(_))
        ));
        assert!(matches!(
            GroupState::Active.erase("g"),
            Err(DomainError::GroupStillActive(_))
        ));
        assert!(matches!(
            GroupState::Erased.deactivate("g"),
            Err(DomainError::GroupErased(_))
        ));
        assert!(GroupState::Erased.erase("g").is_err());
    }

    #[test]
    fn test_missing_row_is_erased() {
        assert_eq!(GroupState::of(None), GroupState::Erased);
        assert_eq!(GroupState::of(Some(&group(GroupState::Inactive))), GroupState::Inactive);
    }

    #[test]
    fn test_deactivate_group() {
        let mut g = group(GroupState::Active);
        assert!(g.require_active().is_ok());
        g.deactivate().unwrap();
        assert!(!g.is_active());
        assert!(g.require_active().is_err());
        assert!(g.deactivate().is_err());
    }

    #[test]
    fn test_ownership() {
        let g = group(GroupState::Active);
        assert!(g.is_owned_by(10));
        assert!(!g.is_owned_by(11));
    }
}
