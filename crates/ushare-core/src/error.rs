//! Domain errors

use thiserror::Error;

use crate::domain::{FileId, UserId};

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PermissionDenied,
    InvalidInput,
    Unauthenticated,
    StoreFailure,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User with id {0} not found")]
    UserNotFoundById(UserId),

    #[error("Group [{0}] does not exist")]
    GroupNotFound(String),

    #[error("File {0} does not exist")]
    FileNotFound(FileId),

    #[error("Membership of {username} in group [{group}] not found")]
    MembershipNotFound { username: String, group: String },

    #[error("A user with the username {0} already exists")]
    UsernameAlreadyExists(String),

    #[error("A group with the name [{0}] already exists")]
    GroupNameAlreadyExists(String),

    #[error("{username} is already a member of group [{group}]")]
    AlreadyMember { username: String, group: String },

    #[error("Group [{0}] is being deleted")]
    GroupInactive(String),

    #[error("Group [{0}] is already erased")]
    GroupErased(String),

    #[error("Group [{0}] is still active")]
    GroupStillActive(String),

    #[error("The owner cannot leave group [{0}]")]
    OwnerCannotLeave(String),

    #[error("Only the owner of group [{0}] can do this")]
    NotGroupOwner(String),

    #[error("Not a member of group [{0}]")]
    NotGroupMember(String),

    #[error("Only the owner of the file or of group [{0}] can remove the file")]
    NotFileOwner(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::UserNotFoundById(_)
            | DomainError::GroupNotFound(_)
            | DomainError::FileNotFound(_)
            | DomainError::MembershipNotFound { .. } => ErrorKind::NotFound,

            DomainError::UsernameAlreadyExists(_)
            | DomainError::GroupNameAlreadyExists(_)
            | DomainError::AlreadyMember { .. }
            | DomainError::GroupInactive(_)
            | DomainError::GroupErased(_)
            | DomainError::GroupStillActive(_)
            | DomainError::OwnerCannotLeave(_) => ErrorKind::Conflict,

            DomainError::NotGroupOwner(_)
            | DomainError::NotGroupMember(_)
            | DomainError::NotFileOwner(_) => ErrorKind::PermissionDenied,

            DomainError::InvalidCredentials => ErrorKind::Unauthenticated,
            DomainError::ValidationError(_) => ErrorKind::InvalidInput,

            DomainError::PasswordHashError(_)
            | DomainError::TokenGenerationError(_)
            | DomainError::DatabaseError(_)
            | DomainError::StorageError(_)
            | DomainError::InternalError(_) => ErrorKind::StoreFailure,
        }
    }

    /// Only infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DomainError::GroupNotFound("g".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DomainError::GroupInactive("g".into()).kind(), ErrorKind::Conflict);
        assert_eq!(DomainError::OwnerCannotLeave("g".into()).kind(), ErrorKind::Conflict);
        assert_eq!(DomainError::NotGroupOwner("g".into()).kind(), ErrorKind::PermissionDenied);
        assert_eq!(DomainError::InvalidCredentials.kind(), ErrorKind::Unauthenticated);
        assert_eq!(DomainError::DatabaseError("x".into()).kind(), ErrorKind::StoreFailure);
    }

    #[test]
    fn test_only_store_failures_are_retryable() {
        assert!(DomainError::DatabaseError("x".into()).is_retryable());
        assert!(DomainError::StorageError("x".into()).is_retryable());
        assert!(!DomainError::GroupNameAlreadyExists("g".into()).is_retryable());
        assert!(!DomainError::NotFileOwner("g".into()).is_retryable());
    }
}
