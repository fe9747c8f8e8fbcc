// ============================================================================
// UShare Core - Authentication Service
// File: crates/ushare-core/src/services/auth_service.rs
// ============================================================================
//! Authentication service with register, login, account deletion and user listing

use std::sync::Arc;

use tracing::{info, warn};
use ushare_security::{JwtService, PasswordService};
use ushare_shared::config::UserDeletionPolicy;

use crate::domain::{User, UserId};
use crate::error::DomainError;
use crate::repositories::MembershipStore;

/// Authentication service for handling user login/register flows
pub struct AuthService {
    store: Arc<dyn MembershipStore>,
    jwt: Arc<JwtService>,
    deletion_policy: UserDeletionPolicy,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        jwt: Arc<JwtService>,
        deletion_policy: UserDeletionPolicy,
    ) -> Self {
        Self {
            store,
            jwt,
            deletion_policy,
        }
    }

    /// Register a new user
    pub async fn register(&self, username: &str, password: &str) -> Result<User, DomainError> {
        info!("Registration attempt for username: {}", username);

        // 1. Hash password before holding a transaction open
        let password_hash = PasswordService::hash(password)
            .map_err(|e| DomainError::PasswordHashError(e.to_string()))?;

        let mut tx = self.store.begin().await?;

        // 2. Check if username already exists
        if tx.find_user_by_username(username).await?.is_some() {
            warn!("Registration failed: username already exists: {}", username);
            return Err(DomainError::UsernameAlreadyExists(username.to_string()));
        }

        // 3. Save (a concurrent registration trips the unique constraint)
        let user = tx.insert_user(username, &password_hash).await?;
        tx.commit().await?;

        info!("Registration successful for: {} (id {})", username, user.id);
        Ok(user)
    }

    /// Login with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, DomainError> {
        info!("Login attempt for username: {}", username);

        // 1. Find user
        let user = {
            let mut tx = self.store.begin().await?;
            let user = tx.find_user_by_username(username).await?;
            tx.commit().await?;
            user
        }
        .ok_or_else(|| {
            warn!("Login failed: unknown username: {}", username);
            DomainError::InvalidCredentials
        })?;

        // 2. Verify password
        let password_valid = PasswordService::verify(password, &user.password_hash)
            .map_err(|_e| DomainError::InvalidCredentials)?;

        if !password_valid {
            warn!("Login failed: invalid password for: {}", username);
            return Err(DomainError::InvalidCredentials);
        }

        // 3. Issue token
        let token = self
            .jwt
            .generate_token(user.id)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        info!("Login successful for: {}", username);
        Ok(LoginResult { user, token })
    }

    /// Delete the caller's own account, applying the configured policy to
    /// their memberships and owned groups.
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        let user = tx
            .find_user_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFoundById(user_id))?;

        if self.deletion_policy == UserDeletionPolicy::Cascade {
            for mut group in tx.groups_owned_by(user_id).await? {
                if !group.is_active() {
                    continue;
                }
                tx.delete_group_memberships(group.id).await?;
                group.deactivate()?;
                tx.set_group_state(group.id, group.state).await?;
                info!("Group [{}] deactivated with its owner {}", group.name, user.username);
            }
            tx.delete_user_memberships(user_id).await?;
        }

        if tx.delete_user(user_id).await? == 0 {
            return Err(DomainError::UserNotFoundById(user_id));
        }
        tx.commit().await?;

        info!(
            "User {} deleted (policy {:?})",
            user.username, self.deletion_policy
        );
        Ok(())
    }

    /// All users ordered by id.
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let mut tx = self.store.begin().await?;
        let users = tx.list_users().await?;
        tx.commit().await?;
        Ok(users)
    }
}

/// Result of successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub token: String,
}
