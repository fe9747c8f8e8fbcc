//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
}

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash("correct-horse-1!").unwrap();
        assert_ne!(hash, "correct-horse-1!");
        assert!(PasswordService::verify("correct-horse-1!", &hash).unwrap());
        assert!(!PasswordService::verify("wrong-horse-1!", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash() {
        assert!(PasswordService::verify("anything", "not-a-phc-string").is_err());
    }
}
