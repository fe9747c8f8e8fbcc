//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::ValidationError(format!("invalid subject: {}", self.sub)))
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiry: Duration,
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            expiry: Duration::hours(expiry_hours),
        }
    }

    pub fn generate_token(&self, user_id: i64) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::ValidationError(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_carries_user_id() {
        let jwt = JwtService::new("secret", "ushare", 1);
        let token = jwt.generate_token(42).unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.iss, "ushare");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtService::new("secret", "ushare", 1).generate_token(1).unwrap();
        let other = JwtService::new("another-secret", "ushare", 1);
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = JwtService::new("secret", "someone-else", 1).generate_token(1).unwrap();
        let jwt = JwtService::new("secret", "ushare", 1);
        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let jwt = JwtService::new("secret", "ushare", -2);
        let token = jwt.generate_token(7).unwrap();
        assert!(matches!(jwt.validate_token(&token), Err(JwtError::TokenExpired)));
    }
}
