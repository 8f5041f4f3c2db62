//! Bearer-token validation. Tokens are issued elsewhere; this side only verifies
//! them and extracts the user id from the `sub` claim.

use crate::game::core::{AuthError, Authenticator, UserId};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// HS256 JWT authenticator
pub struct JwtAuthenticator {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Some(DecodingKey::from_secret(secret.as_bytes())),
            validation: Self::validation(),
        }
    }

    /// Rejects every token; used when no secret is configured.
    pub fn unconfigured() -> Self {
        Self {
            key: None,
            validation: Self::validation(),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;
        validation
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NotConfigured)?;
        let claims = decode::<Claims>(token, key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub".to_string()));
        }
        Ok(claims)
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        self.validate(token).map(|claims| claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token(sub: &str, exp: Option<u64>, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> Option<u64> {
        Some((Utc::now().timestamp() + 3600) as u64)
    }

    #[tokio::test]
    async fn valid_token_yields_subject() {
        let auth = JwtAuthenticator::new(SECRET);
        let user = auth
            .authenticate(&token("alice", in_one_hour(), SECRET))
            .await
            .unwrap();
        assert_eq!(user, "alice");
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let auth = JwtAuthenticator::new(SECRET);
        assert_eq!(auth.validate(&token("bob", None, SECRET)).unwrap().sub, "bob");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let result = auth.validate(&token("alice", in_one_hour(), "other-secret"));
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let expired = Some((Utc::now().timestamp() - 3600) as u64);
        let result = auth.validate(&token("alice", expired, SECRET));
        assert_eq!(result.unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn empty_subject_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let result = auth.validate(&token("", None, SECRET));
        assert_eq!(result.unwrap_err(), AuthError::MissingClaim("sub".to_string()));
    }

    #[test]
    fn unconfigured_rejects_everything() {
        let auth = JwtAuthenticator::unconfigured();
        let result = auth.validate(&token("alice", None, SECRET));
        assert_eq!(result.unwrap_err(), AuthError::NotConfigured);
    }

    #[test]
    fn garbage_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        assert_eq!(auth.validate("not-a-jwt").unwrap_err(), AuthError::InvalidToken);
    }
}
