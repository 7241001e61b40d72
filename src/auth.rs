use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier
    pub sub: Uuid,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// Issues and verifies signed, time-bounded access tokens.
///
/// Tokens are stateless HS256 JWTs; logout is advisory (the client discards
/// the token, there is no revocation list). Every verification failure maps
/// to the same opaque `Unauthorized` so callers cannot distinguish an expired
/// token from a forged one.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Token lifetime in seconds, for the cookie Max-Age
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issues a token for a user, valid for the configured TTL
    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verifies a token and returns the user id it was issued for
    pub fn verify(&self, token: &str) -> AppResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized)?;
        Ok(data.claims.sub)
    }

    #[cfg(test)]
    fn issue_expired(&self, user_id: Uuid) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: (now - Duration::seconds(600)).timestamp(),
            // Comfortably past the default validation leeway
            exp: (now - Duration::seconds(300)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).unwrap()
    }
}

/// Hashes a password with Argon2id for storage
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored Argon2id hash.
///
/// A wrong password and an unparseable stored hash both come back as
/// `Unauthorized`, matching the login handler's uniform failure.
pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<()> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AppError::Unauthorized)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)
}

/// Validates registration input, reporting the offending field
pub fn validate_registration(username: &str, email: &str, password: &str) -> AppResult<()> {
    if username.len() < MIN_USERNAME_LEN
        || !username.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(format!(
            "username must be at least {} characters (letters, digits, underscore)",
            MIN_USERNAME_LEN
        )));
    }

    let plausible_email = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if !plausible_email {
        return Err(AppError::Validation(
            "email is not a valid address".to_string(),
        ));
    }

    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert_ne!(hash, "correct horse battery");
        assert!(verify_password("correct horse battery", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_is_unauthorized() {
        let hash = hash_password("correct horse battery").unwrap();
        let err = verify_password("wrong password!!", &hash).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_issue_and_verify_token() {
        let signer = TokenSigner::new("test-secret", 1800);
        let user_id = Uuid::new_v4();
        let token = signer.issue(user_id).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_and_malformed_tokens_are_indistinguishable() {
        let signer = TokenSigner::new("test-secret", 1800);
        let expired = signer.issue_expired(Uuid::new_v4());

        let expired_err = signer.verify(&expired).unwrap_err();
        let malformed_err = signer.verify("not.a.token").unwrap_err();

        assert!(matches!(expired_err, AppError::Unauthorized));
        assert!(matches!(malformed_err, AppError::Unauthorized));
        assert_eq!(expired_err.to_string(), malformed_err.to_string());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let signer = TokenSigner::new("secret-a", 1800);
        let other = TokenSigner::new("secret-b", 1800);
        let token = other.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            signer.verify(&token).unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration("neo", "neo@matrix.io", "whiterabbit").is_ok());
        assert!(validate_registration("ab", "neo@matrix.io", "whiterabbit").is_err());
        assert!(validate_registration("neo one", "neo@matrix.io", "whiterabbit").is_err());
        assert!(validate_registration("neo", "not-an-email", "whiterabbit").is_err());
        assert!(validate_registration("neo", "neo@matrix", "whiterabbit").is_err());
        assert!(validate_registration("neo", "neo@matrix.io", "short").is_err());
    }
}
