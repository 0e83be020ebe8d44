use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use uuid::Uuid;

use crate::errors::auth::AuthError;
use crate::services::crypto;
use crate::types::internal::auth::Claims;

/// Manages JWT session tokens and opaque credential material
pub struct TokenService {
    jwt_secret: String,
    jwt_expiration_minutes: i64,
    magic_link_expiration_minutes: i64,
    device_expiration_days: i64,
    device_token_secret: String,
}

impl TokenService {
    /// Create a new TokenService with the given JWT secret and device token secret
    pub fn new(jwt_secret: String, device_token_secret: String) -> Self {
        Self {
            jwt_secret,
            jwt_expiration_minutes: 15,
            magic_link_expiration_minutes: 15,
            device_expiration_days: 365,
            device_token_secret,
        }
    }

    /// Generate a JWT session for the given user_id
    ///
    /// # Returns
    /// * `Result<(String, String), AuthError>` - The encoded JWT and its jti
    pub fn generate_jwt(&self, user_id: &str) -> Result<(String, String), AuthError> {
        let now = Utc::now().timestamp();
        let expiration = now + (self.jwt_expiration_minutes * 60);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration,
            iat: now,
            jti: jti.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::internal_error(format!("Failed to generate JWT: {}", e)))?;

        Ok((token, jti))
    }

    /// Validate a JWT and return the claims
    pub fn validate_jwt(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            // Check if the error is due to expiration
            if e.to_string().contains("ExpiredSignature") {
                AuthError::expired_token()
            } else {
                AuthError::invalid_token()
            }
        })?;

        Ok(token_data.claims)
    }

    /// Generate an opaque token for magic links, device refresh, or invitations
    pub fn generate_opaque_token(&self) -> String {
        crypto::generate_opaque_token()
    }

    /// Hash a device token using keyed HMAC-SHA256
    ///
    /// Only this hash is stored; the plaintext device token exists solely
    /// in the client's hands.
    pub fn hash_device_token(&self, token: &str) -> String {
        crypto::hmac_sha256_token(&self.device_token_secret, token)
    }

    /// Expiry timestamp for a fresh magic link (15 minutes from now)
    pub fn magic_link_expiration(&self) -> i64 {
        Utc::now().timestamp() + (self.magic_link_expiration_minutes * 60)
    }

    /// Expiry timestamp for a fresh or rotated device token (365 days from now)
    pub fn device_expiration(&self) -> i64 {
        Utc::now().timestamp() + (self.device_expiration_days * 24 * 60 * 60)
    }

    /// Session lifetime in seconds, for token responses
    pub fn session_lifetime_seconds(&self) -> i64 {
        self.jwt_expiration_minutes * 60
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("device_expiration_days", &self.device_expiration_days)
            .field("device_token_secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TokenService {{ jwt_expiration: {}min, device_expiration: {}days }}",
            self.jwt_expiration_minutes, self.device_expiration_days
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn test_service() -> TokenService {
        TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            "test-device-secret-minimum-32-chars".to_string(),
        )
    }

    #[test]
    fn test_generate_jwt_creates_valid_jwt() {
        let token_service = test_service();
        let user_id = Uuid::new_v4().to_string();

        let result = token_service.generate_jwt(&user_id);

        assert!(result.is_ok());
        let (token, _jti) = result.unwrap();

        // Verify token can be decoded
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false; // Don't validate expiration in this test

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret("test-secret-key-minimum-32-characters-long".as_bytes()),
            &validation,
        );

        assert!(decoded.is_ok());
    }

    #[test]
    fn test_jwt_contains_correct_user_id_and_jti() {
        let token_service = test_service();
        let user_id = Uuid::new_v4().to_string();

        let (token, jti) = token_service.generate_jwt(&user_id).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret("test-secret-key-minimum-32-characters-long".as_bytes()),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user_id);
        assert_eq!(decoded.claims.jti, jti);
    }

    #[test]
    fn test_validate_jwt_roundtrip() {
        let token_service = test_service();
        let user_id = Uuid::new_v4().to_string();

        let (token, jti) = token_service.generate_jwt(&user_id).unwrap();
        let claims = token_service.validate_jwt(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.jti, jti);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_validate_jwt_rejects_wrong_secret() {
        let token_service = test_service();
        let other_service = TokenService::new(
            "another-secret-key-minimum-32-characters".to_string(),
            "test-device-secret-minimum-32-chars".to_string(),
        );
        let user_id = Uuid::new_v4().to_string();

        let (token, _) = token_service.generate_jwt(&user_id).unwrap();
        let result = other_service.validate_jwt(&token);

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_validate_jwt_rejects_garbage() {
        let token_service = test_service();

        let result = token_service.validate_jwt("not-a-jwt");

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_device_token_hash_is_keyed() {
        let token_service = test_service();
        let other_service = TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            "a-different-device-secret-32-chars!!".to_string(),
        );

        let token = token_service.generate_opaque_token();

        assert_eq!(
            token_service.hash_device_token(&token),
            token_service.hash_device_token(&token)
        );
        assert_ne!(
            token_service.hash_device_token(&token),
            other_service.hash_device_token(&token)
        );
        // Plaintext never equals its hash
        assert_ne!(token_service.hash_device_token(&token), token);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token_service = test_service();

        let debug = format!("{:?}", token_service);

        assert!(!debug.contains("test-secret-key"));
        assert!(!debug.contains("test-device-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
