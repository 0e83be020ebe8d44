use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::prelude::*;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 for opaque tokens and return as hexadecimal string
pub fn hmac_sha256_token(key: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(token.as_bytes());
    let result = mac.finalize();
    format!("{:x}", result.into_bytes())
}

/// Generate a cryptographically secure opaque token
///
/// 32 random bytes, URL-safe base64 without padding, so the token can be
/// embedded in links and QR codes as-is.
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let random_bytes: [u8; 32] = rng.random();
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Derive a stable identifier from a human-readable name path
///
/// Used for catalog rows so that re-running the seeder (including from
/// concurrent cold starts) always produces the same ids. The id is a
/// kind prefix plus the first 24 hex chars of SHA-256 over the path.
pub fn stable_id(kind: &str, path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}_{}", kind, &hex[..24])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_is_deterministic_per_key() {
        let a = hmac_sha256_token("key-1", "token");
        let b = hmac_sha256_token("key-1", "token");
        let c = hmac_sha256_token("key-2", "token");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_opaque_token_is_url_safe() {
        let token = generate_opaque_token();

        assert!(!token.is_empty());
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_opaque_token_uniqueness() {
        let token1 = generate_opaque_token();
        let token2 = generate_opaque_token();

        assert_ne!(token1, token2);
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        let a = stable_id("lim", "Communication/Messages/Surnoms");
        let b = stable_id("lim", "Communication/Messages/Surnoms");
        let c = stable_id("lim", "Communication/Messages/Autre");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("lim_"));
    }
}
