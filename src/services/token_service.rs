//! Access tokens and confirmation codes.
//!
//! # Access tokens
//!
//! Tokens are `<user_id>.<expires_unix>.<signature>`, where the signature is
//! the hex HMAC-SHA256 of `<user_id>.<expires_unix>` under `SECRET_KEY`.
//! The server keeps no token state; revoking access means deleting the user
//! or rotating the key.
//!
//! # Confirmation codes
//!
//! Codes are 32 random hex characters mailed to the user. Only their SHA-256
//! hash is stored.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Issue a signed access token for `user_id`, valid for `ttl_secs` from `now`.
pub fn issue_access_token(secret: &str, user_id: i64, ttl_secs: i64, now: DateTime<Utc>) -> String {
    let expires_at = now.timestamp().saturating_add(ttl_secs);
    let payload = format!("{user_id}.{expires_at}");
    let signature = hex::encode(sign(secret, &payload));
    format!("{payload}.{signature}")
}

/// Verify a token's signature and expiry, returning the user id it names.
///
/// # Errors
///
/// `InvalidToken` for malformed, forged or expired tokens.
pub fn verify_access_token(secret: &str, token: &str, now: DateTime<Utc>) -> Result<i64, AppError> {
    let (payload, signature) = token.rsplit_once('.').ok_or(AppError::InvalidToken)?;
    let (user_id, expires_at) = payload.split_once('.').ok_or(AppError::InvalidToken)?;

    let user_id: i64 = user_id.parse().map_err(|_| AppError::InvalidToken)?;
    let expires_at: i64 = expires_at.parse().map_err(|_| AppError::InvalidToken)?;
    let signature = hex::decode(signature).map_err(|_| AppError::InvalidToken)?;

    // Constant-time comparison
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidToken)?;

    if expires_at <= now.timestamp() {
        return Err(AppError::InvalidToken);
    }

    Ok(user_id)
}

fn sign(secret: &str, payload: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Generate a fresh confirmation code.
///
/// # Output
///
/// 32 hex characters (16 random bytes)
pub fn generate_confirmation_code() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hex digest of a confirmation code, as stored in `users`.
pub fn hash_confirmation_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a submitted code against the stored hash and issue time.
///
/// A user who never requested a code has nothing to match.
pub fn confirmation_code_matches(
    submitted: &str,
    stored_hash: Option<&str>,
    issued_at: Option<DateTime<Utc>>,
    ttl_secs: i64,
    now: DateTime<Utc>,
) -> bool {
    let (Some(stored_hash), Some(issued_at)) = (stored_hash, issued_at) else {
        return false;
    };
    if now.timestamp() > issued_at.timestamp().saturating_add(ttl_secs) {
        return false;
    }
    hash_confirmation_code(submitted) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issued_token_verifies() {
        let now = Utc::now();
        let token = issue_access_token(SECRET, 42, 3600, now);
        assert_eq!(verify_access_token(SECRET, &token, now).unwrap(), 42);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued = Utc::now();
        let token = issue_access_token(SECRET, 42, 60, issued);
        let later = issued + Duration::seconds(61);
        assert!(matches!(
            verify_access_token(SECRET, &token, later),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_user_id_rejected() {
        let now = Utc::now();
        let token = issue_access_token(SECRET, 42, 3600, now);
        let forged = token.replacen("42.", "1.", 1);
        assert!(verify_access_token(SECRET, &forged, now).is_err());
    }

    #[test]
    fn test_other_secret_rejected() {
        let now = Utc::now();
        let token = issue_access_token(SECRET, 42, 3600, now);
        assert!(verify_access_token("another-secret", &token, now).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let now = Utc::now();
        for token in ["", "abc", "1.2", "x.y.z", "1.2.nothex"] {
            assert!(verify_access_token(SECRET, token, now).is_err(), "{token}");
        }
    }

    #[test]
    fn test_confirmation_code_shape() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), 32);
        assert_ne!(code, generate_confirmation_code());
        assert_eq!(hash_confirmation_code(&code).len(), 64);
    }

    #[test]
    fn test_confirmation_code_matching() {
        let issued = Utc::now();
        let code = generate_confirmation_code();
        let hash = hash_confirmation_code(&code);

        assert!(confirmation_code_matches(&code, Some(&hash), Some(issued), 60, issued));
        assert!(!confirmation_code_matches("wrong", Some(&hash), Some(issued), 60, issued));
        assert!(!confirmation_code_matches(&code, None, None, 60, issued));

        let expired = issued + Duration::seconds(61);
        assert!(!confirmation_code_matches(&code, Some(&hash), Some(issued), 60, expired));
    }

    #[test]
    fn test_out_of_range_ttl_saturates() {
        let now = Utc::now();
        let token = issue_access_token(SECRET, 42, i64::MAX, now);
        assert_eq!(verify_access_token(SECRET, &token, now).unwrap(), 42);

        let code = generate_confirmation_code();
        let hash = hash_confirmation_code(&code);
        assert!(confirmation_code_matches(&code, Some(&hash), Some(now), i64::MAX, now));
        assert!(!confirmation_code_matches(&code, Some(&hash), Some(now), i64::MIN, now));
    }
}
