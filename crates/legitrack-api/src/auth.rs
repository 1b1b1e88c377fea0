//! Password hashing and bearer tokens.
//!
//! Passwords are stored as Argon2 PHC strings. Tokens are 32 random bytes,
//! hex encoded; only their SHA-256 digest is stored.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng, rand_core::RngCore},
};
use axum::http::HeaderMap;
use chrono::{NaiveDateTime, Utc};
use legitrack_store::lock;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::AppState;

/// Current time as stored in token rows.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Resolve the bearer token of a request to its user id.
pub fn auth_user_id(state: &AppState, headers: &HeaderMap) -> Result<i64, ApiError> {
    let token = bearer_token(headers)?;
    lock(&state.store)?
        .user_for_token(&hash_token(&token), now())?
        .ok_or_else(|| ApiError::unauthorized("invalid token"))
}

pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let token = value.strip_prefix("Bearer ").unwrap_or("").trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }
    Ok(token.to_string())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("password hash error: {e}")))?
        .to_string();
    Ok(hash)
}

/// `false` for a wrong password and for an unreadable stored hash alike.
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    #[test]
    fn password_round_trip() {
        let hash = hash_password("s3nha-forte").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "s3nha-forte"));
        assert!(!verify_password(&hash, "senha-fraca"));
        assert!(!verify_password("not a phc string", "s3nha-forte"));
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  tok123 "));
        assert_eq!(bearer_token(&headers).unwrap(), "tok123");
    }
}
