//! PBKDF2-HMAC-SHA256 password hashing through the `password-hash` API.
//!
//! Hashes are PHC strings (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`),
//! so the round count travels with each hash and can be raised without
//! invalidating old ones.

use pbkdf2::Pbkdf2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::rngs::OsRng;
use thiserror::Error;

use stockroom_core::{DomainError, DomainResult};

pub const DEFAULT_ROUNDS: u32 = 100_000;
pub const MIN_PASSWORD_LEN: usize = 8;

const OUTPUT_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("stored password hash is malformed")]
    MalformedHash,

    #[error("round count must be positive")]
    InvalidRounds,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub fn check_password_strength(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str, rounds: u32) -> Result<String, PasswordError> {
    if rounds == 0 {
        return Err(PasswordError::InvalidRounds);
    }
    let salt = SaltString::generate(&mut OsRng);
    let params = pbkdf2::Params {
        rounds,
        output_length: OUTPUT_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| PasswordError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|_| PasswordError::MalformedHash)?;
    match Pbkdf2.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PasswordError::MalformedHash),
    }
}

/// Spend the same work as a real verification, for logins naming an unknown
/// account.
pub fn burn_verification(password: &str, rounds: u32) {
    let _ = hash_password(password, rounds.max(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("correct horse", FAST).unwrap();
        assert!(stored.starts_with("$pbkdf2-sha256$i=1000,l=32$"), "{stored}");
        assert!(verify_password("correct horse", &stored).unwrap());
        assert!(!verify_password("wrong horse", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same password", FAST).unwrap();
        let b = hash_password("same password", FAST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_rounds_are_rejected() {
        assert_eq!(hash_password("pw", 0), Err(PasswordError::InvalidRounds));
    }

    #[test]
    fn malformed_hashes_are_errors() {
        for stored in [
            "",
            "pbkdf2$1000$aa$bb",
            "$pbkdf2-sha256$i=x,l=32$c2FsdHNhbHQ$aGFzaA",
        ] {
            assert!(verify_password("pw", stored).is_err(), "{stored}");
        }
    }

    #[test]
    fn short_passwords_are_weak() {
        assert!(check_password_strength("1234567").is_err());
        assert!(check_password_strength("12345678").is_ok());
    }
}
