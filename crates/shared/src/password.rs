//! Password hashing with Argon2id.
//!
//! Stored hashes use the PHC string format, so the parameters travel with the
//! hash and verification never needs to know how a hash was produced.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Error type for password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Failed to verify password: {0}")]
    Verify(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// OWASP minimums for Argon2id: 19 MiB memory, 2 iterations, 1 lane.
const MEMORY_COST_KIB: u32 = 19_456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::Hash(format!("invalid Argon2 parameters: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a plaintext password and returns the PHC-formatted hash.
///
/// ```
/// use shared::password::hash_password;
///
/// let hash = hash_password("correct horse battery staple").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on a mismatch; errors are reserved for malformed hashes.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_parameters() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("repeat").unwrap();
        let second = hash_password("repeat").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_roundtrip() {
        let hash = hash_password("Tr0ub4dor&3").unwrap();
        assert!(verify_password("Tr0ub4dor&3", &hash).unwrap());
        assert!(!verify_password("tr0ub4dor&3", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let result = verify_password("anything", "plaintext-in-the-db");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_unicode_password() {
        let hash = hash_password("пароль-密码").unwrap();
        assert!(verify_password("пароль-密码", &hash).unwrap());
    }
}
