//! Credential hashing and verification using Argon2
//!
//! Uses the argon2id variant with the crate's default parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::GatehouseError;

/// Hash a raw credential using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, GatehouseError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatehouseError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a raw credential against a stored hash
///
/// Returns `Ok(false)` on mismatch; an unparseable stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, GatehouseError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| GatehouseError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
