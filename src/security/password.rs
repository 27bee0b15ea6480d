//! Password hashing and verification utilities.
//!
//! Centralizes Argon2 handling for registered and pre-provisioned accounts.

use crate::config::HashCost;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Verify a password against a stored Argon2 PHC string.
///
/// Verification uses the parameters embedded in the hash.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, argon2::password_hash::Error> {
    let hash = PasswordHash::new(phc)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok())
}

/// Hash a password with the configured cost.
pub fn hash_password_with(
    password: &str,
    cost: HashCost,
) -> Result<String, argon2::password_hash::Error> {
    let params = Params::new(cost.memory_kib, cost.iterations, 1, None)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Whether a configured password is already an Argon2 PHC string.
pub fn is_phc(password: &str) -> bool {
    password.starts_with("$argon2")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: HashCost = HashCost {
        memory_kib: 64,
        iterations: 1,
    };

    #[test]
    fn hash_then_verify() {
        let phc = hash_password_with("hunter2", CHEAP).unwrap();
        assert!(is_phc(&phc));
        assert!(verify_password("hunter2", &phc).unwrap());
        assert!(!verify_password("hunter3", &phc).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
