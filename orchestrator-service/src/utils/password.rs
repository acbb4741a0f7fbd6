//! Argon2id password hashing. The plaintext travels as a [`Secret`] so it
//! never lands in logs or debug output.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, Secret};

pub fn hash_password(password: &Secret<String>) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Returns `Ok(true)` on a match, `Ok(false)` on a mismatch. An error means
/// the stored hash itself does not parse.
pub fn verify_password(password: &Secret<String>, stored: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    match Argon2::default().verify_password(password.expose_secret().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = Secret::new("correct horse battery staple".to_string());
        let hash = hash_password(&password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&password, &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_a_clean_mismatch() {
        let password = Secret::new("right".to_string());
        let hash = hash_password(&password).unwrap();

        let wrong = Secret::new("wrong".to_string());
        assert!(!verify_password(&wrong, &hash).unwrap());
    }

    #[test]
    fn salted_hashes_differ() {
        let password = Secret::new("same input".to_string());
        let first = hash_password(&password).unwrap();
        let second = hash_password(&password).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        let password = Secret::new("anything".to_string());
        assert!(verify_password(&password, "not-a-phc-string").is_err());
    }
}
