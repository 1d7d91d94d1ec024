//! One-way password hashing with Argon2id.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};

/// Hash a plaintext password into a PHC string.
///
/// A fresh random salt is generated per call, so hashing the same
/// plaintext twice yields different digests. The PHC string embeds the
/// algorithm, parameters, and salt needed to verify later.
///
/// # Errors
/// Returns an error if the hasher rejects the input.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// Verify a plaintext password against a stored PHC digest.
///
/// Malformed digests verify as `false`, never as an error.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    PasswordHash::new(digest).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted() {
        let first = hash("Secret123").unwrap();
        let second = hash("Secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let digest = hash("Secret123").unwrap();
        assert!(!digest.contains("Secret123"));
        assert!(digest.starts_with("$argon2"));
    }

    #[test]
    fn verify_round_trip() {
        let digest = hash("Secret123").unwrap();
        assert!(verify("Secret123", &digest));
        assert!(!verify("Other456", &digest));
    }

    #[test]
    fn verify_malformed_digest_is_false() {
        assert!(!verify("Secret123", ""));
        assert!(!verify("Secret123", "not-a-phc-string"));
        assert!(!verify("Secret123", "$argon2id$garbage"));
    }
}
