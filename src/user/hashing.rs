//! Salted password hashing.
//!
//! Passwords and security answers are stored as
//! PBKDF2-HMAC-SHA256(secret, salt, 100 000 iterations), hex encoded, with
//! a fresh 16-byte random salt per write.

use std::fmt::Write;

use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::Sha256;

use crate::Error;

/// The PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 100_000;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Generate a fresh random salt, hex encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);

    to_hex(&bytes)
}

/// Hash `secret` with `salt` and return the hex-encoded digest.
///
/// # Errors
/// Returns [Error::HashingError] if the underlying primitive rejects the
/// key material.
pub fn hash_secret(secret: &str, salt: &str) -> Result<String, Error> {
    let mut digest = [0u8; HASH_LENGTH];

    pbkdf2::<Hmac<Sha256>>(
        secret.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut digest,
    )
    .map_err(|error| Error::HashingError(error.to_string()))?;

    Ok(to_hex(&digest))
}

/// Hash `secret` with a fresh salt, returning `(hash, salt)`.
pub fn hash_with_new_salt(secret: &str) -> Result<(String, String), Error> {
    let salt = generate_salt();
    let hash = hash_secret(secret, &salt)?;

    Ok((hash, salt))
}

/// Whether `provided` hashes to `stored_hash` under `stored_salt`.
pub fn verify_secret(stored_hash: &str, stored_salt: &str, provided: &str) -> Result<bool, Error> {
    Ok(hash_secret(provided, stored_salt)? == stored_hash)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

#[cfg(test)]
mod hashing_tests {
    use super::{generate_salt, hash_secret, hash_with_new_salt, verify_secret};

    #[test]
    fn same_secret_and_salt_hash_identically() {
        let first = hash_secret("hunter2", "0123456789abcdef").unwrap();
        let second = hash_secret("hunter2", "0123456789abcdef").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn different_salts_give_different_hashes() {
        let first = hash_secret("hunter2", "0123456789abcdef").unwrap();
        let second = hash_secret("hunter2", "fedcba9876543210").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn verify_accepts_correct_secret() {
        let (hash, salt) = hash_with_new_salt("newpw123").unwrap();

        assert!(verify_secret(&hash, &salt, "newpw123").unwrap());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let (hash, salt) = hash_with_new_salt("newpw123").unwrap();

        assert!(!verify_secret(&hash, &salt, "wrongpw").unwrap());
    }

    #[test]
    fn salts_are_hex_and_unique() {
        let salt = generate_salt();

        assert_eq!(salt.len(), 32);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(salt, generate_salt());
    }
}
