//! Salted password hashing.
//!
//! PBKDF2 keyed by the password (HMAC-SHA1) iterated over a 128-bit salt. The
//! parameters are fixed so that `derive(p, s)` is reproducible, which is what
//! lets [`CredentialHasher::verify`] work by comparing derived and stored hashes.

use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;

use super::error::AuthError;

pub const SALT_LEN: usize = 16;
pub const HASH_LEN: usize = 32;
pub const ITERATIONS: u32 = 10_000;

/// Base64 hash and salt, in the shape they are stored on a credential record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedCredential {
    pub hash: String,
    pub salt: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialHasher;

impl CredentialHasher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derive a hash for `password`, drawing a fresh salt when none is supplied.
    ///
    /// # Errors
    /// Returns `AuthError::Entropy` if the OS random source fails.
    pub fn derive(
        &self,
        password: &str,
        salt: Option<[u8; SALT_LEN]>,
    ) -> Result<DerivedCredential, AuthError> {
        let salt = match salt {
            Some(salt) => salt,
            None => generate_salt()?,
        };
        Ok(DerivedCredential {
            hash: derive_key(password, &salt),
            salt: Base64::encode_string(&salt),
        })
    }

    /// Derive a hash using a salt as stored (base64).
    ///
    /// # Errors
    /// Returns `AuthError::MalformedInput` if the salt is not base64 of 16 bytes.
    pub fn derive_with_salt(
        &self,
        password: &str,
        stored_salt: &str,
    ) -> Result<DerivedCredential, AuthError> {
        let salt = decode_salt(stored_salt)?;
        self.derive(password, Some(salt))
    }

    /// Check `password` against a stored hash and salt.
    ///
    /// # Errors
    /// Returns `AuthError::MalformedInput` if the stored salt cannot be decoded.
    pub fn verify(
        &self,
        password: &str,
        stored_hash: &str,
        stored_salt: &str,
    ) -> Result<bool, AuthError> {
        let derived = self.derive_with_salt(password, stored_salt)?;
        Ok(derived.hash == stored_hash)
    }
}

/// Draw a new 128-bit salt from the OS random source.
///
/// # Errors
/// Returns `AuthError::Entropy` if the OS random source fails.
pub fn generate_salt() -> Result<[u8; SALT_LEN], AuthError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}

fn decode_salt(stored_salt: &str) -> Result<[u8; SALT_LEN], AuthError> {
    let bytes = Base64::decode_vec(stored_salt)
        .map_err(|err| AuthError::MalformedInput(format!("salt is not valid base64: {err}")))?;
    <[u8; SALT_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        AuthError::MalformedInput(format!(
            "salt must decode to {SALT_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> String {
    let mut key = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, ITERATIONS, &mut key);
    Base64::encode_string(&key)
}
