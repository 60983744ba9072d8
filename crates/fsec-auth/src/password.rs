//! Salted password keys (PBKDF2-HMAC-SHA256).
//!
//! Store a [`PasswordKey`], never the password. [`match_password`] re-derives
//! the key under the stored salt and compares in constant time.

use fsec_common::constant_time_eq;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AuthError;

/// Key derivation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordParams {
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// Derived key length in bytes.
    pub key_len: usize,
    /// Random salt length in bytes.
    pub salt_len: usize,
}

impl PasswordParams {
    pub const DEFAULT_ITERATIONS: u32 = 16384;
    pub const DEFAULT_KEY_LEN: usize = 32;
    pub const DEFAULT_SALT_LEN: usize = 128;

    fn validate(&self) -> Result<(), AuthError> {
        if self.iterations == 0 {
            return Err(AuthError::InvalidParams("iterations must be at least 1".into()));
        }
        if self.key_len == 0 {
            return Err(AuthError::InvalidParams("key_len must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            key_len: Self::DEFAULT_KEY_LEN,
            salt_len: Self::DEFAULT_SALT_LEN,
        }
    }
}

/// A derived password key and the salt it was derived under.
///
/// Text form is `salt_hex:key_hex`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PasswordKey {
    pub salt: Vec<u8>,
    pub key: Vec<u8>,
}

impl fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordKey")
            .field("salt", &hex::encode(&self.salt))
            .field("key", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for PasswordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(&self.salt), hex::encode(&self.key))
    }
}

impl FromStr for PasswordKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (salt, key) = s
            .split_once(':')
            .ok_or_else(|| AuthError::MalformedKey("expected salt_hex:key_hex".into()))?;

        let salt = hex::decode(salt).map_err(|e| AuthError::MalformedKey(format!("salt: {e}")))?;
        let key = hex::decode(key).map_err(|e| AuthError::MalformedKey(format!("key: {e}")))?;
        if key.is_empty() {
            return Err(AuthError::MalformedKey("empty key".into()));
        }

        Ok(Self { salt, key })
    }
}

/// Derive a key for `password` under a fresh random salt.
pub fn derive_key<R: RngCore + CryptoRng + ?Sized>(
    password: &str,
    params: &PasswordParams,
    rng: &mut R,
) -> Result<PasswordKey, AuthError> {
    if params.salt_len == 0 {
        return Err(AuthError::InvalidParams("salt_len must be at least 1".into()));
    }

    let mut salt = vec![0u8; params.salt_len];
    rng.try_fill_bytes(&mut salt)
        .map_err(|e| AuthError::Rng(e.to_string()))?;

    derive_key_with_salt(password, &salt, params)
}

/// Derive a key for `password` under `salt`.
pub fn derive_key_with_salt(
    password: &str,
    salt: &[u8],
    params: &PasswordParams,
) -> Result<PasswordKey, AuthError> {
    params.validate()?;

    let mut key = vec![0u8; params.key_len];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, params.iterations, &mut key);

    Ok(PasswordKey {
        salt: salt.to_vec(),
        key,
    })
}

/// Check `password` against a stored key.
///
/// Keys of a different length than `params.key_len` never match.
pub fn match_password(password: &str, stored: &PasswordKey, params: &PasswordParams) -> bool {
    match derive_key_with_salt(password, &stored.salt, params) {
        Ok(candidate) => constant_time_eq(&candidate.key, &stored.key),
        Err(_) => false,
    }
}
