//! Encrypt-then-MAC message cipher.
//!
//! ChaCha20 under the confidentiality key, then HMAC-SHA256 under the
//! integrity key over everything that precedes the tag.
//!
//! # Wire Format
//!
//! ```text
//! [12 bytes: nonce] [N bytes: body] [32 bytes: HMAC-SHA256(nonce || body)]
//! ```
//!
//! Decryption verifies the tag before any keystream is applied, so a
//! tampered ciphertext never yields partial plaintext.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use crate::error::{Error, Result};

/// Confidentiality key length (ChaCha20).
pub const CONF_KEY_LEN: usize = 32;

/// Integrity key length (HMAC-SHA256).
pub const MAC_KEY_LEN: usize = 32;

/// Random nonce carried at the front of each ciphertext.
pub const NONCE_LEN: usize = 12;

/// HMAC-SHA256 tag carried at the end of each ciphertext.
pub const TAG_LEN: usize = 32;

/// Bytes added to every plaintext.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Encrypt `plaintext` under `conf_key` and authenticate it under `mac_key`.
pub fn encrypt<R: RngCore + CryptoRng + ?Sized>(
    conf_key: &[u8],
    mac_key: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|e| Error::Encryption(format!("nonce generation: {e}")))?;

    let mut stream = ChaCha20::new_from_slices(conf_key, &nonce)
        .map_err(|_| Error::Encryption("invalid confidentiality key length".into()))?;
    let mut mac = new_mac(mac_key).map_err(Error::Encryption)?;

    let mut out = Vec::with_capacity(OVERHEAD + plaintext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(plaintext);
    stream.apply_keystream(&mut out[NONCE_LEN..]);

    mac.update(&out);
    let tag = mac.finalize().into_bytes();
    out.extend_from_slice(&tag);

    Ok(out)
}

/// Verify and decrypt a ciphertext produced by [`encrypt`].
pub fn decrypt(conf_key: &[u8], mac_key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < OVERHEAD {
        return Err(Error::AuthenticationFailed);
    }

    let (authenticated, tag) = ciphertext.split_at(ciphertext.len() - TAG_LEN);
    let mut mac = new_mac(mac_key).map_err(Error::Encryption)?;
    mac.update(authenticated);
    mac.verify_slice(tag)
        .map_err(|_| Error::AuthenticationFailed)?;

    let (nonce, body) = authenticated.split_at(NONCE_LEN);
    let mut stream = ChaCha20::new_from_slices(conf_key, nonce)
        .map_err(|_| Error::Encryption("invalid confidentiality key length".into()))?;

    let mut plaintext = body.to_vec();
    stream.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

fn new_mac(mac_key: &[u8]) -> std::result::Result<HmacSha256, String> {
    if mac_key.len() != MAC_KEY_LEN {
        return Err(format!(
            "invalid integrity key length: expected {MAC_KEY_LEN}, got {}",
            mac_key.len()
        ));
    }
    HmacSha256::new_from_slice(mac_key).map_err(|e| e.to_string())
}
