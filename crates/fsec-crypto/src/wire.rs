//! Wire records exchanged between peers.
//!
//! Both records use one bincode configuration: little-endian fixed-width
//! length prefixes, no trailing bytes, and a total size limit. The encoding
//! is canonical, so decoding and re-encoding reproduces the input exactly.
//!
//! ```text
//! SignedAgreementExport: [u64 len] [public] [u64 len] [signature]
//! EphemeralEnvelope:     [u64 len] [public] [u64 len] [ciphertext]
//! ```

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest record accepted or produced, in bytes.
pub const MAX_RECORD_LEN: u64 = 16 * 1024 * 1024;

/// Offset of the public value inside either encoded record.
pub const PUBLIC_OFFSET: usize = 8;

/// A session's agreement public value, signed by its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAgreementExport {
    /// Raw X25519 public value.
    pub public: Vec<u8>,
    /// Ed25519 signature over `public`.
    pub signature: Vec<u8>,
}

/// One encrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralEnvelope {
    /// Single-use X25519 public value minted for this message.
    pub public: Vec<u8>,
    /// Cipher output under keys derived from `public`.
    pub ciphertext: Vec<u8>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
        .with_limit(MAX_RECORD_LEN)
}

/// Encode a record.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    options()
        .serialize(record)
        .map_err(|e| Error::Encode(e.to_string()))
}

/// Decode a record, rejecting truncated, oversized, or padded input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options().deserialize(bytes).map_err(Error::decode)
}
