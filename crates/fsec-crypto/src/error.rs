//! Error type for the forward-secrecy core.

use thiserror::Error;

/// Result type alias using the core's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by identity and session operations.
///
/// Variants that wrap a `String` carry the collaborator's own description.
/// No variant ever carries key material.
#[derive(Debug, Error)]
pub enum Error {
    /// The randomness source or key constructor failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// An exported identity could not be decoded as an Ed25519 public key.
    #[error("malformed identity: {0}")]
    MalformedIdentity(String),

    /// Signing with the long-term identity key failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A record could not be encoded for the wire.
    #[error("encoding failed: {0}")]
    Encode(String),

    /// Externally supplied bytes are not a well-formed record.
    #[error("malformed record: {0}")]
    Decode(String),

    /// The signature on a peer's session key does not verify.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// A signed or embedded agreement value is not a usable X25519 public key.
    #[error("invalid agreement public value: {0}")]
    KeyImport(String),

    /// Deriving the shared secret failed.
    #[error("key agreement failed: {0}")]
    KeyAgreement(String),

    /// The message cipher could not produce a ciphertext.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The ciphertext's integrity tag did not verify.
    #[error("message authentication failed")]
    AuthenticationFailed,

    /// The peer's session key has not been validated yet.
    #[error("session not established")]
    NotEstablished,

    /// The peer's session key was already validated for this session.
    #[error("session already established")]
    AlreadyEstablished,
}

impl Error {
    /// Create a decode error from any displayable type.
    pub fn decode(msg: impl std::fmt::Display) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Create a key import error from any displayable type.
    pub fn key_import(msg: impl std::fmt::Display) -> Self {
        Self::KeyImport(msg.to_string())
    }

    /// Create a key generation error from any displayable type.
    pub fn key_generation(msg: impl std::fmt::Display) -> Self {
        Self::KeyGeneration(msg.to_string())
    }
}
