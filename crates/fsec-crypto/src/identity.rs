//! Ed25519 identity keys and identity ids.
//!
//! An [`Identity`] is a party's long-term signing key. Its exported form,
//! [`Identity::public`], is the DER-encoded SubjectPublicKeyInfo of the
//! verifying key; a peer turns those bytes back into a [`PeerIdentity`]
//! with [`import_peer_identity`].
//!
//! An **identity id** is the base64url-encoded raw public key (32 bytes → 43
//! characters). It is a short, printable handle for logs and UIs.
//!
//! # Example
//!
//! ```
//! use fsec_crypto::identity::{import_peer_identity, Identity};
//! use rand::rngs::OsRng;
//!
//! let identity = Identity::generate(&mut OsRng).unwrap();
//! let peer = import_peer_identity(identity.public()).unwrap();
//! assert_eq!(peer.id(), identity.id());
//!
//! let signature = identity.sign(b"challenge").unwrap();
//! assert!(peer.verify(b"challenge", &signature.to_bytes()).is_ok());
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::session::SessionKey;

/// Identity id: base64url-encoded Ed25519 public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityId(String);

impl IdentityId {
    /// Create an identity id from raw public key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parse an identity id from its string representation.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| Error::MalformedIdentity(format!("invalid base64url encoding: {e}")))?;

        if bytes.len() != 32 {
            return Err(Error::MalformedIdentity(format!(
                "invalid identity id length: expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self(s.to_string()))
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", self.0)
    }
}

/// Long-term Ed25519 identity.
///
/// The signing key is zeroized on drop and has no export path.
pub struct Identity {
    signing_key: SigningKey,
    /// SubjectPublicKeyInfo DER, encoded once at construction.
    public_der: Vec<u8>,
}

impl Identity {
    /// Generate a new identity from `rng`.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
        rng.try_fill_bytes(&mut seed[..])
            .map_err(Error::key_generation)?;

        let signing_key = SigningKey::from_bytes(&seed);
        let public_der = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| Error::KeyGeneration(format!("cannot encode public key: {e}")))?
            .as_bytes()
            .to_vec();

        let identity = Self {
            signing_key,
            public_der,
        };
        debug!(id = %identity.id(), "generated identity");
        Ok(identity)
    }

    /// Exported public identity (SubjectPublicKeyInfo DER).
    pub fn public(&self) -> &[u8] {
        &self.public_der
    }

    /// Get the identity id.
    pub fn id(&self) -> IdentityId {
        IdentityId::from_bytes(self.signing_key.verifying_key().as_bytes())
    }

    /// Get the public key as a verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a message with this identity.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        self.signing_key
            .try_sign(message)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    /// Start a new session with one peer.
    ///
    /// Generates a fresh agreement key pair and signs its public value.
    /// Send [`SessionKey::public`] to the peer, then pass the peer's export
    /// to [`SessionKey::peer_session_key`].
    pub fn new_session_key<R: RngCore + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<SessionKey> {
        SessionKey::new(self, rng)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("id", &self.id()).finish_non_exhaustive()
    }
}

/// A remote party's public identity.
#[derive(Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    verifying_key: VerifyingKey,
}

impl PeerIdentity {
    /// Decode an exported public identity.
    ///
    /// Fails if the bytes are not a SubjectPublicKeyInfo document for an
    /// Ed25519 key, or if the key is a small-order point.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_public_key_der(bytes)
            .map_err(|e| Error::MalformedIdentity(e.to_string()))?;

        if verifying_key.is_weak() {
            return Err(Error::MalformedIdentity("weak public key".into()));
        }

        Ok(Self { verifying_key })
    }

    /// Get the identity id.
    pub fn id(&self) -> IdentityId {
        IdentityId::from_bytes(self.verifying_key.as_bytes())
    }

    /// Get the verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Verify a signature made by this identity.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let sig = Signature::from_slice(signature).map_err(|_| Error::SignatureInvalid)?;
        self.verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| Error::SignatureInvalid)
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({})", self.id())
    }
}

/// Decode an exported public identity. See [`PeerIdentity::from_der`].
pub fn import_peer_identity(bytes: &[u8]) -> Result<PeerIdentity> {
    PeerIdentity::from_der(bytes)
}
