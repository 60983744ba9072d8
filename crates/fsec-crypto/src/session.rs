//! Per-peer session keys and per-message encryption.
//!
//! A [`SessionKey`] holds one X25519 key pair for the lifetime of a session
//! with a single peer. Its public value travels to the peer signed by the
//! owning [`Identity`]; the peer's signed value comes back through
//! [`SessionKey::peer_session_key`].
//!
//! # Message Flow
//!
//! ```text
//! Sender                                     Recipient
//!   e  = fresh X25519 key pair
//!   k  = HKDF(X25519(e, S_peer))             S = session key pair
//!   ct = cipher(k[..32], k[32..], m)
//!   [ e.pub | ct ] ------------------------>
//!                                            k = HKDF(X25519(S, e.pub))
//!                                            m = cipher⁻¹(k[..32], k[32..], ct)
//! ```
//!
//! The sender's ephemeral private value never outlives `encrypt`, so
//! recovering a session key later exposes only messages sent *to* it, and
//! nothing sent under any other session.

use rand::{CryptoRng, RngCore};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::agreement::{AgreementPublic, AgreementSecret, PUBLIC_KEY_LEN};
use crate::cipher::{self, CONF_KEY_LEN, MAC_KEY_LEN, OVERHEAD};
use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityId, PeerIdentity};
use crate::wire::{self, EphemeralEnvelope, SignedAgreementExport};

/// Length of the shared secret derived for each message: a confidentiality
/// segment followed by an integrity segment.
pub const SHARED_KEY_LEN: usize = CONF_KEY_LEN + MAC_KEY_LEN;

/// Largest message [`SessionKey::encrypt`] accepts. The encoded envelope
/// adds two length prefixes, the ephemeral public value and the cipher
/// overhead, and must stay within [`wire::MAX_RECORD_LEN`].
pub const MAX_MESSAGE_LEN: usize =
    wire::MAX_RECORD_LEN as usize - 2 * 8 - PUBLIC_KEY_LEN - OVERHEAD;

/// Handshake progress of a [`SessionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the peer's signed session key.
    Unbound,
    /// Peer's session key validated; encryption is available.
    Bound {
        /// Peer's static agreement value.
        peer: AgreementPublic,
        /// Identity that signed it.
        peer_id: IdentityId,
    },
}

/// Session key pair bound to at most one peer.
pub struct SessionKey {
    key: AgreementSecret,
    /// Encoded [`SignedAgreementExport`] for `key`.
    signed_export: Vec<u8>,
    state: SessionState,
}

impl SessionKey {
    pub(crate) fn new<R: RngCore + CryptoRng + ?Sized>(
        identity: &Identity,
        rng: &mut R,
    ) -> Result<Self> {
        let key = AgreementSecret::generate(rng)?;

        let public = key.public().to_bytes().to_vec();
        let signature = identity.sign(&public)?.to_bytes().to_vec();
        let signed_export = wire::encode(&SignedAgreementExport { public, signature })?;

        trace!(id = %identity.id(), "created session key");
        Ok(Self {
            key,
            signed_export,
            state: SessionState::Unbound,
        })
    }

    /// Encoded signed export to send to the peer.
    pub fn public(&self) -> &[u8] {
        &self.signed_export
    }

    /// This session's own agreement public value.
    pub fn agreement_public(&self) -> &AgreementPublic {
        self.key.public()
    }

    /// Current handshake state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Check if the peer's session key has been validated.
    pub fn is_established(&self) -> bool {
        matches!(self.state, SessionState::Bound { .. })
    }

    /// The peer's validated agreement value, once established.
    pub fn peer_public(&self) -> Option<&AgreementPublic> {
        match &self.state {
            SessionState::Bound { peer, .. } => Some(peer),
            SessionState::Unbound => None,
        }
    }

    /// Validate the peer's signed session key and bind this session to it.
    ///
    /// The signature is checked against `peer` before the enclosed value is
    /// even parsed. On any failure the session stays unbound. A session can
    /// be bound once; later calls return [`Error::AlreadyEstablished`].
    pub fn peer_session_key(&mut self, peer: &PeerIdentity, export: &[u8]) -> Result<()> {
        if self.is_established() {
            return Err(Error::AlreadyEstablished);
        }

        let record: SignedAgreementExport = wire::decode(export)?;

        if let Err(e) = peer.verify(&record.public, &record.signature) {
            warn!(peer = %peer.id(), "peer session key rejected: bad signature");
            return Err(e);
        }

        let public = AgreementPublic::import(&record.public)?;

        debug!(peer = %peer.id(), "session bound");
        self.state = SessionState::Bound {
            peer: public,
            peer_id: peer.id(),
        };
        Ok(())
    }

    /// Encrypt `message` to the peer under a fresh ephemeral key pair.
    ///
    /// Returns an encoded [`EphemeralEnvelope`]. Messages longer than
    /// [`MAX_MESSAGE_LEN`] are rejected with [`Error::Encryption`].
    pub fn encrypt<R: RngCore + CryptoRng + ?Sized>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let peer = self.bound_peer()?;
        if message.len() > MAX_MESSAGE_LEN {
            return Err(Error::Encryption(format!(
                "message of {} bytes exceeds the {MAX_MESSAGE_LEN} byte limit",
                message.len()
            )));
        }

        let ephemeral = AgreementSecret::generate(rng)?;
        let shared = ephemeral.shared_key(peer, SHARED_KEY_LEN)?;
        let (conf_key, mac_key) = shared.split_at(CONF_KEY_LEN);

        let ciphertext = cipher::encrypt(conf_key, mac_key, message, rng)?;
        let envelope = EphemeralEnvelope {
            public: ephemeral.public().to_bytes().to_vec(),
            ciphertext,
        };

        trace!(len = message.len(), "encrypted message");
        wire::encode(&envelope)
    }

    /// Decrypt an envelope produced by the peer's [`SessionKey::encrypt`].
    ///
    /// Any tampering with the embedded public value or the ciphertext is
    /// rejected; no partial plaintext is ever returned.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        self.bound_peer()?;

        let record: EphemeralEnvelope = wire::decode(envelope)?;
        let ephemeral = AgreementPublic::import(&record.public)?;

        let shared = self.key.shared_key(&ephemeral, SHARED_KEY_LEN)?;
        let (conf_key, mac_key) = shared.split_at(CONF_KEY_LEN);

        cipher::decrypt(conf_key, mac_key, &record.ciphertext).inspect_err(|e| {
            debug!(error = %e, "decrypt failed");
        })
    }

    fn bound_peer(&self) -> Result<&AgreementPublic> {
        self.peer_public().ok_or(Error::NotEstablished)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("public", self.key.public())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
