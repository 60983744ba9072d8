//! Forward-secure messaging between two long-term identities.
//!
//! This crate provides:
//! - Ed25519 identity keys and identity ids
//! - Signed X25519 session keys, one per peer
//! - Per-message encryption under a fresh ephemeral X25519 key pair
//! - Canonical wire records for both exchanged blobs
//!
//! # Design
//!
//! Each side creates a [`SessionKey`] from its [`Identity`] and sends the
//! signed export ([`SessionKey::public`]) to the peer, who validates it against
//! the sender's imported [`PeerIdentity`]. After that, every
//! [`SessionKey::encrypt`] mints a new agreement key pair, derives 64 bytes of
//! key material against the peer's session value, and seals the message with
//! ChaCha20 + HMAC-SHA256. The ephemeral private value is dropped (and wiped)
//! before `encrypt` returns.
//!
//! All randomness is injected by the caller. Transport is the caller's
//! concern: the crate only produces and consumes byte strings.
//!
//! ```
//! use fsec_crypto::{import_peer_identity, Identity};
//! use rand::rngs::OsRng;
//!
//! let alice = Identity::generate(&mut OsRng).unwrap();
//! let bob = Identity::generate(&mut OsRng).unwrap();
//!
//! let mut alice_session = alice.new_session_key(&mut OsRng).unwrap();
//! let mut bob_session = bob.new_session_key(&mut OsRng).unwrap();
//!
//! let bob_id = import_peer_identity(bob.public()).unwrap();
//! let alice_id = import_peer_identity(alice.public()).unwrap();
//! alice_session.peer_session_key(&bob_id, bob_session.public()).unwrap();
//! bob_session.peer_session_key(&alice_id, alice_session.public()).unwrap();
//!
//! let envelope = alice_session.encrypt(b"hello world", &mut OsRng).unwrap();
//! assert_eq!(bob_session.decrypt(&envelope).unwrap(), b"hello world");
//! ```

#![forbid(unsafe_code)]

pub mod agreement;
pub mod cipher;
pub mod error;
pub mod identity;
pub mod session;
pub mod wire;

pub use error::{Error, Result};
pub use identity::{import_peer_identity, Identity, IdentityId, PeerIdentity};
pub use session::{SessionKey, SessionState, MAX_MESSAGE_LEN, SHARED_KEY_LEN};
pub use wire::{EphemeralEnvelope, SignedAgreementExport};
