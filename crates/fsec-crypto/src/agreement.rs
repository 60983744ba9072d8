//! X25519 key agreement.
//!
//! Session keys and per-message ephemeral keys are both [`AgreementSecret`]s.
//! The raw X25519 output is never used directly: [`AgreementSecret::shared_key`]
//! expands it with HKDF-SHA256, binding both public values into the info
//! string so that the derived keys depend on every transmitted public byte.

use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Length of an exported agreement public value.
pub const PUBLIC_KEY_LEN: usize = 32;

const SHARED_KEY_INFO: &[u8] = b"fsec-v1 shared key";

/// Fixed clamped scalar used to detect low-order public values on import.
/// A clamped scalar clears the cofactor, so the product is zero exactly
/// when the point lies in the small-order subgroup.
const PROBE_SCALAR: [u8; 32] = [0x42; 32];

/// Private agreement value plus its public half.
///
/// The scalar is zeroized when this value is dropped.
pub struct AgreementSecret {
    secret: StaticSecret,
    public: AgreementPublic,
}

impl AgreementSecret {
    /// Generate a fresh agreement key pair from `rng`.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.try_fill_bytes(&mut seed[..])
            .map_err(Error::key_generation)?;

        let secret = StaticSecret::from(*seed);
        let public = AgreementPublic(PublicKey::from(&secret));
        Ok(Self { secret, public })
    }

    /// The public half of this key pair.
    pub fn public(&self) -> &AgreementPublic {
        &self.public
    }

    /// Derive `len` bytes of shared key material with `peer`.
    ///
    /// Deterministic for a given pair of values, and symmetric: both sides of
    /// an exchange derive the same bytes.
    pub fn shared_key(&self, peer: &AgreementPublic, len: usize) -> Result<Zeroizing<Vec<u8>>> {
        let shared = self.secret.diffie_hellman(&peer.0);
        if !shared.was_contributory() {
            return Err(Error::KeyAgreement("peer value is in the small-order subgroup".into()));
        }

        let (lo, hi) = ordered(self.public.as_bytes(), peer.as_bytes());
        let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());

        let mut okm = Zeroizing::new(vec![0u8; len]);
        hk.expand_multi_info(&[SHARED_KEY_INFO, lo, hi], &mut okm[..])
            .map_err(|_| Error::KeyAgreement(format!("cannot expand to {len} bytes")))?;
        Ok(okm)
    }
}

/// An imported or locally derived X25519 public value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AgreementPublic(PublicKey);

impl AgreementPublic {
    /// Import a public value received from a peer.
    ///
    /// Rejects values of the wrong length and points in the small-order
    /// subgroup, which would yield a predictable shared secret.
    pub fn import(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::key_import(format!(
                "expected {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        let public = PublicKey::from(bytes);
        let probe = StaticSecret::from(PROBE_SCALAR);
        if !probe.diffie_hellman(&public).was_contributory() {
            return Err(Error::key_import("small-order point"));
        }

        Ok(Self(public))
    }

    /// Raw 32-byte encoding.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.0.as_bytes()
    }

    /// Owned copy of the raw encoding.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }
}

fn ordered<'a>(a: &'a [u8], b: &'a [u8]) -> (&'a [u8], &'a [u8]) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_shared_key_is_symmetric() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let alice = AgreementSecret::generate(&mut rng).unwrap();
        let bob = AgreementSecret::generate(&mut rng).unwrap();

        let ab = alice.shared_key(bob.public(), 64).unwrap();
        let ba = bob.shared_key(alice.public(), 64).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab.len(), 64);
    }

    #[test]
    fn test_shared_key_depends_on_peer() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let alice = AgreementSecret::generate(&mut rng).unwrap();
        let bob = AgreementSecret::generate(&mut rng).unwrap();
        let carol = AgreementSecret::generate(&mut rng).unwrap();

        let ab = alice.shared_key(bob.public(), 64).unwrap();
        let ac = alice.shared_key(carol.public(), 64).unwrap();
        assert_ne!(*ab, *ac);
    }

    #[test]
    fn test_import_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let key = AgreementSecret::generate(&mut rng).unwrap();
        let imported = AgreementPublic::import(key.public().as_bytes()).unwrap();
        assert_eq!(&imported, key.public());
    }

    #[test]
    fn test_import_rejects_wrong_length() {
        assert!(matches!(
            AgreementPublic::import(&[1u8; 31]),
            Err(Error::KeyImport(_))
        ));
        assert!(matches!(
            AgreementPublic::import(&[1u8; 33]),
            Err(Error::KeyImport(_))
        ));
        assert!(matches!(AgreementPublic::import(&[]), Err(Error::KeyImport(_))));
    }

    #[test]
    fn test_import_rejects_small_order_points() {
        // u = 0 has order 2 and u = 1 has order 4 on Curve25519.
        let zero = [0u8; 32];
        let mut one = [0u8; 32];
        one[0] = 1;

        assert!(matches!(AgreementPublic::import(&zero), Err(Error::KeyImport(_))));
        assert!(matches!(AgreementPublic::import(&one), Err(Error::KeyImport(_))));
    }

    #[test]
    fn test_expand_limit() {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let alice = AgreementSecret::generate(&mut rng).unwrap();
        let bob = AgreementSecret::generate(&mut rng).unwrap();

        // HKDF-SHA256 can produce at most 255 * 32 bytes.
        let result = alice.shared_key(bob.public(), 255 * 32 + 1);
        assert!(matches!(result, Err(Error::KeyAgreement(_))));
    }
}
