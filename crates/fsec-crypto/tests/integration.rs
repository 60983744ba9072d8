//! End-to-end handshake and messaging between two identities.

use proptest::prelude::*;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::thread;

use fsec_crypto::wire::{self, EphemeralEnvelope, PUBLIC_OFFSET};
use fsec_crypto::{import_peer_identity, Error, Identity, SessionKey};

/// Run the full two-sided handshake and return both bound sessions.
fn establish(rng: &mut ChaCha20Rng) -> (Identity, SessionKey, Identity, SessionKey) {
    let ia = Identity::generate(rng).unwrap();
    let ib = Identity::generate(rng).unwrap();

    let mut sa = ia.new_session_key(rng).unwrap();
    let mut sb = ib.new_session_key(rng).unwrap();

    // Only the exported blobs cross between the two sides.
    let ia_public = ia.public().to_vec();
    let ib_public = ib.public().to_vec();
    let sa_public = sa.public().to_vec();
    let sb_public = sb.public().to_vec();

    sa.peer_session_key(&import_peer_identity(&ib_public).unwrap(), &sb_public)
        .unwrap();
    sb.peer_session_key(&import_peer_identity(&ia_public).unwrap(), &sa_public)
        .unwrap();

    (ia, sa, ib, sb)
}

/// Identity A sends "hello world" to identity B over a fresh session.
#[test]
fn test_hello_world_scenario() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let (_ia, sa, _ib, sb) = establish(&mut rng);

    let envelope = sa.encrypt(b"hello world", &mut rng).unwrap();
    assert_eq!(sb.decrypt(&envelope).unwrap(), b"hello world");
}

/// Works the same with the operating system's randomness.
#[test]
fn test_scenario_with_os_rng() {
    let ia = Identity::generate(&mut OsRng).unwrap();
    let ib = Identity::generate(&mut OsRng).unwrap();
    let mut sa = ia.new_session_key(&mut OsRng).unwrap();
    let mut sb = ib.new_session_key(&mut OsRng).unwrap();

    sa.peer_session_key(&import_peer_identity(ib.public()).unwrap(), sb.public())
        .unwrap();
    sb.peer_session_key(&import_peer_identity(ia.public()).unwrap(), sa.public())
        .unwrap();

    let envelope = sb.encrypt(b"reply", &mut OsRng).unwrap();
    assert_eq!(sa.decrypt(&envelope).unwrap(), b"reply");
}

/// A corrupted public identity never yields a working peer binding.
#[test]
fn test_corrupted_identity_never_binds() {
    let mut rng = ChaCha20Rng::seed_from_u64(99);
    let ia = Identity::generate(&mut rng).unwrap();
    let ib = Identity::generate(&mut rng).unwrap();
    let sb = ib.new_session_key(&mut rng).unwrap();

    let exported = ib.public().to_vec();
    for i in 0..exported.len() {
        for mask in [0x01u8, 0x80, 0xff] {
            let mut corrupted = exported.clone();
            corrupted[i] ^= mask;

            let Ok(peer) = import_peer_identity(&corrupted) else {
                continue;
            };
            assert_ne!(peer.id(), ib.id(), "byte {i} mask {mask:#x} kept the identity");

            let mut sa = ia.new_session_key(&mut rng).unwrap();
            let result = sa.peer_session_key(&peer, sb.public());
            assert!(
                matches!(result, Err(Error::SignatureInvalid)),
                "byte {i} mask {mask:#x} bound to a different identity"
            );
        }
    }
}

/// Many messages each way, interleaved.
#[test]
fn test_conversation() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let (_ia, sa, _ib, sb) = establish(&mut rng);

    for i in 0..20 {
        let msg = format!("Message {i}");
        let envelope = sa.encrypt(msg.as_bytes(), &mut rng).unwrap();
        assert_eq!(sb.decrypt(&envelope).unwrap(), msg.as_bytes());

        let msg = format!("Response {i}");
        let envelope = sb.encrypt(msg.as_bytes(), &mut rng).unwrap();
        assert_eq!(sa.decrypt(&envelope).unwrap(), msg.as_bytes());
    }
}

/// Envelopes carry no ordering state: any arrival order decrypts.
#[test]
fn test_out_of_order_decryption() {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let (_ia, sa, _ib, sb) = establish(&mut rng);

    let e0 = sa.encrypt(b"message 0", &mut rng).unwrap();
    let e1 = sa.encrypt(b"message 1", &mut rng).unwrap();
    let e2 = sa.encrypt(b"message 2", &mut rng).unwrap();

    assert_eq!(sb.decrypt(&e2).unwrap(), b"message 2");
    assert_eq!(sb.decrypt(&e0).unwrap(), b"message 0");
    assert_eq!(sb.decrypt(&e1).unwrap(), b"message 1");
}

/// Independent sessions can be driven from separate threads.
#[test]
fn test_independent_sessions_across_threads() {
    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            thread::spawn(move || {
                let mut rng = ChaCha20Rng::seed_from_u64(seed);
                let (_ia, sa, _ib, sb) = establish(&mut rng);
                for i in 0..10 {
                    let msg = format!("thread {seed} message {i}");
                    let envelope = sa.encrypt(msg.as_bytes(), &mut rng).unwrap();
                    assert_eq!(sb.decrypt(&envelope).unwrap(), msg.as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// One bound session shared by reference between threads.
#[test]
fn test_shared_session_encrypts_concurrently() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let (_ia, sa, _ib, sb) = establish(&mut rng);

    let envelopes: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4u64)
            .map(|seed| {
                let sa = &sa;
                scope.spawn(move || {
                    let mut rng = ChaCha20Rng::seed_from_u64(100 + seed);
                    sa.encrypt(format!("from thread {seed}").as_bytes(), &mut rng)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (seed, envelope) in envelopes.iter().enumerate() {
        assert_eq!(
            sb.decrypt(envelope).unwrap(),
            format!("from thread {seed}").as_bytes()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_roundtrip(seed in any::<u64>(), message in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let (_ia, sa, _ib, sb) = establish(&mut rng);

        let envelope = sa.encrypt(&message, &mut rng).unwrap();
        prop_assert_eq!(sb.decrypt(&envelope).unwrap(), message.clone());

        let envelope = sb.encrypt(&message, &mut rng).unwrap();
        prop_assert_eq!(sa.decrypt(&envelope).unwrap(), message);
    }

    #[test]
    fn prop_tampered_envelope_rejected(
        seed in any::<u64>(),
        message in proptest::collection::vec(any::<u8>(), 0..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let (_ia, sa, _ib, sb) = establish(&mut rng);

        let envelope = sa.encrypt(&message, &mut rng).unwrap();
        let record: EphemeralEnvelope = wire::decode(&envelope).unwrap();

        // Byte offsets of the public value and the ciphertext in the encoding.
        let public = PUBLIC_OFFSET..PUBLIC_OFFSET + record.public.len();
        let ciphertext_start = public.end + 8;
        let targets: Vec<usize> = public.chain(ciphertext_start..envelope.len()).collect();

        let mut tampered = envelope.clone();
        tampered[targets[position.index(targets.len())]] ^= 1 << bit;

        let result = sb.decrypt(&tampered);
        prop_assert!(
            matches!(result, Err(Error::AuthenticationFailed) | Err(Error::KeyImport(_))),
            "tampered envelope produced {:?}", result
        );
    }
}
