//! Shared-password challenge/response.
//!
//! The verifier sends a random challenge; the prover answers with
//! `Keccak-512(password || challenge)`; the verifier acknowledges.
//!
//! # Wire Format
//!
//! ```text
//! verifier -> prover   [20 bytes: challenge, zero-padded decimal u64]
//! prover   -> verifier [64 bytes: response]
//! verifier -> prover   [2 bytes: "ok" | "no"]
//! ```
//!
//! Every message has a fixed length, so both sides read exactly what they
//! expect without any further framing.

use fsec_common::constant_time_eq;
use rand::{CryptoRng, RngCore};
use tiny_keccak::{Hasher, Keccak};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::AuthError;

/// Length of an encoded challenge (`u64::MAX` has 20 digits).
pub const CHALLENGE_LEN: usize = 20;

/// Length of a response (Keccak-512 digest).
pub const RESPONSE_LEN: usize = 64;

/// Sent by the verifier after a valid response.
pub const ACK_OK: &[u8; 2] = b"ok";

/// Sent by the verifier after an invalid response.
pub const ACK_REJECTED: &[u8; 2] = b"no";

/// Generate a random challenge.
pub fn generate_challenge<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
) -> Result<String, AuthError> {
    let mut bytes = [0u8; 8];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Rng(e.to_string()))?;
    Ok(format!("{:020}", u64::from_le_bytes(bytes)))
}

/// Compute the response to `challenge` for `password`.
pub fn response(password: &str, challenge: &str) -> [u8; RESPONSE_LEN] {
    let mut hasher = Keccak::v512();
    hasher.update(password.as_bytes());
    hasher.update(challenge.as_bytes());

    let mut out = [0u8; RESPONSE_LEN];
    hasher.finalize(&mut out);
    out
}

/// Check a response in constant time.
pub fn validate(password: &str, challenge: &str, candidate: &[u8]) -> bool {
    constant_time_eq(&response(password, challenge), candidate)
}

/// Verifier side: challenge the peer and check its answer.
///
/// Returns [`AuthError::Rejected`] if the response does not match. The peer
/// is told either way.
pub async fn challenge<S, R>(stream: &mut S, password: &str, rng: &mut R) -> Result<(), AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: RngCore + CryptoRng + ?Sized,
{
    let challenge = generate_challenge(rng)?;
    stream.write_all(challenge.as_bytes()).await?;
    stream.flush().await?;

    let mut candidate = [0u8; RESPONSE_LEN];
    stream.read_exact(&mut candidate).await?;

    if !validate(password, &challenge, &candidate) {
        warn!("challenge response rejected");
        stream.write_all(ACK_REJECTED).await?;
        stream.flush().await?;
        return Err(AuthError::Rejected);
    }

    stream.write_all(ACK_OK).await?;
    stream.flush().await?;
    debug!("challenge response accepted");
    Ok(())
}

/// Prover side: answer the peer's challenge.
///
/// Returns [`AuthError::Rejected`] unless the verifier acknowledges, including
/// when it closes the stream instead.
pub async fn authenticate<S>(stream: &mut S, password: &str) -> Result<(), AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut raw = [0u8; CHALLENGE_LEN];
    stream.read_exact(&mut raw).await?;

    let challenge = std::str::from_utf8(&raw).map_err(|_| AuthError::MalformedChallenge)?;
    if !challenge.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::MalformedChallenge);
    }

    stream.write_all(&response(password, challenge)).await?;
    stream.flush().await?;

    let mut ack = [0u8; 2];
    match stream.read_exact(&mut ack).await {
        Ok(_) if &ack == ACK_OK => Ok(()),
        Ok(_) => Err(AuthError::Rejected),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(AuthError::Rejected),
        Err(e) => Err(e.into()),
    }
}
