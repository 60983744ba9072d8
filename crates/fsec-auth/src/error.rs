use thiserror::Error;

/// Errors from the password helpers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication rejected")]
    Rejected,

    #[error("malformed challenge")]
    MalformedChallenge,

    #[error("randomness unavailable: {0}")]
    Rng(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("malformed password key: {0}")]
    MalformedKey(String),
}
