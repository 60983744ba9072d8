//! Password helpers that sit beside the forward-secrecy core.
//!
//! - [`challenge`]: Keccak-512 challenge/response over any async byte stream
//! - [`password`]: salted PBKDF2-HMAC-SHA256 password keys
//!
//! Neither touches session state; both compare secrets in constant time.

#![forbid(unsafe_code)]

pub mod challenge;
pub mod error;
pub mod password;

pub use error::AuthError;
pub use password::{PasswordKey, PasswordParams};
