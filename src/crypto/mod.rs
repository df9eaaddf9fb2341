//! Order-preserving encryption of record positions.
//!
//! Positions are mapped into a larger ciphertext space by a keyed, strictly
//! increasing function, so stored records can be located and range-filtered
//! by ciphertext comparison alone.

mod ope;

pub use ope::PositionCipher;

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of the ciphertext space.
pub const CIPHERTEXT_BITS: u32 = 96;

/// Encrypted position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ciphertext(u128);

impl Ciphertext {
    /// Wrap a raw value as stored on disk.
    pub fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Raw value.
    pub fn value(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:024x}", self.0)
    }
}

/// Per-file salt mixed into the session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; 16]);

impl Salt {
    /// Fresh random salt.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Salt from stored bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Errors from the position cipher.
#[derive(Debug, Error)]
pub enum CipherError {
    /// No key material supplied.
    #[error("master key is empty")]
    EmptyKey,

    /// Value is not the image of any position under this key.
    #[error("ciphertext {0} does not decrypt under this key")]
    InvalidCiphertext(Ciphertext),
}
