//! # Authorization Nonces
//!
//! A nonce is an unsigned 256-bit integer chosen by the off-chain signer.
//! There is no sequence. Nonces are arbitrary, any value may be used once,
//! and the ledger only remembers which ones it has seen.
//!
//! Internally a nonce is its 32-byte big-endian encoding, which is exactly
//! the word that gets packed into a signed authorization. Text form is
//! decimal; `0x`-prefixed hex is accepted on input.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::WORD_LENGTH;

/// Errors produced while parsing a nonce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    #[error("nonce is empty")]
    Empty,

    #[error("nonce contains invalid digits: {0}")]
    InvalidDigits(String),

    #[error("nonce does not fit in 256 bits")]
    TooLarge,
}

/// A single-use 256-bit authorization identifier.
///
/// Ordering matches numeric ordering because the bytes are big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Nonce([u8; WORD_LENGTH]);

impl Nonce {
    /// The zero nonce. Valid, and usable exactly once like any other.
    pub const ZERO: Nonce = Nonce([0u8; WORD_LENGTH]);

    /// Wraps a 32-byte big-endian word.
    pub const fn from_be_bytes(bytes: [u8; WORD_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The 32-byte big-endian word, as packed into signed payloads.
    pub fn to_be_bytes(&self) -> [u8; WORD_LENGTH] {
        self.0
    }

    /// A uniformly random nonce. Signers that don't track their own counters
    /// can draw from the full 256-bit space and never worry about collisions.
    pub fn random() -> Self {
        let mut bytes = [0u8; WORD_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn from_be_slice(bytes: &[u8]) -> Result<Self, NonceError> {
        if bytes.len() > WORD_LENGTH {
            return Err(NonceError::TooLarge);
        }
        let mut out = [0u8; WORD_LENGTH];
        out[WORD_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    fn to_biguint(self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl From<u64> for Nonce {
    fn from(value: u64) -> Self {
        Self::from(value as u128)
    }
}

impl From<u128> for Nonce {
    fn from(value: u128) -> Self {
        let mut out = [0u8; WORD_LENGTH];
        out[WORD_LENGTH - 16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl FromStr for Nonce {
    type Err = NonceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NonceError::Empty);
        }

        if let Some(hex_body) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if hex_body.is_empty() {
                return Err(NonceError::Empty);
            }
            let value = BigUint::parse_bytes(hex_body.as_bytes(), 16)
                .ok_or_else(|| NonceError::InvalidDigits(s.to_string()))?;
            return Self::from_be_slice(&value.to_bytes_be());
        }

        let value = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| NonceError::InvalidDigits(s.to_string()))?;
        Self::from_be_slice(&value.to_bytes_be())
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self)
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Always a string: 256-bit values don't survive a round trip through
        // JSON numbers in most clients.
        serializer.collect_str(self)
    }
}

struct NonceVisitor;

impl<'de> Visitor<'de> for NonceVisitor {
    type Value = Nonce;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal or 0x-hex string, or an unsigned integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Nonce, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Nonce, E> {
        Ok(Nonce::from(v))
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NonceVisitor)
    }
}
