//! # Addresses
//!
//! A 20-byte identity in the Ethereum style. Rendered as `0x`-prefixed
//! lowercase hex, parsed case-insensitively (checksummed input is accepted
//! but the checksum is not enforced).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;

/// Errors produced while parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// An opaque, globally unique identity.
///
/// `Address::ZERO` is the null identity. It is a perfectly valid value to
/// hold, but the ledger refuses to hand it any authority.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null identity.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds an address from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] =
            bytes.try_into().map_err(|_| AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Builds an address from the last 20 bytes of a 32-byte hash. This is
    /// how public keys become identities.
    pub fn from_hash_tail(hash: &[u8; 32]) -> Self {
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&hash[32 - ADDRESS_LENGTH..]);
        Self(out)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0x84e5040b3f758c2fd2b5816f81b52b193242c9e4";

    #[test]
    fn parse_and_display_roundtrip() {
        let addr: Address = SAMPLE.parse().unwrap();
        assert_eq!(addr.to_string(), SAMPLE);
        assert_eq!(addr.to_hex(), SAMPLE);
    }

    #[test]
    fn parse_is_case_insensitive() {
        let lower: Address = SAMPLE.parse().unwrap();
        let mixed: Address = "0x7B06C67a2f1C446B7B27A1F3B48625FE3Ed65b9C".parse().unwrap();
        assert_ne!(lower, mixed);
        let upper: Address = SAMPLE.to_uppercase().replace("0X", "0x").parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn parse_without_prefix() {
        let addr: Address = SAMPLE.trim_start_matches("0x").parse().unwrap();
        assert_eq!(addr.to_string(), SAMPLE);
    }

    #[test]
    fn wrong_length_rejected() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
    }

    #[test]
    fn garbage_hex_rejected() {
        assert!(matches!(
            "0xnot-an-address".parse::<Address>(),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        let addr: Address = SAMPLE.parse().unwrap();
        assert!(!addr.is_zero());
    }

    #[test]
    fn hash_tail_takes_last_twenty_bytes() {
        let mut hash = [0u8; 32];
        for (i, b) in hash.iter_mut().enumerate() {
            *b = i as u8;
        }
        let addr = Address::from_hash_tail(&hash);
        assert_eq!(addr.as_bytes()[0], 12);
        assert_eq!(addr.as_bytes()[19], 31);
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr: Address = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", SAMPLE));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
