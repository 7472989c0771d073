//! # Packed Encoding
//!
//! Signed payloads are laid out as a tight concatenation of fixed-width
//! fields: integers as 32-byte big-endian words, addresses as their raw 20
//! bytes, no length prefixes and no padding between fields. This matches the
//! "packed" encoding off-chain signing libraries produce, so a payload built
//! here hashes to the same digest a signer computed on their side.
//!
//! Every field has a fixed width, so the encoding is unambiguous as long as
//! the field order is fixed. Callers own the field order.

use crate::config::WORD_LENGTH;
use crate::identity::Address;
use crate::nonce::Nonce;

/// Encodes a `u128` as a 32-byte big-endian word.
pub fn u128_word(value: u128) -> [u8; WORD_LENGTH] {
    let mut out = [0u8; WORD_LENGTH];
    out[WORD_LENGTH - 16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Builder for packed payloads.
///
/// ```
/// use escrow_protocol::encoding::PackedEncoder;
/// use escrow_protocol::{Address, Nonce};
///
/// let bytes = PackedEncoder::new()
///     .nonce(&Nonce::from(7u64))
///     .address(&Address::ZERO)
///     .uint(1_000)
///     .finish();
/// assert_eq!(bytes.len(), 32 + 20 + 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackedEncoder {
    buf: Vec<u8>,
}

impl PackedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Appends a raw 32-byte word.
    pub fn word(mut self, word: [u8; WORD_LENGTH]) -> Self {
        self.buf.extend_from_slice(&word);
        self
    }

    /// Appends an unsigned integer as a 32-byte big-endian word.
    pub fn uint(self, value: u128) -> Self {
        self.word(u128_word(value))
    }

    /// Appends a nonce as a 32-byte big-endian word.
    pub fn nonce(self, nonce: &Nonce) -> Self {
        self.word(nonce.to_be_bytes())
    }

    /// Appends an address as its raw 20 bytes.
    pub fn address(mut self, address: &Address) -> Self {
        self.buf.extend_from_slice(address.as_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the builder, returning the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
