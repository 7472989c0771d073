//! # Recoverable Signatures
//!
//! secp256k1 ECDSA with a trailing recovery byte: `r (32) || s (32) || v (1)`.
//!
//! The ledger never stores public keys. It recovers the signer's address from
//! the signature and the digest, then asks "is that address a signer?". That
//! makes recovery the single most security-sensitive function in the crate,
//! so it is strict about its input:
//!
//! 1. Exactly 65 bytes, or it's malformed.
//! 2. `v` must be 27, 28, 0 or 1. Anything else is malformed.
//! 3. `r` and `s` must be non-zero scalars below the curve order.
//! 4. `s` must be in the lower half of the order. High-s signatures are the
//!    malleable twin of a valid signature and are rejected outright.
//!
//! A well-formed signature over the *wrong* digest does not fail here; it
//! recovers to some unrelated address. Callers compare addresses.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::hash::signed_message_digest;
use super::keys::{address_of, EscrowKeypair};
use crate::config::{RECOVERY_ID_OFFSET, SIGNATURE_LENGTH};
use crate::identity::Address;

/// Errors during signature operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery byte: {0}")]
    InvalidRecoveryId(u8),

    #[error("invalid signature scalars")]
    InvalidScalars,

    #[error("signature is not in canonical low-s form")]
    NonCanonical,

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signing failed")]
    SigningFailed,

    #[error("invalid signature hex")]
    InvalidHex,
}

/// A 65-byte recoverable signature as produced by [`sign_prehash`].
///
/// Construction only checks the length; every other check happens at
/// recovery time so that raw byte slices and this type go through the same
/// gate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature([u8; SIGNATURE_LENGTH]);

impl RecoverableSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let arr: [u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(body).map_err(|_| SignatureError::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// The trailing recovery byte.
    pub fn v(&self) -> u8 {
        self.0[SIGNATURE_LENGTH - 1]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for RecoverableSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Sign a 32-byte digest directly, with no envelope.
///
/// Always emits low-s signatures with `v` in `{27, 28}`.
pub fn sign_prehash(
    keypair: &EscrowKeypair,
    digest: &[u8; 32],
) -> Result<RecoverableSignature, SignatureError> {
    let (signature, recovery_id) = keypair
        .signing_key()
        .sign_prehash_recoverable(digest)
        .map_err(|_| SignatureError::SigningFailed)?;

    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (signature, recovery_id),
    };

    let mut out = [0u8; SIGNATURE_LENGTH];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;
    Ok(RecoverableSignature(out))
}

/// Sign a 32-byte hash the way wallet tooling signs a message: wrap it in
/// the personal-message envelope first, then sign the resulting digest.
pub fn sign_message_hash(
    keypair: &EscrowKeypair,
    hash: &[u8; 32],
) -> Result<RecoverableSignature, SignatureError> {
    sign_prehash(keypair, &signed_message_digest(hash))
}

/// Recover the signer address from a signature over a raw 32-byte digest.
pub fn recover_prehash_signer(digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
    let (signature, recovery_id) = parse_signature(signature)?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_of(&verifying_key))
}

/// Recover the signer address from a signature over the envelope-wrapped
/// form of `hash`. Inverse of [`sign_message_hash`].
pub fn recover_message_signer(hash: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
    recover_prehash_signer(&signed_message_digest(hash), signature)
}

fn parse_signature(bytes: &[u8]) -> Result<(Signature, RecoveryId), SignatureError> {
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidLength(bytes.len()));
    }

    let v = bytes[SIGNATURE_LENGTH - 1];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - RECOVERY_ID_OFFSET,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v))?;

    let signature =
        Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::InvalidScalars)?;
    if signature.normalize_s().is_some() {
        return Err(SignatureError::NonCanonical);
    }

    Ok((signature, recovery_id))
}
