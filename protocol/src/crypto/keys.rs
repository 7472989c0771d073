//! # Key Management
//!
//! secp256k1 keypairs for off-chain signers, and the mapping from public key
//! to [`Address`].
//!
//! The ledger itself never holds a secret key. Keypairs exist here so that
//! signer tooling, the node's devnet helpers, and the test suites can mint
//! authorizations in exactly the format the ledger verifies.
//!
//! ## Security considerations
//!
//! - Key generation uses the OS RNG (`OsRng`).
//! - `Debug` output never includes secret material.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use super::hash::keccak256;
use crate::config::SECRET_KEY_LENGTH;
use crate::identity::Address;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* a key was rejected.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid secret key hex")]
    InvalidHex,
}

/// Derive the address for a public key: the last 20 bytes of the Keccak-256
/// hash of the uncompressed point, without its `0x04` tag byte.
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_hash_tail(&hash)
}

/// A signer's secp256k1 keypair.
#[derive(Clone)]
pub struct EscrowKeypair {
    signing_key: SigningKey,
    address: Address,
}

impl EscrowKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Restore a keypair from its 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Restore a keypair from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let body = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(body).map_err(|_| KeyError::InvalidHex)?;
        Self::from_secret_bytes(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The identity this keypair signs as.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The raw secret scalar. Handle with care.
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        let mut out = [0u8; SECRET_KEY_LENGTH];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }
}

impl fmt::Debug for EscrowKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscrowKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat's first default account. Public test key, never fund it.
    const KNOWN_SECRET: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KNOWN_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn known_key_derives_known_address() {
        let kp = EscrowKeypair::from_hex(KNOWN_SECRET).unwrap();
        assert_eq!(kp.address().to_string(), KNOWN_ADDRESS);
    }

    #[test]
    fn secret_bytes_roundtrip() {
        let kp = EscrowKeypair::generate();
        let restored = EscrowKeypair::from_secret_bytes(&kp.secret_bytes()).unwrap();
        assert_eq!(kp.address(), restored.address());
    }

    #[test]
    fn generated_keys_are_distinct() {
        assert_ne!(
            EscrowKeypair::generate().address(),
            EscrowKeypair::generate().address()
        );
    }

    #[test]
    fn invalid_secrets_rejected() {
        assert!(EscrowKeypair::from_secret_bytes(&[0u8; 32]).is_err());
        assert!(EscrowKeypair::from_secret_bytes(&[1u8; 31]).is_err());
        assert!(EscrowKeypair::from_hex("zz").is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let kp = EscrowKeypair::from_hex(KNOWN_SECRET).unwrap();
        let dbg = format!("{:?}", kp);
        assert!(!dbg.contains(KNOWN_SECRET));
        assert!(dbg.contains(KNOWN_ADDRESS));
    }
}
