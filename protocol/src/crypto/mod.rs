//! # Cryptographic Primitives for the Escrow Relay
//!
//! Every authorization the ledger accepts is checked here. Signers sign off
//! the ledger; the ledger only ever recovers.
//!
//! We deliberately chose boring, widely deployed cryptography:
//!
//! - **secp256k1 ECDSA** with a recovery byte, so a signature alone names
//!   its signer and no public key registry is needed.
//! - **Keccak-256** for digests and address derivation.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around `k256` and
//! `sha3`. If you're tempted to optimize these functions, please reconsider.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{keccak256, keccak256_concat, signed_message_digest};
pub use keys::{address_of, EscrowKeypair, KeyError};
pub use signatures::{
    recover_message_signer, recover_prehash_signer, sign_message_hash, sign_prehash,
    RecoverableSignature, SignatureError,
};
