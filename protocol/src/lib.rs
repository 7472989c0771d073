// Copyright (c) 2026 Escrow Relay Contributors. MIT License.
// See LICENSE for details.

//! # Escrow Protocol: Core Primitives
//!
//! The small, boring foundation the escrow relay ledger stands on. Nothing in
//! here knows what a signer or a fund executor is; it only knows how to name
//! an identity, how to spell a nonce, how to lay fields out in bytes, and how
//! to get an address back out of a signature.
//!
//! We speak the Ethereum dialect on purpose: 20-byte addresses, Keccak-256,
//! tightly packed 256-bit words, and 65-byte recoverable secp256k1 signatures
//! over the `"\x19Ethereum Signed Message:\n32"` envelope. Off-chain signers
//! already have tooling for exactly that format, and we'd rather meet them
//! where they are than invent a new envelope.
//!
//! ## Architecture
//!
//! - **amount**: serde helpers that carry `u128` amounts as decimal strings.
//! - **identity**: `Address`, the opaque identity every role is keyed by.
//! - **nonce**: 256-bit single-use authorization identifiers.
//! - **encoding**: fixed-width packed encoding for signed payloads.
//! - **crypto**: Keccak hashing, secp256k1 keys, signing and recovery.
//! - **config**: Protocol constants. Every magic number lives there.
//!
//! ## Design Philosophy
//!
//! 1. Recovery is a pure function of bytes. No state, no surprises.
//! 2. Every fallible parse returns a typed error; nothing here panics on
//!    untrusted input.
//! 3. If it touches a signature, it has tests. Plural.

pub mod amount;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod identity;
pub mod nonce;

pub use identity::Address;
pub use nonce::Nonce;
