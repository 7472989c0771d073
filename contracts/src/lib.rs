//! # Escrow Relay Ledger
//!
//! A small set of trusted off-chain signers pre-authorize fund movements; a
//! separate, restricted set of fund executors submit those authorizations
//! and get their execution cost reimbursed from the escrow.
//!
//! - **Role Registry**: one admin, a signer set, a fund-executor set.
//! - **Nonce Registry**: every authorization is consumed at most once.
//! - **Authorization Verifier**: recovers the signer of a packed,
//!   Keccak-hashed authorization message.
//! - **Funding Engine**: validates a submission, then moves native and
//!   token balances to the recipient and reimburses the submitter.
//! - **Withdrawal Engine**: admin-only extraction of surplus balances.
//!
//! Everything is owned by one [`ledger::EscrowLedger`], which serializes
//! every operation behind a single lock.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. We use `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do not
//!    mix.
//! 2. Validate, then apply. Every failure leaves the ledger exactly as it
//!    was.
//! 3. Signature recovery gates every funding; role membership gates
//!    everything else.
//! 4. Every public type is serializable (serde) for wire transport.

pub mod assets;
pub mod authorization;
pub mod balances;
pub mod error;
pub mod funding;
pub mod ledger;
pub mod metering;
pub mod nonces;
pub mod roles;
pub mod withdrawal;

pub use error::{ErrorKind, EscrowError};
pub use ledger::{CallContext, EscrowLedger, Genesis, LedgerSnapshot};
