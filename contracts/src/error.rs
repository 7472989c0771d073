//! Errors surfaced by every boundary operation of the ledger.
//!
//! All of them are terminal. Nothing is retried internally, and a failed
//! operation leaves roles, nonces and balances exactly as they were.

use std::fmt;

use escrow_protocol::crypto::SignatureError;
use escrow_protocol::{Address, Nonce};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::{Asset, TransferError};
use crate::roles::Role;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    /// The caller does not hold the role the operation requires.
    #[error("unauthorized: {caller} is not {required}")]
    Unauthorized {
        /// Identity that attempted the operation.
        caller: Address,
        /// Role the operation requires.
        required: Role,
    },

    /// The authorization's nonce was already consumed by an earlier funding.
    #[error("nonce {0} already used")]
    NonceAlreadyUsed(Nonce),

    /// The signature does not recover to a registered signer.
    #[error("authorization was not signed by a registered signer")]
    InvalidAuthorization,

    /// The execution unit price of the submission differs from the signed one.
    #[error("unit price mismatch: signed {signed}, submitted at {submitted}")]
    PriceMismatch {
        /// Price the signer approved.
        signed: u128,
        /// Price the submission is being processed at.
        submitted: u128,
    },

    /// The escrow cannot cover the requested amount.
    #[error("insufficient {asset} funds: available {available}, required {required}")]
    InsufficientFunds {
        asset: Asset,
        available: u128,
        required: u128,
    },

    /// A signature could not be parsed or no signer could be recovered.
    #[error("malformed signature: {0}")]
    MalformedSignature(#[from] SignatureError),

    /// The zero identity was proposed as admin.
    #[error("the zero address cannot be admin")]
    InvalidAdmin,

    /// A deposit would push a balance past `u128::MAX`.
    #[error("amount overflow")]
    AmountOverflow,

    /// The asset collaborator refused the transfer batch.
    #[error("settlement failed: {0}")]
    Settlement(#[from] TransferError),
}

/// Flat, stable label for an [`EscrowError`], suitable for metrics labels and
/// wire responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NonceAlreadyUsed,
    InvalidAuthorization,
    PriceMismatch,
    InsufficientFunds,
    MalformedSignature,
    InvalidAdmin,
    AmountOverflow,
    Settlement,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Unauthorized,
        ErrorKind::NonceAlreadyUsed,
        ErrorKind::InvalidAuthorization,
        ErrorKind::PriceMismatch,
        ErrorKind::InsufficientFunds,
        ErrorKind::MalformedSignature,
        ErrorKind::InvalidAdmin,
        ErrorKind::AmountOverflow,
        ErrorKind::Settlement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NonceAlreadyUsed => "nonce_already_used",
            ErrorKind::InvalidAuthorization => "invalid_authorization",
            ErrorKind::PriceMismatch => "price_mismatch",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::MalformedSignature => "malformed_signature",
            ErrorKind::InvalidAdmin => "invalid_admin",
            ErrorKind::AmountOverflow => "amount_overflow",
            ErrorKind::Settlement => "settlement",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EscrowError::Unauthorized { .. } => ErrorKind::Unauthorized,
            EscrowError::NonceAlreadyUsed(_) => ErrorKind::NonceAlreadyUsed,
            EscrowError::InvalidAuthorization => ErrorKind::InvalidAuthorization,
            EscrowError::PriceMismatch { .. } => ErrorKind::PriceMismatch,
            EscrowError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            EscrowError::MalformedSignature(_) => ErrorKind::MalformedSignature,
            EscrowError::InvalidAdmin => ErrorKind::InvalidAdmin,
            EscrowError::AmountOverflow => ErrorKind::AmountOverflow,
            EscrowError::Settlement(_) => ErrorKind::Settlement,
        }
    }
}
