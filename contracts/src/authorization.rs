//! # Authorization Verifier
//!
//! A signer authorizes a funding by signing an [`AuthorizationMessage`]:
//!
//! 1. Pack the fields in fixed order, fixed width (integers as 32-byte
//!    big-endian words, addresses as 20 raw bytes):
//!    `nonce ‖ escrow ‖ unit_price ‖ recipient ‖ native_amount [‖ token_amount]`
//! 2. `authorization_hash = keccak256(packed)`
//! 3. Sign `keccak256("\x19Ethereum Signed Message:\n32" ‖ authorization_hash)`
//!
//! The escrow's own identity is part of the payload, so an authorization
//! issued for one escrow is worthless against another. The token amount is
//! present only for the fiat-payment flow, so the two flows never share a
//! signed payload.
//!
//! Verification is pure: it recovers an identity and returns it. Whether that
//! identity is allowed to authorize anything is the Funding Engine's call.

use escrow_protocol::crypto::{
    keccak256, recover_message_signer, sign_message_hash, EscrowKeypair, RecoverableSignature,
    SignatureError,
};
use escrow_protocol::encoding::PackedEncoder;
use escrow_protocol::{Address, Nonce};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::funding::FundingFlow;

/// The payload a signer signs to authorize one funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
    pub nonce: Nonce,
    pub escrow: Address,
    pub unit_price: u128,
    pub recipient: Address,
    pub native_amount: u128,
    /// `Some` for fiat-payment authorizations, `None` for relayed ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_amount: Option<u128>,
}

impl AuthorizationMessage {
    pub fn fiat_payment(
        nonce: Nonce,
        escrow: Address,
        unit_price: u128,
        recipient: Address,
        native_amount: u128,
        token_amount: u128,
    ) -> Self {
        Self {
            nonce,
            escrow,
            unit_price,
            recipient,
            native_amount,
            token_amount: Some(token_amount),
        }
    }

    pub fn relayed_payment(
        nonce: Nonce,
        escrow: Address,
        unit_price: u128,
        recipient: Address,
        native_amount: u128,
    ) -> Self {
        Self {
            nonce,
            escrow,
            unit_price,
            recipient,
            native_amount,
            token_amount: None,
        }
    }

    pub fn flow(&self) -> FundingFlow {
        match self.token_amount {
            Some(_) => FundingFlow::FiatPayment,
            None => FundingFlow::RelayedPayment,
        }
    }

    /// The packed byte encoding.
    pub fn encode(&self) -> Vec<u8> {
        let encoder = PackedEncoder::with_capacity(32 * 5 + 20 * 2)
            .nonce(&self.nonce)
            .address(&self.escrow)
            .uint(self.unit_price)
            .address(&self.recipient)
            .uint(self.native_amount);
        match self.token_amount {
            Some(token_amount) => encoder.uint(token_amount).finish(),
            None => encoder.finish(),
        }
    }

    /// Keccak-256 of the packed encoding.
    pub fn authorization_hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }
}

/// Recover the identity that signed `message`.
pub fn verify(message: &AuthorizationMessage, signature: &[u8]) -> Result<Address, EscrowError> {
    recover_signer(&message.authorization_hash(), signature)
}

/// Recover the identity that signed a caller-supplied 32-byte hash under the
/// signed-message convention.
pub fn recover_signer(hash: &[u8; 32], signature: &[u8]) -> Result<Address, EscrowError> {
    Ok(recover_message_signer(hash, signature)?)
}

/// Produce the 65-byte signature a signer would hand to a fund executor.
pub fn sign_authorization(
    keypair: &EscrowKeypair,
    message: &AuthorizationMessage,
) -> Result<RecoverableSignature, SignatureError> {
    sign_message_hash(keypair, &message.authorization_hash())
}
