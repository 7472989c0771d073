//! # Funding Engine
//!
//! A fund executor submits a signer's authorization; the engine checks it and
//! pays out. Two flows:
//!
//! - **Fiat payment**: native *and* token balance go to the recipient.
//! - **Relayed payment**: only native balance goes to the recipient.
//!
//! In both, the executor is reimbursed `units_consumed * unit_price` in native
//! balance, where `unit_price` is the price the signer approved.
//!
//! ## Order of checks
//!
//! 1. Caller is a fund executor, else `Unauthorized`.
//! 2. Nonce is unused, else `NonceAlreadyUsed`.
//! 3. The rebuilt authorization recovers to a signer, else
//!    `InvalidAuthorization`.
//! 4. Submission price equals the signed price, else `PriceMismatch`.
//! 5. The escrow covers `native_amount + reimbursement` (and `token_amount`),
//!    else `InsufficientFunds`.
//!
//! All five run against an immutable view and produce a [`FundingPlan`].
//! Applying the plan settles the transfer batch first; the nonce and the
//! counters are only touched once the batch has landed.

use chrono::{DateTime, Utc};
use escrow_protocol::{Address, Nonce};
use serde::{Deserialize, Serialize};

use crate::assets::{Asset, Transfer};
use crate::authorization::{self, AuthorizationMessage};
use crate::error::EscrowError;
use crate::ledger::{CallContext, LedgerState};
use crate::metering::CostMeter;
use crate::roles::Role;

/// Which funding flow a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingFlow {
    FiatPayment,
    RelayedPayment,
}

impl FundingFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundingFlow::FiatPayment => "fiat_payment",
            FundingFlow::RelayedPayment => "relayed_payment",
        }
    }
}

impl std::fmt::Display for FundingFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw arguments of a funding submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRequest {
    pub flow: FundingFlow,
    pub nonce: Nonce,
    /// The unit price the signer approved.
    pub unit_price: u128,
    pub recipient: Address,
    pub native_amount: u128,
    /// Always zero for relayed payments.
    pub token_amount: u128,
}

impl FundingRequest {
    pub fn fiat(
        nonce: Nonce,
        unit_price: u128,
        recipient: Address,
        native_amount: u128,
        token_amount: u128,
    ) -> Self {
        Self {
            flow: FundingFlow::FiatPayment,
            nonce,
            unit_price,
            recipient,
            native_amount,
            token_amount,
        }
    }

    pub fn relayed(nonce: Nonce, unit_price: u128, recipient: Address, native_amount: u128) -> Self {
        Self {
            flow: FundingFlow::RelayedPayment,
            nonce,
            unit_price,
            recipient,
            native_amount,
            token_amount: 0,
        }
    }

    /// The message the signer must have signed for this request to be valid
    /// against `escrow`.
    pub fn authorization(&self, escrow: Address) -> AuthorizationMessage {
        match self.flow {
            FundingFlow::FiatPayment => AuthorizationMessage::fiat_payment(
                self.nonce,
                escrow,
                self.unit_price,
                self.recipient,
                self.native_amount,
                self.token_amount,
            ),
            FundingFlow::RelayedPayment => AuthorizationMessage::relayed_payment(
                self.nonce,
                escrow,
                self.unit_price,
                self.recipient,
                self.native_amount,
            ),
        }
    }
}

/// What a successful funding did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReceipt {
    pub nonce: Nonce,
    pub flow: FundingFlow,
    pub recipient: Address,
    #[serde(with = "escrow_protocol::amount")]
    pub native_amount: u128,
    #[serde(with = "escrow_protocol::amount")]
    pub token_amount: u128,
    /// Execution units the meter reported for this flow.
    pub units_consumed: u64,
    /// Always equal to the signed unit price.
    #[serde(with = "escrow_protocol::amount")]
    pub unit_price_charged: u128,
    /// `units_consumed * unit_price_charged`, paid to the executor.
    #[serde(with = "escrow_protocol::amount")]
    pub reimbursement: u128,
    pub executor: Address,
    pub signer: Address,
    pub processed_at: DateTime<Utc>,
}

/// A fully validated funding, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FundingPlan {
    request: FundingRequest,
    executor: Address,
    signer: Address,
    units_consumed: u64,
    reimbursement: u128,
    native_debit: u128,
    transfers: Vec<Transfer>,
}

/// Runs every check against `state` without mutating it.
pub(crate) fn plan(
    state: &LedgerState,
    escrow: Address,
    meter: &dyn CostMeter,
    call: &CallContext,
    request: &FundingRequest,
    signature: &[u8],
) -> Result<FundingPlan, EscrowError> {
    state.roles.require(&call.caller, Role::FundExecutor)?;
    state.nonces.ensure_unused(&request.nonce)?;

    let signer = authorization::verify(&request.authorization(escrow), signature)
        .map_err(|_| EscrowError::InvalidAuthorization)?;
    // A valid signature from a non-signer is indistinguishable from a forgery.
    state
        .roles
        .require(&signer, Role::Signer)
        .map_err(|_| EscrowError::InvalidAuthorization)?;

    if call.unit_price != request.unit_price {
        return Err(EscrowError::PriceMismatch {
            signed: request.unit_price,
            submitted: call.unit_price,
        });
    }

    // A requirement past u128::MAX can never be covered.
    let uncoverable = || EscrowError::InsufficientFunds {
        asset: Asset::Native,
        available: state.balances.native(),
        required: u128::MAX,
    };
    let units_consumed = meter.units_consumed(request.flow);
    let reimbursement = u128::from(units_consumed)
        .checked_mul(request.unit_price)
        .ok_or_else(uncoverable)?;
    let native_debit = request
        .native_amount
        .checked_add(reimbursement)
        .ok_or_else(uncoverable)?;

    state.balances.ensure_covers(Asset::Native, native_debit)?;
    if request.flow == FundingFlow::FiatPayment {
        state
            .balances
            .ensure_covers(Asset::Token, request.token_amount)?;
    }

    let mut transfers = Vec::with_capacity(3);
    transfers.push(Transfer::native(request.recipient, request.native_amount));
    if request.flow == FundingFlow::FiatPayment {
        transfers.push(Transfer::token(request.recipient, request.token_amount));
    }
    transfers.push(Transfer::native(call.caller, reimbursement));
    transfers.retain(|t| t.amount > 0);

    Ok(FundingPlan {
        request: *request,
        executor: call.caller,
        signer,
        units_consumed,
        reimbursement,
        native_debit,
        transfers,
    })
}

/// Settles the plan's transfers, then consumes the nonce and debits the
/// escrow.
pub(crate) fn apply(state: &mut LedgerState, plan: FundingPlan) -> Result<FundingReceipt, EscrowError> {
    state.sink.settle(&plan.transfers)?;

    let request = plan.request;
    state.nonces.mark_used(request.nonce)?;
    state.balances.debit(Asset::Native, plan.native_debit)?;
    if request.flow == FundingFlow::FiatPayment {
        state.balances.debit(Asset::Token, request.token_amount)?;
    }

    Ok(FundingReceipt {
        nonce: request.nonce,
        flow: request.flow,
        recipient: request.recipient,
        native_amount: request.native_amount,
        token_amount: request.token_amount,
        units_consumed: plan.units_consumed,
        unit_price_charged: request.unit_price,
        reimbursement: plan.reimbursement,
        executor: plan.executor,
        signer: plan.signer,
        processed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relayed_request_carries_no_token() {
        let req = FundingRequest::relayed(Nonce::from(1u64), 5, Address::ZERO, 10);
        assert_eq!(req.token_amount, 0);
        assert_eq!(req.flow, FundingFlow::RelayedPayment);
        assert_eq!(req.authorization(Address::ZERO).token_amount, None);
    }

    #[test]
    fn fiat_request_binds_the_escrow() {
        let escrow = Address::new([7; 20]);
        let req = FundingRequest::fiat(Nonce::from(1u64), 5, Address::ZERO, 10, 3);
        let msg = req.authorization(escrow);
        assert_eq!(msg.escrow, escrow);
        assert_eq!(msg.token_amount, Some(3));
        assert_eq!(msg.flow(), FundingFlow::FiatPayment);
    }

    #[test]
    fn flow_labels() {
        assert_eq!(FundingFlow::FiatPayment.to_string(), "fiat_payment");
        assert_eq!(
            serde_json::to_string(&FundingFlow::RelayedPayment).unwrap(),
            "\"relayed_payment\""
        );
    }

    #[test]
    fn receipt_amounts_serialize_as_strings() {
        let receipt = FundingReceipt {
            nonce: Nonce::from(9u64),
            flow: FundingFlow::FiatPayment,
            recipient: Address::new([2; 20]),
            native_amount: u128::MAX,
            token_amount: 0,
            units_consumed: 3,
            unit_price_charged: 20_000_000_000,
            reimbursement: 60_000_000_000,
            executor: Address::new([3; 20]),
            signer: Address::new([4; 20]),
            processed_at: Utc::now(),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["native_amount"], u128::MAX.to_string());
        assert_eq!(json["token_amount"], "0");
        assert_eq!(json["reimbursement"], "60000000000");
        assert_eq!(json["units_consumed"], 3);

        let back: FundingReceipt = serde_json::from_value(json).unwrap();
        assert_eq!(back, receipt);
    }
}
