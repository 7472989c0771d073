//! Withdrawal Engine: admin-only extraction of surplus balances.
//!
//! No nonce, no signature. The admin asks, and if the escrow can cover the
//! amount it goes to the admin.

use chrono::{DateTime, Utc};
use escrow_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::assets::{Asset, Transfer};
use crate::error::EscrowError;
use crate::ledger::LedgerState;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub asset: Asset,
    #[serde(with = "escrow_protocol::amount")]
    pub amount: u128,
    pub to: Address,
    #[serde(with = "escrow_protocol::amount")]
    pub balance_after: u128,
    pub processed_at: DateTime<Utc>,
}

pub(crate) fn plan(
    state: &LedgerState,
    caller: &Address,
    asset: Asset,
    amount: u128,
) -> Result<Transfer, EscrowError> {
    state.roles.require(caller, Role::Admin)?;
    state.balances.ensure_covers(asset, amount)?;
    Ok(Transfer {
        asset,
        to: *caller,
        amount,
    })
}

pub(crate) fn apply(
    state: &mut LedgerState,
    transfer: Transfer,
) -> Result<WithdrawalReceipt, EscrowError> {
    if transfer.amount > 0 {
        state.sink.settle(&[transfer])?;
    }
    let balance_after = state.balances.debit(transfer.asset, transfer.amount)?;
    Ok(WithdrawalReceipt {
        asset: transfer.asset,
        amount: transfer.amount,
        to: transfer.to,
        balance_after,
        processed_at: Utc::now(),
    })
}
