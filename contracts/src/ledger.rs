//! # Escrow Ledger
//!
//! The single owner of all ledger state. Roles, nonces, balances and the
//! asset sink live in one [`LedgerState`] behind one mutex, and every public
//! operation (reads included) holds that lock for its full duration. A
//! funding submission therefore validates and applies as one indivisible
//! step, and two executors racing the same nonce cannot both win.
//!
//! `EscrowLedger` is `Send + Sync`; share it as `Arc<EscrowLedger>`.

use escrow_protocol::{Address, Nonce};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::assets::{Asset, AssetBook, AssetSink};
use crate::authorization;
use crate::balances::BalanceLedger;
use crate::error::EscrowError;
use crate::funding::{self, FundingReceipt, FundingRequest};
use crate::metering::{CostMeter, FixedCostMeter};
use crate::nonces::NonceRegistry;
use crate::roles::RoleRegistry;
use crate::withdrawal::{self, WithdrawalReceipt};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Who is submitting, and at what execution unit price the submission is
/// being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub unit_price: u128,
}

impl CallContext {
    pub fn new(caller: Address, unit_price: u128) -> Self {
        Self { caller, unit_price }
    }
}

/// Initial ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// The escrow's own identity, bound into every authorization.
    pub escrow: Address,
    /// Initial admin. Must not be the zero identity.
    pub admin: Address,
    /// Fund executors registered from the start.
    #[serde(default)]
    pub fund_executors: Vec<Address>,
}

/// A consistent read of the whole ledger, taken under one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub escrow: Address,
    pub admin: Address,
    pub signers: Vec<Address>,
    pub fund_executors: Vec<Address>,
    #[serde(with = "escrow_protocol::amount")]
    pub native_balance: u128,
    #[serde(with = "escrow_protocol::amount")]
    pub token_balance: u128,
    pub used_nonces: usize,
}

/// Result of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub from: Address,
    pub asset: Asset,
    #[serde(with = "escrow_protocol::amount")]
    pub amount: u128,
    #[serde(with = "escrow_protocol::amount")]
    pub balance_after: u128,
}

pub(crate) struct LedgerState {
    pub(crate) roles: RoleRegistry,
    pub(crate) nonces: NonceRegistry,
    pub(crate) balances: BalanceLedger,
    pub(crate) sink: Box<dyn AssetSink>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct EscrowLedger {
    escrow: Address,
    meter: Box<dyn CostMeter>,
    state: Mutex<LedgerState>,
}

impl EscrowLedger {
    /// Creates a ledger with empty balances, no signers and no used nonces.
    pub fn new(
        genesis: Genesis,
        sink: impl AssetSink + 'static,
        meter: impl CostMeter + 'static,
    ) -> Result<Self, EscrowError> {
        let roles = RoleRegistry::new(genesis.admin, genesis.fund_executors)?;
        Ok(Self {
            escrow: genesis.escrow,
            meter: Box::new(meter),
            state: Mutex::new(LedgerState {
                roles,
                nonces: NonceRegistry::new(),
                balances: BalanceLedger::new(),
                sink: Box::new(sink),
            }),
        })
    }

    /// A ledger settling into a fresh [`AssetBook`] with the default meter.
    /// Returns a handle to the book for holdings queries.
    pub fn in_memory(genesis: Genesis) -> Result<(Self, AssetBook), EscrowError> {
        let book = AssetBook::new();
        let ledger = Self::new(genesis, book.clone(), FixedCostMeter::default())?;
        Ok((ledger, book))
    }

    pub fn escrow_address(&self) -> Address {
        self.escrow
    }

    // -- Funding ------------------------------------------------------------

    /// Fiat-payment funding: moves `native_amount` and `token_amount` to
    /// `recipient` and reimburses the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn fund_for_fiat_payment(
        &self,
        call: CallContext,
        nonce: Nonce,
        unit_price: u128,
        recipient: Address,
        native_amount: u128,
        token_amount: u128,
        signature: &[u8],
    ) -> Result<FundingReceipt, EscrowError> {
        let request = FundingRequest::fiat(nonce, unit_price, recipient, native_amount, token_amount);
        self.submit_funding(call, &request, signature)
    }

    /// Relayed-payment funding: moves `native_amount` to `recipient` and
    /// reimburses the caller.
    pub fn fund_for_relayed_payment(
        &self,
        call: CallContext,
        nonce: Nonce,
        unit_price: u128,
        recipient: Address,
        native_amount: u128,
        signature: &[u8],
    ) -> Result<FundingReceipt, EscrowError> {
        let request = FundingRequest::relayed(nonce, unit_price, recipient, native_amount);
        self.submit_funding(call, &request, signature)
    }

    /// Validates and applies a funding request of either flow.
    pub fn submit_funding(
        &self,
        call: CallContext,
        request: &FundingRequest,
        signature: &[u8],
    ) -> Result<FundingReceipt, EscrowError> {
        let mut state = self.state.lock();
        let plan = funding::plan(&state, self.escrow, self.meter.as_ref(), &call, request, signature)?;
        funding::apply(&mut state, plan)
    }

    // -- Roles --------------------------------------------------------------

    /// Adds or removes a signer. Returns whether membership changed.
    pub fn edit_signer(
        &self,
        caller: Address,
        identity: Address,
        present: bool,
    ) -> Result<bool, EscrowError> {
        self.state.lock().roles.set_signer(&caller, identity, present)
    }

    /// Adds or removes a fund executor. Returns whether membership changed.
    pub fn edit_fund_executor(
        &self,
        caller: Address,
        identity: Address,
        present: bool,
    ) -> Result<bool, EscrowError> {
        self.state
            .lock()
            .roles
            .set_fund_executor(&caller, identity, present)
    }

    pub fn edit_admin(&self, caller: Address, new_admin: Address) -> Result<(), EscrowError> {
        self.state.lock().roles.set_admin(&caller, new_admin)
    }

    // -- Withdrawals --------------------------------------------------------

    pub fn withdraw_native(&self, caller: Address, amount: u128) -> Result<WithdrawalReceipt, EscrowError> {
        self.withdraw(caller, Asset::Native, amount)
    }

    pub fn withdraw_token(&self, caller: Address, amount: u128) -> Result<WithdrawalReceipt, EscrowError> {
        self.withdraw(caller, Asset::Token, amount)
    }

    fn withdraw(
        &self,
        caller: Address,
        asset: Asset,
        amount: u128,
    ) -> Result<WithdrawalReceipt, EscrowError> {
        let mut state = self.state.lock();
        let transfer = withdrawal::plan(&state, &caller, asset, amount)?;
        withdrawal::apply(&mut state, transfer)
    }

    // -- Deposits -----------------------------------------------------------

    /// Credits the escrow's native balance. Anyone may deposit.
    pub fn deposit_native(&self, from: Address, amount: u128) -> Result<DepositReceipt, EscrowError> {
        self.deposit(from, Asset::Native, amount)
    }

    /// Credits the escrow's token balance. Anyone may deposit.
    pub fn deposit_token(&self, from: Address, amount: u128) -> Result<DepositReceipt, EscrowError> {
        self.deposit(from, Asset::Token, amount)
    }

    fn deposit(&self, from: Address, asset: Asset, amount: u128) -> Result<DepositReceipt, EscrowError> {
        let balance_after = self.state.lock().balances.credit(asset, amount)?;
        Ok(DepositReceipt {
            from,
            asset,
            amount,
            balance_after,
        })
    }

    // -- Queries ------------------------------------------------------------

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.state.lock().roles.is_signer(identity)
    }

    pub fn is_fund_executor(&self, identity: &Address) -> bool {
        self.state.lock().roles.is_fund_executor(identity)
    }

    pub fn is_nonce_used(&self, nonce: &Nonce) -> bool {
        self.state.lock().nonces.is_used(nonce)
    }

    pub fn current_admin(&self) -> Address {
        self.state.lock().roles.admin()
    }

    pub fn native_balance(&self) -> u128 {
        self.state.lock().balances.native()
    }

    pub fn token_balance(&self) -> u128 {
        self.state.lock().balances.token()
    }

    /// Recovers the signer of a 32-byte hash under the signed-message
    /// convention. Does not consult or touch ledger state.
    pub fn get_signer(&self, hash: &[u8; 32], signature: &[u8]) -> Result<Address, EscrowError> {
        authorization::recover_signer(hash, signature)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        LedgerSnapshot {
            escrow: self.escrow,
            admin: state.roles.admin(),
            signers: state.roles.signers(),
            fund_executors: state.roles.fund_executors(),
            native_balance: state.balances.native(),
            token_balance: state.balances.token(),
            used_nonces: state.nonces.len(),
        }
    }
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLedger")
            .field("escrow", &self.escrow)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Transfer, TransferError};
    use crate::authorization::{sign_authorization, AuthorizationMessage};
    use escrow_protocol::crypto::EscrowKeypair;

    struct RefusingSink;

    impl AssetSink for RefusingSink {
        fn settle(&mut self, _batch: &[Transfer]) -> Result<(), TransferError> {
            Err(TransferError::Rejected("frozen".into()))
        }
    }

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn genesis() -> Genesis {
        Genesis {
            escrow: addr(0xee),
            admin: addr(1),
            fund_executors: vec![addr(2)],
        }
    }

    #[test]
    fn ledger_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EscrowLedger>();
    }

    #[test]
    fn zero_admin_genesis_rejected() {
        let g = Genesis {
            admin: Address::ZERO,
            ..genesis()
        };
        assert_eq!(
            EscrowLedger::in_memory(g).unwrap_err(),
            EscrowError::InvalidAdmin
        );
    }

    #[test]
    fn refused_settlement_changes_nothing() {
        let ledger = EscrowLedger::new(genesis(), RefusingSink, FixedCostMeter::new(1, 1)).unwrap();
        let signer = EscrowKeypair::generate();
        ledger.edit_signer(addr(1), signer.address(), true).unwrap();
        ledger.deposit_native(addr(9), 100).unwrap();
        ledger.deposit_token(addr(9), 100).unwrap();

        let msg = AuthorizationMessage::fiat_payment(Nonce::from(1u64), addr(0xee), 2, addr(3), 5, 5);
        let sig = sign_authorization(&signer, &msg).unwrap();
        let err = ledger
            .fund_for_fiat_payment(CallContext::new(addr(2), 2), msg.nonce, 2, addr(3), 5, 5, sig.as_ref())
            .unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Settlement);
        assert!(!ledger.is_nonce_used(&msg.nonce));
        assert_eq!(ledger.native_balance(), 100);
        assert_eq!(ledger.token_balance(), 100);

        let err = ledger.withdraw_native(addr(1), 10).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Settlement);
        assert_eq!(ledger.native_balance(), 100);
    }

    #[test]
    fn snapshot_reflects_state() {
        let (ledger, _book) = EscrowLedger::in_memory(genesis()).unwrap();
        ledger.edit_signer(addr(1), addr(5), true).unwrap();
        ledger.deposit_native(addr(9), 42).unwrap();

        let snap = ledger.snapshot();
        assert_eq!(snap.escrow, addr(0xee));
        assert_eq!(snap.admin, addr(1));
        assert_eq!(snap.signers, vec![addr(5)]);
        assert_eq!(snap.fund_executors, vec![addr(2)]);
        assert_eq!(snap.native_balance, 42);
        assert_eq!(snap.token_balance, 0);
        assert_eq!(snap.used_nonces, 0);
    }

    #[test]
    fn deposit_overflow_rejected() {
        let (ledger, _book) = EscrowLedger::in_memory(genesis()).unwrap();
        ledger.deposit_token(addr(9), u128::MAX).unwrap();
        assert_eq!(
            ledger.deposit_token(addr(9), 1).unwrap_err(),
            EscrowError::AmountOverflow
        );
        assert_eq!(ledger.token_balance(), u128::MAX);
    }
}
