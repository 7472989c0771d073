//! Balance Ledger: the escrow's own native and token counters.
//!
//! Both counters are unsigned and every mutation is checked, so neither can
//! go negative or wrap.

use serde::{Deserialize, Serialize};

use crate::assets::Asset;
use crate::error::EscrowError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    native: u128,
    token: u128,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn native(&self) -> u128 {
        self.native
    }

    pub fn token(&self) -> u128 {
        self.token
    }

    pub fn available(&self, asset: Asset) -> u128 {
        match asset {
            Asset::Native => self.native,
            Asset::Token => self.token,
        }
    }

    /// Fails with `InsufficientFunds` if `required` exceeds the balance.
    pub fn ensure_covers(&self, asset: Asset, required: u128) -> Result<(), EscrowError> {
        let available = self.available(asset);
        if available < required {
            return Err(EscrowError::InsufficientFunds {
                asset,
                available,
                required,
            });
        }
        Ok(())
    }

    /// Adds `amount`, returning the new balance.
    pub fn credit(&mut self, asset: Asset, amount: u128) -> Result<u128, EscrowError> {
        let slot = self.slot(asset);
        *slot = slot.checked_add(amount).ok_or(EscrowError::AmountOverflow)?;
        Ok(*slot)
    }

    /// Removes `amount`, returning the new balance.
    pub fn debit(&mut self, asset: Asset, amount: u128) -> Result<u128, EscrowError> {
        self.ensure_covers(asset, amount)?;
        let slot = self.slot(asset);
        *slot -= amount;
        Ok(*slot)
    }

    fn slot(&mut self, asset: Asset) -> &mut u128 {
        match asset {
            Asset::Native => &mut self.native,
            Asset::Token => &mut self.token,
        }
    }
}
