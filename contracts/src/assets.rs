//! # Asset Transfers
//!
//! The ledger decides *what* moves; an [`AssetSink`] is what actually moves
//! it. Every funding and withdrawal hands the sink one batch of transfers,
//! and the sink must settle the whole batch or none of it.
//!
//! [`AssetBook`] is the in-memory reference sink: a holdings table keyed by
//! recipient. Clones share the same table, so a host can keep a handle for
//! queries while the ledger owns another for settlement.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use escrow_protocol::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two asset classes the escrow holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The chain's native balance.
    Native,
    /// The fungible token the escrow is configured with.
    Token,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token => write!(f, "token"),
        }
    }
}

/// One outgoing transfer from the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: Asset,
    pub to: Address,
    pub amount: u128,
}

impl Transfer {
    pub fn native(to: Address, amount: u128) -> Self {
        Self {
            asset: Asset::Native,
            to,
            amount,
        }
    }

    pub fn token(to: Address, amount: u128) -> Self {
        Self {
            asset: Asset::Token,
            to,
            amount,
        }
    }
}

/// Errors a sink may raise while settling a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Crediting the recipient would overflow its holdings.
    #[error("{asset} holdings of {to} would overflow")]
    Overflow { to: Address, asset: Asset },

    /// The sink refused the batch for its own reasons.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Settles transfer batches atomically.
pub trait AssetSink: Send {
    /// Apply every transfer in `batch`, or none of them.
    fn settle(&mut self, batch: &[Transfer]) -> Result<(), TransferError>;
}

/// Per-identity holdings recorded by an [`AssetBook`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holdings {
    pub native: u128,
    pub token: u128,
}

impl Holdings {
    pub fn of(&self, asset: Asset) -> u128 {
        match asset {
            Asset::Native => self.native,
            Asset::Token => self.token,
        }
    }

    fn slot(&mut self, asset: Asset) -> &mut u128 {
        match asset {
            Asset::Native => &mut self.native,
            Asset::Token => &mut self.token,
        }
    }
}

/// In-memory holdings table. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct AssetBook {
    holdings: Arc<RwLock<HashMap<Address, Holdings>>>,
}

impl AssetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings_of(&self, identity: &Address) -> Holdings {
        self.holdings
            .read()
            .get(identity)
            .copied()
            .unwrap_or_default()
    }

    pub fn balance_of(&self, identity: &Address, asset: Asset) -> u128 {
        self.holdings_of(identity).of(asset)
    }

    /// Number of identities that have ever received anything.
    pub fn account_count(&self) -> usize {
        self.holdings.read().len()
    }
}

impl AssetSink for AssetBook {
    fn settle(&mut self, batch: &[Transfer]) -> Result<(), TransferError> {
        let mut table = self.holdings.write();

        // Stage every credit first; only touch the table once all of them fit.
        let mut staged: HashMap<Address, Holdings> = HashMap::new();
        for transfer in batch {
            let entry = staged
                .entry(transfer.to)
                .or_insert_with(|| table.get(&transfer.to).copied().unwrap_or_default());
            let slot = entry.slot(transfer.asset);
            *slot = slot
                .checked_add(transfer.amount)
                .ok_or(TransferError::Overflow {
                    to: transfer.to,
                    asset: transfer.asset,
                })?;
        }

        table.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn settle_credits_each_recipient() {
        let mut book = AssetBook::new();
        book.settle(&[
            Transfer::native(addr(1), 5),
            Transfer::token(addr(1), 7),
            Transfer::native(addr(2), 3),
            Transfer::native(addr(1), 1),
        ])
        .unwrap();

        assert_eq!(
            book.holdings_of(&addr(1)),
            Holdings {
                native: 6,
                token: 7
            }
        );
        assert_eq!(book.balance_of(&addr(2), Asset::Native), 3);
        assert_eq!(book.account_count(), 2);
    }

    #[test]
    fn clones_share_the_table() {
        let book = AssetBook::new();
        let mut handle = book.clone();
        handle.settle(&[Transfer::token(addr(4), 10)]).unwrap();
        assert_eq!(book.balance_of(&addr(4), Asset::Token), 10);
    }

    #[test]
    fn overflow_rejects_the_whole_batch() {
        let mut book = AssetBook::new();
        book.settle(&[Transfer::native(addr(1), u128::MAX)]).unwrap();

        let err = book
            .settle(&[Transfer::native(addr(2), 9), Transfer::native(addr(1), 1)])
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::Overflow {
                to: addr(1),
                asset: Asset::Native
            }
        );
        // The first transfer of the failed batch did not land.
        assert_eq!(book.balance_of(&addr(2), Asset::Native), 0);
        assert_eq!(book.balance_of(&addr(1), Asset::Native), u128::MAX);
    }

    #[test]
    fn unknown_identity_holds_nothing() {
        let book = AssetBook::new();
        assert_eq!(book.holdings_of(&addr(9)), Holdings::default());
    }
}
