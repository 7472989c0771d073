//! Nonce Registry: the set of consumed authorization identifiers.
//!
//! There is no un-marking path. Once a nonce is in here it stays.

use std::collections::HashSet;

use escrow_protocol::Nonce;

use crate::error::EscrowError;

#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    used: HashSet<Nonce>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_used(&self, nonce: &Nonce) -> bool {
        self.used.contains(nonce)
    }

    pub fn ensure_unused(&self, nonce: &Nonce) -> Result<(), EscrowError> {
        if self.is_used(nonce) {
            Err(EscrowError::NonceAlreadyUsed(*nonce))
        } else {
            Ok(())
        }
    }

    /// Records `nonce` as consumed. Fails if it already was.
    pub fn mark_used(&mut self, nonce: Nonce) -> Result<(), EscrowError> {
        if self.used.insert(nonce) {
            Ok(())
        } else {
            Err(EscrowError::NonceAlreadyUsed(nonce))
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
