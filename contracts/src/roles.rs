//! # Role Registry
//!
//! Three tiers of authority:
//!
//! - **Admin**: exactly one. Manages the other two sets, hands over its own
//!   seat, and withdraws surplus.
//! - **Signers**: may author funding authorizations off-ledger. They never
//!   call the ledger themselves; their authority is checked by signature
//!   recovery.
//! - **Fund executors**: may submit authorizations and get reimbursed.
//!
//! Membership toggles are idempotent. Adding an existing member or removing
//! an absent one succeeds and changes nothing.

use std::collections::HashSet;
use std::fmt;

use escrow_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// The role an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Signer,
    FundExecutor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Signer => write!(f, "signer"),
            Role::FundExecutor => write!(f, "fund executor"),
        }
    }
}

/// Admin identity plus the signer and fund-executor sets.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    admin: Address,
    signers: HashSet<Address>,
    fund_executors: HashSet<Address>,
}

impl RoleRegistry {
    /// Creates a registry with the given admin and initial fund executors.
    /// Rejects the zero identity as admin.
    pub fn new(
        admin: Address,
        fund_executors: impl IntoIterator<Item = Address>,
    ) -> Result<Self, EscrowError> {
        if admin.is_zero() {
            return Err(EscrowError::InvalidAdmin);
        }
        Ok(Self {
            admin,
            signers: HashSet::new(),
            fund_executors: fund_executors.into_iter().collect(),
        })
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_admin(&self, identity: &Address) -> bool {
        self.admin == *identity
    }

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.signers.contains(identity)
    }

    pub fn is_fund_executor(&self, identity: &Address) -> bool {
        self.fund_executors.contains(identity)
    }

    /// Fails with `Unauthorized` unless `caller` holds `role`.
    pub fn require(&self, caller: &Address, role: Role) -> Result<(), EscrowError> {
        let holds = match role {
            Role::Admin => self.is_admin(caller),
            Role::Signer => self.is_signer(caller),
            Role::FundExecutor => self.is_fund_executor(caller),
        };
        if holds {
            Ok(())
        } else {
            Err(EscrowError::Unauthorized {
                caller: *caller,
                required: role,
            })
        }
    }

    /// Replaces the admin. Admin only; the zero identity is rejected.
    pub fn set_admin(&mut self, caller: &Address, new_admin: Address) -> Result<(), EscrowError> {
        self.require(caller, Role::Admin)?;
        if new_admin.is_zero() {
            return Err(EscrowError::InvalidAdmin);
        }
        self.admin = new_admin;
        Ok(())
    }

    /// Adds or removes a signer. Admin only. Returns whether the set changed.
    pub fn set_signer(
        &mut self,
        caller: &Address,
        identity: Address,
        present: bool,
    ) -> Result<bool, EscrowError> {
        self.require(caller, Role::Admin)?;
        Ok(toggle(&mut self.signers, identity, present))
    }

    /// Adds or removes a fund executor. Admin only. Returns whether the set
    /// changed.
    pub fn set_fund_executor(
        &mut self,
        caller: &Address,
        identity: Address,
        present: bool,
    ) -> Result<bool, EscrowError> {
        self.require(caller, Role::Admin)?;
        Ok(toggle(&mut self.fund_executors, identity, present))
    }

    /// Signers in address order.
    pub fn signers(&self) -> Vec<Address> {
        sorted(&self.signers)
    }

    /// Fund executors in address order.
    pub fn fund_executors(&self) -> Vec<Address> {
        sorted(&self.fund_executors)
    }
}

fn toggle(set: &mut HashSet<Address>, identity: Address, present: bool) -> bool {
    if present {
        set.insert(identity)
    } else {
        set.remove(&identity)
    }
}

fn sorted(set: &HashSet<Address>) -> Vec<Address> {
    let mut out: Vec<Address> = set.iter().copied().collect();
    out.sort();
    out
}
