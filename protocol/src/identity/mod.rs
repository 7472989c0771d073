//! # Identity
//!
//! Every participant in the escrow relay (admin, signer, fund executor,
//! recipient, and the escrow itself) is named by an [`Address`]. The ledger
//! never looks inside one; it only compares them.

pub mod address;

pub use address::{Address, AddressError};
