//! Execution cost metering.
//!
//! The reimbursement a fund executor receives is `units_consumed * unit_price`,
//! where the unit price is the one the signer approved. The meter only
//! answers the first half.

use escrow_protocol::config::{DEFAULT_FIAT_PAYMENT_UNITS, DEFAULT_RELAYED_PAYMENT_UNITS};
use serde::{Deserialize, Serialize};

use crate::funding::FundingFlow;

/// Reports how many execution units a funding flow consumes.
pub trait CostMeter: Send + Sync {
    fn units_consumed(&self, flow: FundingFlow) -> u64;
}

/// A meter with a fixed unit count per flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCostMeter {
    pub fiat_payment_units: u64,
    pub relayed_payment_units: u64,
}

impl FixedCostMeter {
    pub fn new(fiat_payment_units: u64, relayed_payment_units: u64) -> Self {
        Self {
            fiat_payment_units,
            relayed_payment_units,
        }
    }
}

impl Default for FixedCostMeter {
    fn default() -> Self {
        Self::new(DEFAULT_FIAT_PAYMENT_UNITS, DEFAULT_RELAYED_PAYMENT_UNITS)
    }
}

impl CostMeter for FixedCostMeter {
    fn units_consumed(&self, flow: FundingFlow) -> u64 {
        match flow {
            FundingFlow::FiatPayment => self.fiat_payment_units,
            FundingFlow::RelayedPayment => self.relayed_payment_units,
        }
    }
}
