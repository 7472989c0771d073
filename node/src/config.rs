//! # Node Configuration
//!
//! The node is configured from a single TOML file:
//!
//! ```toml
//! [escrow]
//! address = "0x00000000000000000000000000000000000e5c70"
//! admin = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//! fund_executors = ["0x70997970c51812dc3a010c7d01b50e0d17dc79c8"]
//! signers = ["0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"]
//!
//! [deposits]
//! native = "1000000000000000000"
//! token = 0
//!
//! [metering]
//! fiat_payment_units = 95000
//! relayed_payment_units = 60000
//!
//! [logging]
//! level = "escrow_node=info,tower_http=info"
//! format = "pretty"
//! ```
//!
//! Amounts accept either TOML integers or decimal strings, since TOML
//! integers stop at `i64::MAX` and balances do not.

use std::path::Path;

use anyhow::{bail, Context, Result};
use escrow_contracts::assets::AssetBook;
use escrow_contracts::metering::FixedCostMeter;
use escrow_contracts::{EscrowLedger, Genesis};
use escrow_protocol::config::{DEFAULT_FIAT_PAYMENT_UNITS, DEFAULT_RELAYED_PAYMENT_UNITS};
use escrow_protocol::{amount, Address};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub escrow: EscrowSection,
    #[serde(default)]
    pub deposits: DepositsSection,
    #[serde(default)]
    pub metering: MeteringSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSection {
    /// The escrow's own identity, bound into every authorization.
    pub address: Address,
    pub admin: Address,
    #[serde(default)]
    pub fund_executors: Vec<Address>,
    #[serde(default)]
    pub signers: Vec<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositsSection {
    #[serde(default, with = "amount")]
    pub native: u128,
    #[serde(default, with = "amount")]
    pub token: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteringSection {
    pub fiat_payment_units: u64,
    pub relayed_payment_units: u64,
}

impl Default for MeteringSection {
    fn default() -> Self {
        Self {
            fiat_payment_units: DEFAULT_FIAT_PAYMENT_UNITS,
            relayed_payment_units: DEFAULT_RELAYED_PAYMENT_UNITS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "escrow_node=info,tower_http=info".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl NodeConfig {
    /// A minimal configuration for the given escrow and admin.
    pub fn new(escrow: Address, admin: Address) -> Self {
        Self {
            escrow: EscrowSection {
                address: escrow,
                admin,
                fund_executors: Vec::new(),
                signers: Vec::new(),
            },
            deposits: DepositsSection::default(),
            metering: MeteringSection::default(),
            logging: LoggingSection::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: NodeConfig = toml::from_str(raw).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.escrow.address.is_zero() {
            bail!("escrow.address must not be the zero address");
        }
        if self.escrow.admin.is_zero() {
            bail!("escrow.admin must not be the zero address");
        }
        Ok(())
    }

    pub fn genesis(&self) -> Genesis {
        Genesis {
            escrow: self.escrow.address,
            admin: self.escrow.admin,
            fund_executors: self.escrow.fund_executors.clone(),
        }
    }

    pub fn meter(&self) -> FixedCostMeter {
        FixedCostMeter::new(
            self.metering.fiat_payment_units,
            self.metering.relayed_payment_units,
        )
    }

    /// Builds the ledger described by this config: genesis roles, then the
    /// configured signers (added by the admin), then the initial deposits.
    pub fn bootstrap(&self) -> Result<(EscrowLedger, AssetBook)> {
        let book = AssetBook::new();
        let ledger = EscrowLedger::new(self.genesis(), book.clone(), self.meter())
            .context("failed to create ledger from genesis")?;

        let admin = self.escrow.admin;
        for signer in &self.escrow.signers {
            ledger
                .edit_signer(admin, *signer, true)
                .with_context(|| format!("failed to register signer {}", signer))?;
        }
        if self.deposits.native > 0 {
            ledger
                .deposit_native(admin, self.deposits.native)
                .context("failed to apply initial native deposit")?;
        }
        if self.deposits.token > 0 {
            ledger
                .deposit_token(admin, self.deposits.token)
                .context("failed to apply initial token deposit")?;
        }

        Ok((ledger, book))
    }
}
