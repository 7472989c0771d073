//! # CLI Interface
//!
//! Defines the command-line argument structure for `escrow-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use escrow_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};
use escrow_protocol::Address;
use std::path::PathBuf;

/// Escrow relay node.
///
/// Hosts a single escrow ledger, serves its operations over a REST API and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "escrow-node",
    about = "Escrow relay ledger node",
    version,
    propagate_version = true
)]
pub struct EscrowNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the escrow node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Write a template configuration file.
    Init(InitArgs),
    /// Query the status of a running node via its API endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    #[arg(long, short = 'c', env = "ESCROW_CONFIG", default_value = "escrow.toml")]
    pub config: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "ESCROW_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ESCROW_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(long, short = 'o', default_value = "escrow.toml")]
    pub output: PathBuf,

    /// The escrow's own address.
    #[arg(long)]
    pub escrow: Address,

    /// The initial admin.
    #[arg(long)]
    pub admin: Address,

    /// Initial fund executor. Repeat for several.
    #[arg(long = "fund-executor")]
    pub fund_executors: Vec<Address>,

    /// Initial signer. Repeat for several.
    #[arg(long = "signer")]
    pub signers: Vec<Address>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:8645")]
    pub api_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        EscrowNodeCli::command().debug_assert();
    }

    #[test]
    fn init_collects_repeated_roles() {
        let cli = EscrowNodeCli::try_parse_from([
            "escrow-node",
            "init",
            "--escrow",
            "0x00000000000000000000000000000000000e5c70",
            "--admin",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "--signer",
            "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
            "--fund-executor",
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "--fund-executor",
            "0x90f79bf6eb2c4f870365e785982e1f101e93b906",
        ])
        .unwrap();
        match cli.command {
            Commands::Init(args) => {
                assert_eq!(args.fund_executors.len(), 2);
                assert_eq!(args.signers.len(), 1);
                assert!(!args.force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn init_rejects_bad_address() {
        let res = EscrowNodeCli::try_parse_from([
            "escrow-node",
            "init",
            "--escrow",
            "0x1234",
            "--admin",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        ]);
        assert!(res.is_err());
    }
}
