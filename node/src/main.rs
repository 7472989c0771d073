// Copyright (c) 2026 Escrow Relay Contributors. MIT License.
// See LICENSE for details.

//! # Escrow Node
//!
//! Entry point for the `escrow-node` binary. Parses CLI arguments, loads the
//! configuration, builds the ledger, and serves the REST API and metrics.
//!
//! The binary supports four subcommands:
//!
//! - `run`: start the node
//! - `init`: write a template configuration file
//! - `status`: query a running node's status endpoint
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::signal;

use cli::{Commands, EscrowNodeCli};
use config::NodeConfig;
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = EscrowNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_config(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the configuration, bootstraps the ledger and serves until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let config = NodeConfig::load(&args.config)?;
    logging::init_logging(&config.logging.level, config.logging.format);

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        config = %args.config.display(),
        escrow = %config.escrow.address,
        admin = %config.escrow.admin,
        "starting escrow-node"
    );

    // --- Ledger ---
    let (ledger, book) = config.bootstrap()?;
    let snapshot = ledger.snapshot();
    tracing::info!(
        signers = snapshot.signers.len(),
        fund_executors = snapshot.fund_executors.len(),
        native_balance = %snapshot.native_balance,
        token_balance = %snapshot.token_balance,
        "ledger bootstrapped"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.prime();
    node_metrics.set_balances(snapshot.native_balance, snapshot.token_balance);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            escrow_protocol::config::PROTOCOL_VERSION,
        ),
        ledger: Arc::new(ledger),
        book,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("escrow-node stopped");
    Ok(())
}

/// Writes a template configuration for the given escrow and roles.
fn init_config(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("escrow_node=info", LogFormat::Pretty);

    if args.output.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }

    let mut config = NodeConfig::new(args.escrow, args.admin);
    config.escrow.fund_executors = args.fund_executors;
    config.escrow.signers = args.signers;
    config.validate()?;

    let rendered = config.to_toml()?;
    std::fs::write(&args.output, rendered)
        .with_context(|| format!("failed to write config to {}", args.output.display()))?;

    tracing::info!(path = %args.output.display(), "configuration written");

    println!("Configuration written.");
    println!("  File            : {}", args.output.display());
    println!("  Escrow          : {}", config.escrow.address);
    println!("  Admin           : {}", config.escrow.admin);
    println!("  Fund executors  : {}", config.escrow.fund_executors.len());
    println!("  Signers         : {}", config.escrow.signers.len());

    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.api_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP/1.1 GET over a raw TCP stream. Returns the response body.
async fn http_get(url: &str) -> Result<String> {
    let target = HttpTarget::parse(url)?;
    let addr = format!("{}:{}", target.host, target.port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target.path, target.host,
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let (head, body) = response
        .split_once("\r\n\r\n")
        .unwrap_or((&*response, ""));
    if !head.starts_with("HTTP/1.1 200") && !head.starts_with("HTTP/1.0 200") {
        let status_line = head.lines().next().unwrap_or("no status line");
        bail!("{} returned {}", url, status_line);
    }
    Ok(body.to_string())
}

/// Host, port and path of a plain `http://` URL.
#[derive(Debug, PartialEq, Eq)]
struct HttpTarget {
    host: String,
    port: u16,
    path: String,
}

impl HttpTarget {
    fn parse(url: &str) -> Result<Self> {
        if url.starts_with("https://") {
            bail!("https is not supported: {}", url);
        }
        let rest = url.strip_prefix("http://").unwrap_or(url);
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>()
                    .with_context(|| format!("bad port in {}", url))?,
            ),
            None => (authority, 80),
        };
        if host.is_empty() {
            bail!("missing host in {}", url);
        }
        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("escrow-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", escrow_protocol::config::PROTOCOL_VERSION);
    println!("signing     {}", escrow_protocol::config::SIGNING_ALGORITHM);
    println!("hash        {}", escrow_protocol::config::PRIMARY_HASH_FUNCTION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_http_targets() {
        assert_eq!(
            HttpTarget::parse("http://127.0.0.1:8645/status").unwrap(),
            HttpTarget {
                host: "127.0.0.1".into(),
                port: 8645,
                path: "/status".into(),
            }
        );
        let bare = HttpTarget::parse("localhost").unwrap();
        assert_eq!(bare.port, 80);
        assert_eq!(bare.path, "/");
    }

    #[test]
    fn reject_bad_targets() {
        assert!(HttpTarget::parse("https://node.example/status").is_err());
        assert!(HttpTarget::parse("http://host:notaport/").is_err());
        assert!(HttpTarget::parse("http://:8645/").is_err());
    }

    #[test]
    fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("escrow.toml");
        let args = cli::InitArgs {
            output: output.clone(),
            escrow: "0x00000000000000000000000000000000000e5c70".parse().unwrap(),
            admin: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap(),
            fund_executors: vec!["0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()],
            signers: vec![],
            force: false,
        };
        init_config(args).unwrap();

        let config = NodeConfig::load(&output).unwrap();
        assert_eq!(config.escrow.fund_executors.len(), 1);

        let again = cli::InitArgs {
            output,
            escrow: config.escrow.address,
            admin: config.escrow.admin,
            fund_executors: vec![],
            signers: vec![],
            force: false,
        };
        assert!(init_config(again).is_err());
    }

    #[tokio::test]
    async fn status_round_trip_over_tcp() {
        let config = NodeConfig::new(
            "0x00000000000000000000000000000000000e5c70".parse().unwrap(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap(),
        );
        let (ledger, book) = config.bootstrap().unwrap();
        let state = api::AppState {
            version: "test".into(),
            ledger: Arc::new(ledger),
            book,
            metrics: Arc::new(NodeMetrics::new().unwrap()),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, api::create_router(state)).await.unwrap();
        });

        let body = http_get(&format!("http://{}/status", addr)).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["version"], "test");

        assert!(http_get(&format!("http://{}/missing", addr)).await.is_err());
        server.abort();
    }
}
