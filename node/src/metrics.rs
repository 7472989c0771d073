//! # Prometheus Metrics
//!
//! Exposes operational metrics for the escrow node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with the
//! `escrow` prefix so they do not collide with any default global registry
//! consumers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use escrow_contracts::assets::Asset;
use escrow_contracts::funding::{FundingFlow, FundingReceipt};
use escrow_contracts::ErrorKind;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Successful fundings, labelled by flow.
    pub fundings_total: IntCounterVec,
    /// Rejected operations, labelled by error kind.
    pub rejections_total: IntCounterVec,
    /// Successful withdrawals, labelled by asset.
    pub withdrawals_total: IntCounterVec,
    /// Successful deposits, labelled by asset.
    pub deposits_total: IntCounterVec,
    /// Native balance paid out to fund executors as reimbursement.
    pub reimbursed_native_total: IntCounter,
    /// Escrow native balance after the last mutation.
    pub native_balance: Gauge,
    /// Escrow token balance after the last mutation.
    pub token_balance: Gauge,
    /// Histogram of funding submission latency in seconds.
    pub funding_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("escrow".into()), None)?;

        let fundings_total = IntCounterVec::new(
            Opts::new("fundings_total", "Total number of successful fundings"),
            &["flow"],
        )?;
        registry.register(Box::new(fundings_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Total number of rejected operations"),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let withdrawals_total = IntCounterVec::new(
            Opts::new("withdrawals_total", "Total number of admin withdrawals"),
            &["asset"],
        )?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let deposits_total = IntCounterVec::new(
            Opts::new("deposits_total", "Total number of deposits into the escrow"),
            &["asset"],
        )?;
        registry.register(Box::new(deposits_total.clone()))?;

        let reimbursed_native_total = IntCounter::new(
            "reimbursed_native_total",
            "Native balance reimbursed to fund executors",
        )?;
        registry.register(Box::new(reimbursed_native_total.clone()))?;

        let native_balance = Gauge::new("native_balance", "Current escrow native balance")?;
        registry.register(Box::new(native_balance.clone()))?;

        let token_balance = Gauge::new("token_balance", "Current escrow token balance")?;
        registry.register(Box::new(token_balance.clone()))?;

        let funding_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "funding_latency_seconds",
                "Funding submission processing latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
            ]),
        )?;
        registry.register(Box::new(funding_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            fundings_total,
            rejections_total,
            withdrawals_total,
            deposits_total,
            reimbursed_native_total,
            native_balance,
            token_balance,
            funding_latency_seconds,
        })
    }

    pub fn record_funding(&self, receipt: &FundingReceipt) {
        self.fundings_total
            .with_label_values(&[receipt.flow.as_str()])
            .inc();
        self.reimbursed_native_total
            .inc_by(u64::try_from(receipt.reimbursement).unwrap_or(u64::MAX));
    }

    pub fn record_rejection(&self, kind: ErrorKind) {
        self.rejections_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn record_withdrawal(&self, asset: Asset) {
        self.withdrawals_total
            .with_label_values(&[asset_label(asset)])
            .inc();
    }

    pub fn record_deposit(&self, asset: Asset) {
        self.deposits_total
            .with_label_values(&[asset_label(asset)])
            .inc();
    }

    /// Gauges are `f64`; very large balances lose precision, which is fine
    /// for dashboards.
    pub fn set_balances(&self, native: u128, token: u128) {
        self.native_balance.set(native as f64);
        self.token_balance.set(token as f64);
    }

    /// Touches every labelled series so a fresh node exports zeros instead of
    /// nothing.
    pub fn prime(&self) {
        for flow in [FundingFlow::FiatPayment, FundingFlow::RelayedPayment] {
            self.fundings_total.with_label_values(&[flow.as_str()]);
        }
        for kind in ErrorKind::ALL {
            self.rejections_total.with_label_values(&[kind.as_str()]);
        }
        for asset in [Asset::Native, Asset::Token] {
            self.withdrawals_total.with_label_values(&[asset_label(asset)]);
            self.deposits_total.with_label_values(&[asset_label(asset)]);
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn asset_label(asset: Asset) -> &'static str {
    match asset {
        Asset::Native => "native",
        Asset::Token => "token",
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
