//! # REST API
//!
//! Builds the axum router that exposes the escrow ledger over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! The node behaves like a development chain with unlocked accounts: each
//! mutating request names the identity it acts as in a `from` field, and
//! funding requests also carry the execution unit price they are processed
//! at.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                    |
//! |--------|-----------------------------|--------------------------------|
//! | GET    | `/health`                   | Liveness check                 |
//! | GET    | `/status`                   | Ledger snapshot                |
//! | GET    | `/signers/:address`         | Signer membership              |
//! | GET    | `/fund-executors/:address`  | Fund executor membership       |
//! | GET    | `/nonces/:nonce`            | Whether a nonce is consumed    |
//! | GET    | `/holdings/:address`        | Settled holdings of a party    |
//! | POST   | `/fund/fiat`                | Fiat-payment funding           |
//! | POST   | `/fund/relayed`             | Relayed-payment funding        |
//! | POST   | `/admin/signers`            | Add or remove a signer         |
//! | POST   | `/admin/fund-executors`     | Add or remove a fund executor  |
//! | POST   | `/admin/admin`              | Hand over the admin role       |
//! | POST   | `/withdraw/native`          | Admin native withdrawal        |
//! | POST   | `/withdraw/token`           | Admin token withdrawal         |
//! | POST   | `/deposit/native`           | Native deposit                 |
//! | POST   | `/deposit/token`            | Token deposit                  |
//! | POST   | `/recover`                  | Recover the signer of a hash   |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use escrow_contracts::assets::{Asset, AssetBook};
use escrow_contracts::funding::{FundingReceipt, FundingRequest};
use escrow_contracts::{CallContext, ErrorKind, EscrowError, EscrowLedger, LedgerSnapshot};
use escrow_protocol::config::HASH_OUTPUT_LENGTH;
use escrow_protocol::{amount, Address, Nonce};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub ledger: Arc<EscrowLedger>,
    /// The settlement book the ledger pays into.
    pub book: AssetBook,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    fn refresh_balances(&self) {
        self.metrics
            .set_balances(self.ledger.native_balance(), self.ledger.token_balance());
    }

    fn reject(&self, operation: &'static str, err: EscrowError) -> ApiError {
        self.metrics.record_rejection(err.kind());
        tracing::warn!(operation, kind = %err.kind(), error = %err, "operation rejected");
        ApiError::Ledger(err)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/signers/:address", get(signer_handler))
        .route("/fund-executors/:address", get(fund_executor_handler))
        .route("/nonces/:nonce", get(nonce_handler))
        .route("/holdings/:address", get(holdings_handler))
        .route("/fund/fiat", post(fund_fiat_handler))
        .route("/fund/relayed", post(fund_relayed_handler))
        .route("/admin/signers", post(edit_signer_handler))
        .route("/admin/fund-executors", post(edit_fund_executor_handler))
        .route("/admin/admin", post(edit_admin_handler))
        .route("/withdraw/native", post(withdraw_native_handler))
        .route("/withdraw/token", post(withdraw_token_handler))
        .route("/deposit/native", post(deposit_native_handler))
        .route("/deposit/token", post(deposit_token_handler))
        .route("/recover", post(recover_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// The ledger refused the operation.
    Ledger(EscrowError),
    /// The request itself could not be understood.
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err.kind() {
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::NonceAlreadyUsed => StatusCode::CONFLICT,
                ErrorKind::InvalidAuthorization => StatusCode::UNAUTHORIZED,
                ErrorKind::PriceMismatch | ErrorKind::InsufficientFunds => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ErrorKind::MalformedSignature
                | ErrorKind::InvalidAdmin
                | ErrorKind::AmountOverflow => StatusCode::BAD_REQUEST,
                ErrorKind::Settlement => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Ledger(err) => ErrorResponse {
                error: err.to_string(),
                kind: err.kind().to_string(),
            },
            ApiError::BadRequest(msg) => ErrorResponse {
                error: msg,
                kind: "bad_request".into(),
            },
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// A `u128` amount accepted as a JSON number or decimal string.
#[derive(Debug, Clone, Copy)]
pub struct Amount(pub u128);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        amount::deserialize(deserializer).map(Amount)
    }
}

/// Body of `POST /fund/fiat` and `POST /fund/relayed`.
#[derive(Debug, Deserialize)]
pub struct FundBody {
    /// The submitting fund executor.
    pub from: Address,
    /// Price the submission is processed at. Defaults to `unit_price`.
    #[serde(default)]
    pub execution_unit_price: Option<Amount>,
    pub nonce: Nonce,
    /// The unit price the signer approved.
    pub unit_price: Amount,
    pub recipient: Address,
    pub native_amount: Amount,
    /// Ignored by the relayed flow.
    #[serde(default)]
    pub token_amount: Option<Amount>,
    /// Hex-encoded 65-byte recoverable signature.
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct EditRoleBody {
    pub from: Address,
    pub identity: Address,
    pub present: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditAdminBody {
    pub from: Address,
    pub new_admin: Address,
}

#[derive(Debug, Deserialize)]
pub struct AmountBody {
    pub from: Address,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct RecoverBody {
    /// Hex-encoded 32-byte hash.
    pub hash: String,
    pub signature: String,
}

/// Response for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub ledger: LedgerSnapshot,
    /// Current server time (RFC 3339).
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub address: Address,
    pub member: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: Nonce,
    pub used: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleEditResponse {
    pub identity: Address,
    pub present: bool,
    /// False when the identity already had the requested membership.
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecoverResponse {
    pub signer: Address,
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address {:?}: {}", raw, e)))
}

fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>, ApiError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits).map_err(|e| ApiError::BadRequest(format!("invalid {} hex: {}", field, e)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: the ledger snapshot plus node metadata.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: state.version.clone(),
        ledger: state.ledger.snapshot(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn signer_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<MembershipResponse> {
    let address = parse_address(&address)?;
    Ok(Json(MembershipResponse {
        address,
        member: state.ledger.is_signer(&address),
    }))
}

async fn fund_executor_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<MembershipResponse> {
    let address = parse_address(&address)?;
    Ok(Json(MembershipResponse {
        address,
        member: state.ledger.is_fund_executor(&address),
    }))
}

/// `GET /nonces/:nonce`: accepts decimal or `0x`-prefixed hex.
async fn nonce_handler(
    Path(nonce): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<NonceResponse> {
    let nonce: Nonce = nonce
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid nonce {:?}: {}", nonce, e)))?;
    Ok(Json(NonceResponse {
        nonce,
        used: state.ledger.is_nonce_used(&nonce),
    }))
}

/// `GET /holdings/:address`: what the escrow has paid out to a party.
async fn holdings_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<serde_json::Value> {
    let address = parse_address(&address)?;
    let holdings = state.book.holdings_of(&address);
    Ok(Json(serde_json::json!({
        "address": address,
        "native": holdings.native.to_string(),
        "token": holdings.token.to_string(),
    })))
}

async fn fund_fiat_handler(
    State(state): State<AppState>,
    body: Result<Json<FundBody>, JsonRejection>,
) -> ApiResult<FundingReceipt> {
    let Json(body) = body?;
    let request = FundingRequest::fiat(
        body.nonce,
        body.unit_price.0,
        body.recipient,
        body.native_amount.0,
        body.token_amount.map(|a| a.0).unwrap_or(0),
    );
    submit(&state, &body, request)
}

async fn fund_relayed_handler(
    State(state): State<AppState>,
    body: Result<Json<FundBody>, JsonRejection>,
) -> ApiResult<FundingReceipt> {
    let Json(body) = body?;
    let request = FundingRequest::relayed(
        body.nonce,
        body.unit_price.0,
        body.recipient,
        body.native_amount.0,
    );
    submit(&state, &body, request)
}

fn submit(state: &AppState, body: &FundBody, request: FundingRequest) -> ApiResult<FundingReceipt> {
    let signature = decode_hex("signature", &body.signature)?;
    let execution_price = body
        .execution_unit_price
        .map(|a| a.0)
        .unwrap_or(request.unit_price);
    let call = CallContext::new(body.from, execution_price);

    let timer = state.metrics.funding_latency_seconds.start_timer();
    let result = state.ledger.submit_funding(call, &request, &signature);
    timer.observe_duration();

    let receipt = result.map_err(|e| state.reject(request.flow.as_str(), e))?;
    state.metrics.record_funding(&receipt);
    state.refresh_balances();
    tracing::info!(
        flow = %receipt.flow,
        nonce = %receipt.nonce,
        caller = %receipt.executor,
        signer = %receipt.signer,
        recipient = %receipt.recipient,
        reimbursement = %receipt.reimbursement,
        "funding applied"
    );
    Ok(Json(receipt))
}

async fn edit_signer_handler(
    State(state): State<AppState>,
    body: Result<Json<EditRoleBody>, JsonRejection>,
) -> ApiResult<RoleEditResponse> {
    let Json(body) = body?;
    let changed = state
        .ledger
        .edit_signer(body.from, body.identity, body.present)
        .map_err(|e| state.reject("edit_signer", e))?;
    tracing::info!(caller = %body.from, identity = %body.identity, present = body.present, changed, "signer edited");
    Ok(Json(RoleEditResponse {
        identity: body.identity,
        present: body.present,
        changed,
    }))
}

async fn edit_fund_executor_handler(
    State(state): State<AppState>,
    body: Result<Json<EditRoleBody>, JsonRejection>,
) -> ApiResult<RoleEditResponse> {
    let Json(body) = body?;
    let changed = state
        .ledger
        .edit_fund_executor(body.from, body.identity, body.present)
        .map_err(|e| state.reject("edit_fund_executor", e))?;
    tracing::info!(caller = %body.from, identity = %body.identity, present = body.present, changed, "fund executor edited");
    Ok(Json(RoleEditResponse {
        identity: body.identity,
        present: body.present,
        changed,
    }))
}

async fn edit_admin_handler(
    State(state): State<AppState>,
    body: Result<Json<EditAdminBody>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(body) = body?;
    state
        .ledger
        .edit_admin(body.from, body.new_admin)
        .map_err(|e| state.reject("edit_admin", e))?;
    tracing::info!(caller = %body.from, new_admin = %body.new_admin, "admin handed over");
    Ok(Json(serde_json::json!({ "admin": body.new_admin })))
}

async fn withdraw_native_handler(
    State(state): State<AppState>,
    body: Result<Json<AmountBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    withdraw(&state, Asset::Native, body?.0)
}

async fn withdraw_token_handler(
    State(state): State<AppState>,
    body: Result<Json<AmountBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    withdraw(&state, Asset::Token, body?.0)
}

fn withdraw(state: &AppState, asset: Asset, body: AmountBody) -> Result<Response, ApiError> {
    let result = match asset {
        Asset::Native => state.ledger.withdraw_native(body.from, body.amount.0),
        Asset::Token => state.ledger.withdraw_token(body.from, body.amount.0),
    };
    let receipt = result.map_err(|e| state.reject("withdraw", e))?;
    state.metrics.record_withdrawal(asset);
    state.refresh_balances();
    tracing::info!(asset = %asset, amount = %receipt.amount, to = %receipt.to, "withdrawal applied");
    Ok(Json(receipt).into_response())
}

async fn deposit_native_handler(
    State(state): State<AppState>,
    body: Result<Json<AmountBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    deposit(&state, Asset::Native, body?.0)
}

async fn deposit_token_handler(
    State(state): State<AppState>,
    body: Result<Json<AmountBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    deposit(&state, Asset::Token, body?.0)
}

fn deposit(state: &AppState, asset: Asset, body: AmountBody) -> Result<Response, ApiError> {
    let result = match asset {
        Asset::Native => state.ledger.deposit_native(body.from, body.amount.0),
        Asset::Token => state.ledger.deposit_token(body.from, body.amount.0),
    };
    let receipt = result.map_err(|e| state.reject("deposit", e))?;
    state.metrics.record_deposit(asset);
    state.refresh_balances();
    tracing::info!(asset = %asset, amount = %receipt.amount, from = %receipt.from, "deposit applied");
    Ok(Json(receipt).into_response())
}

/// `POST /recover`: signer of an arbitrary 32-byte hash under the
/// signed-message convention. Touches no ledger state.
async fn recover_handler(
    State(state): State<AppState>,
    body: Result<Json<RecoverBody>, JsonRejection>,
) -> ApiResult<RecoverResponse> {
    let Json(body) = body?;
    let hash = decode_hex("hash", &body.hash)?;
    let hash: [u8; HASH_OUTPUT_LENGTH] = hash.as_slice().try_into().map_err(|_| {
        ApiError::BadRequest(format!(
            "hash must be {} bytes, got {}",
            HASH_OUTPUT_LENGTH,
            hash.len()
        ))
    })?;
    let signature = decode_hex("signature", &body.signature)?;
    let signer = state
        .ledger
        .get_signer(&hash, &signature)
        .map_err(|e| state.reject("recover", e))?;
    Ok(Json(RecoverResponse { signer }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
