use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::AccountStatus;
use crate::provisioning::{AccountApplication, ProvisionError, Provisioner, VerifiedIdentity};
use crate::scoring::TrustFactors;

use super::error::ApiError;
use super::request::{
    ApiJson, ApiPath, CheckAccountRequest, TierUpgradeBody, VerifyBvnRequest,
    VerifyIdentityRequest, VerifyLocationRequest, VerifyNinRequest,
};
use super::response::{
    AccountCheckResponse, ApiResponse, BvnVerificationData, CreatedAccountData, ErrorResponse,
    HealthResponse, IdentityVerificationData, LocationData, LocationResponse,
    NinVerificationData, ReadyResponse, TierResponse, TierUpgradeData, TiersResponse,
    TrustScoreResponse, VerificationMetadata,
};

const NIN_SOURCE: &str = "NIMC registry";
const BVN_SOURCE: &str = "BVN registry";

/// Shared application state.
pub struct AppState {
    pub provisioner: Provisioner,

    /// Renders `/metrics`; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,

    pub start_time: Instant,

    pub version: String,

    /// Latency budget in milliseconds for account creation
    pub latency_budget_ms: u64,
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/kyc/verify/nin", post(handle_verify_nin))
        .route("/v1/kyc/verify/bvn", post(handle_verify_bvn))
        .route("/v1/kyc/verify/identity", post(handle_verify_identity))
        .route("/v1/kyc/verify/location", post(handle_verify_location))
        .route("/v1/kyc/accounts/check", post(handle_check_account))
        .route("/v1/kyc/accounts", post(handle_create_account))
        .route("/v1/kyc/trust-score", post(handle_trust_score))
        .route("/v1/kyc/tier/upgrade", post(handle_tier_upgrade))
        .route("/v1/kyc/tiers", get(handle_tiers))
        .route("/v1/kyc/tiers/:tier", get(handle_tier))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn nin_data(record: crate::registry::NinDisclosure) -> NinVerificationData {
    NinVerificationData {
        record,
        verification_metadata: VerificationMetadata::now(NIN_SOURCE),
    }
}

fn bvn_data(record: crate::registry::BvnDisclosure) -> BvnVerificationData {
    BvnVerificationData {
        record,
        verification_metadata: VerificationMetadata::now(BVN_SOURCE),
    }
}

async fn handle_verify_nin(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyNinRequest>,
) -> Result<Json<ApiResponse<NinVerificationData>>, ApiError> {
    let record = state.provisioner.verify_nin(req.nin.as_deref()).await?;

    Ok(Json(ApiResponse::ok(
        "NIN verified successfully!",
        nin_data(record),
    )))
}

async fn handle_verify_bvn(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyBvnRequest>,
) -> Result<Json<ApiResponse<BvnVerificationData>>, ApiError> {
    let record = state.provisioner.verify_bvn(req.bvn.as_deref()).await?;

    Ok(Json(ApiResponse::ok(
        "BVN verified successfully!",
        bvn_data(record),
    )))
}

async fn handle_verify_identity(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyIdentityRequest>,
) -> Result<Json<ApiResponse<IdentityVerificationData>>, ApiError> {
    let verified = state
        .provisioner
        .verify_identity(req.identity_type.as_deref(), req.identity_number.as_deref())
        .await?;

    let response = match verified {
        VerifiedIdentity::Nin(record) => ApiResponse::ok(
            "NIN verified successfully!",
            IdentityVerificationData::Nin(nin_data(record)),
        ),
        VerifiedIdentity::Bvn(record) => ApiResponse::ok(
            "BVN verified successfully!",
            IdentityVerificationData::Bvn(bvn_data(record)),
        ),
    };

    Ok(Json(response))
}

async fn handle_verify_location(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<VerifyLocationRequest>,
) -> Result<Json<LocationResponse>, ApiError> {
    let verdict = state
        .provisioner
        .verify_location(req.latitude, req.longitude)?;

    if !verdict.within_bounds {
        return Err(ApiError::LocationOutOfBounds {
            trust_score_impact: verdict.trust_score_impact,
        });
    }

    Ok(Json(LocationResponse {
        success: true,
        message: "GPS location verified successfully!".to_string(),
        data: LocationData {
            latitude: req.latitude.unwrap_or_default(),
            longitude: req.longitude.unwrap_or_default(),
            address: req
                .address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "Address not provided".to_string()),
            within_bounds: true,
            timestamp: chrono::Utc::now(),
        },
        trust_score_impact: verdict.trust_score_impact,
    }))
}

async fn handle_check_account(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CheckAccountRequest>,
) -> Result<Json<AccountCheckResponse>, ApiError> {
    let account_info = state
        .provisioner
        .check_existing(req.identity_number.as_deref())
        .await?;

    Ok(Json(AccountCheckResponse {
        success: true,
        exists: account_info.is_some(),
        account_info,
    }))
}

async fn handle_create_account(
    State(state): State<Arc<AppState>>,
    ApiJson(application): ApiJson<AccountApplication>,
) -> Result<Json<ApiResponse<CreatedAccountData>>, ApiError> {
    let start = Instant::now();

    let result = state.provisioner.create_account(application).await;

    let elapsed = start.elapsed();
    if elapsed.as_millis() > state.latency_budget_ms as u128 {
        warn!(
            latency_ms = elapsed.as_millis() as u64,
            budget_ms = state.latency_budget_ms,
            "Account creation exceeded latency budget"
        );
    }

    let provisioned = result?;
    let status = provisioned.account.status;

    let (message, next_steps) = match status {
        AccountStatus::Active => (
            "Account created successfully! Your account is now active.",
            ["Access your dashboard", "Make your first transaction"],
        ),
        AccountStatus::PendingReview => (
            "Account created successfully! Your account is under review.",
            ["Upload additional documents", "Complete video verification"],
        ),
    };

    info!(
        reference = %provisioned.attempt_id,
        status = %status,
        latency_ms = elapsed.as_millis() as u64,
        "Account creation completed"
    );

    Ok(Json(
        ApiResponse::ok(message, CreatedAccountData::from(provisioned))
            .with_next_steps(next_steps.iter().map(|s| s.to_string()).collect()),
    ))
}

async fn handle_trust_score(
    State(state): State<Arc<AppState>>,
    ApiJson(factors): ApiJson<TrustFactors>,
) -> Json<TrustScoreResponse> {
    Json(state.provisioner.trust_score(&factors).into())
}

async fn handle_tier_upgrade(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<TierUpgradeBody>,
) -> Result<Json<ApiResponse<TierUpgradeData>>, ApiError> {
    let upgrade = state.provisioner.upgrade_tier(body.into()).await?;

    let new_tier = upgrade.tier.tier;
    let next_step = if new_tier < state.provisioner.tiers().highest() {
        format!("You can upgrade to Tier {} for higher limits", new_tier + 1)
    } else {
        "You have the highest tier with unlimited transactions!".to_string()
    };
    let message = format!("Successfully upgraded to {} tier!", upgrade.tier.name);

    Ok(Json(
        ApiResponse::ok(message, TierUpgradeData::from(upgrade)).with_next_steps(vec![next_step]),
    ))
}

async fn handle_tiers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(TiersResponse {
        success: true,
        data: state.provisioner.tiers().tiers(),
    })
    .into_response()
}

async fn handle_tier(
    State(state): State<Arc<AppState>>,
    ApiPath(tier): ApiPath<u8>,
) -> Result<axum::response::Response, ApiError> {
    let definition = state
        .provisioner
        .tiers()
        .tier_info(tier)
        .ok_or(ProvisionError::TierNotFound(tier))?;

    Ok(Json(TierResponse {
        success: true,
        data: definition,
    })
    .into_response())
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness check endpoint.
async fn handle_ready(State(state): State<Arc<AppState>>) -> axum::response::Response {
    let provisioner = &state.provisioner;
    let tiers = provisioner.tiers().tiers().len();
    let registry_records = provisioner.registry().record_count();

    if tiers == 0 || registry_records == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                "Tier table or identity registry not loaded",
                "NOT_READY",
            )),
        )
            .into_response();
    }

    let accounts = match provisioner.ledger().count().await {
        Ok(n) => n,
        Err(_) => return ProvisionError::StoreUnavailable.into_response(),
    };

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            tiers,
            registry_records,
            accounts,
        }),
    )
        .into_response()
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> axum::response::Response {
    let Some(handle) = &state.metrics else {
        return (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response();
    };

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
        .into_response()
}
