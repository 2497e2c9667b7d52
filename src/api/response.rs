use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{AccountNumber, AccountStatus, ExistingAccountInfo, IdentityType};
use crate::provisioning::{ProvisionedAccount, TierUpgrade, TrustAssessment};
use crate::registry::{BvnDisclosure, NinDisclosure};
use crate::scoring::TrustFactors;
use crate::tier::TierDefinition;

/// Success envelope shared by the KYC routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data,
            next_steps: None,
        }
    }

    pub fn with_next_steps(mut self, steps: Vec<String>) -> Self {
        self.next_steps = Some(steps);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMetadata {
    pub source: &'static str,
    pub verified_at: DateTime<Utc>,
}

impl VerificationMetadata {
    pub fn now(source: &'static str) -> Self {
        VerificationMetadata {
            source,
            verified_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NinVerificationData {
    #[serde(flatten)]
    pub record: NinDisclosure,
    pub verification_metadata: VerificationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BvnVerificationData {
    #[serde(flatten)]
    pub record: BvnDisclosure,
    pub verification_metadata: VerificationMetadata,
}

/// Either verification payload, for the type-dispatching route.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum IdentityVerificationData {
    Nin(NinVerificationData),
    Bvn(BvnVerificationData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub within_bounds: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub success: bool,
    pub message: String,
    pub data: LocationData,
    #[serde(with = "rust_decimal::serde::float")]
    pub trust_score_impact: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCheckResponse {
    pub success: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_info: Option<ExistingAccountInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSummary {
    pub current: u8,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub transaction_limit: Option<Decimal>,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub dob: NaiveDate,
    pub identity_type: IdentityType,
    pub identity_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccountData {
    pub account_number: AccountNumber,
    pub account_status: AccountStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub trust_score: Decimal,
    pub kyc_tier: TierSummary,
    pub user: UserSummary,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub activation_time: Option<DateTime<Utc>>,
}

impl From<ProvisionedAccount> for CreatedAccountData {
    fn from(p: ProvisionedAccount) -> Self {
        let applicant = p.applicant;
        CreatedAccountData {
            activation_time: p
                .account
                .status
                .is_active()
                .then_some(p.account.created_at),
            account_number: p.account.account_number,
            account_status: p.account.status,
            trust_score: p.trust_score,
            kyc_tier: TierSummary {
                current: p.account.kyc_tier,
                name: p.tier.name,
                transaction_limit: p.tier.transaction_limit,
                description: p.tier.description,
            },
            user: UserSummary {
                first_name: applicant.first_name,
                last_name: applicant.last_name,
                email: applicant.email,
                phone: applicant.phone,
                address: applicant.address,
                dob: applicant.dob,
                identity_type: applicant.identity_type,
                identity_number: applicant.identity_number,
            },
            reference: p.attempt_id.to_string(),
            created_at: p.account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustScoreResponse {
    pub success: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub trust_score: Decimal,
    pub recommendation: &'static str,
    pub factors: TrustFactors,
}

impl From<TrustAssessment> for TrustScoreResponse {
    fn from(a: TrustAssessment) -> Self {
        TrustScoreResponse {
            success: true,
            trust_score: a.trust_score,
            recommendation: a.recommendation.describe(),
            factors: a.factors,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierUpgradeData {
    pub previous_tier: u8,
    pub new_tier: u8,
    pub tier_name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub transaction_limit: Option<Decimal>,
    pub description: String,
    pub requirements: Vec<String>,
    pub persisted: bool,
    pub upgraded_at: DateTime<Utc>,
}

impl From<TierUpgrade> for TierUpgradeData {
    fn from(u: TierUpgrade) -> Self {
        TierUpgradeData {
            previous_tier: u.previous_tier,
            new_tier: u.tier.tier,
            tier_name: u.tier.name,
            transaction_limit: u.tier.transaction_limit,
            description: u.tier.description,
            requirements: u.tier.requirements,
            persisted: u.persisted,
            upgraded_at: u.upgraded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TiersResponse<'a> {
    pub success: bool,
    pub data: &'a [TierDefinition],
}

#[derive(Debug, Serialize)]
pub struct TierResponse<'a> {
    pub success: bool,
    pub data: &'a TierDefinition,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub tiers: usize,
    pub registry_records: usize,
    pub accounts: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_account_info: Option<ExistingAccountInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_documents: Option<Vec<&'static str>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub trust_score_impact: Option<Decimal>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        ErrorResponse {
            success: false,
            code: code.into(),
            message: message.into(),
            existing_account_info: None,
            missing_documents: None,
            trust_score_impact: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Recommendation;

    #[test]
    fn test_trust_score_response_serialization() {
        let resp = TrustScoreResponse::from(TrustAssessment {
            trust_score: Decimal::new(80, 2),
            recommendation: Recommendation::AutoApprove,
            factors: TrustFactors {
                nin_verified: true,
                ..Default::default()
            },
        });

        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["trustScore"], 0.8);
        assert_eq!(json["recommendation"], "Auto-approve");
        assert_eq!(json["factors"]["ninVerified"], true);
    }

    #[test]
    fn test_error_response_omits_empty_fields() {
        let json = serde_json::to_value(ErrorResponse::new("nope", "VALIDATION_ERROR")).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json.get("missingDocuments").is_none());
        assert!(json.get("trustScoreImpact").is_none());
    }
}
