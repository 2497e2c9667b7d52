use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::domain::EvidenceSet;
use crate::provisioning::UpgradeRequest;

use super::error::ApiError;

/// JSON body extractor whose rejection renders as an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection renders as an [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyNinRequest {
    pub nin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyBvnRequest {
    pub bvn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyIdentityRequest {
    pub identity_type: Option<String>,
    pub identity_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyLocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckAccountRequest {
    pub identity_number: Option<String>,
}

/// Tier upgrade body. Document fields accept any JSON value; upload
/// references and flags both count as present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TierUpgradeBody {
    pub identity_number: Option<String>,
    pub current_tier: Option<u8>,
    pub target_tier: Option<u8>,
    pub utility_bill: Option<serde_json::Value>,
    pub id_card: Option<serde_json::Value>,
    pub proof_of_address: Option<serde_json::Value>,
    pub bank_statement: Option<serde_json::Value>,
}

fn supplied(value: &Option<serde_json::Value>) -> bool {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

impl From<TierUpgradeBody> for UpgradeRequest {
    fn from(body: TierUpgradeBody) -> Self {
        let evidence = EvidenceSet {
            utility_bill: supplied(&body.utility_bill),
            id_card: supplied(&body.id_card),
            proof_of_address: supplied(&body.proof_of_address),
            bank_statement: supplied(&body.bank_statement),
        };

        UpgradeRequest {
            identity_number: body.identity_number,
            current_tier: body.current_tier,
            target_tier: body.target_tier,
            evidence,
        }
    }
}
