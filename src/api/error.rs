use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::provisioning::ProvisionError;

use super::response::ErrorResponse;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// The body was not valid JSON for the route.
    #[error("malformed request body")]
    MalformedRequest(#[from] JsonRejection),

    #[error("malformed path parameter")]
    MalformedPath(#[from] PathRejection),

    #[error("Location outside of Nigeria. GPS verification failed.")]
    LocationOutOfBounds { trust_score_impact: Decimal },
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Provision(e) => e.code(),
            ApiError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ApiError::MalformedPath(_) => "MALFORMED_PATH",
            ApiError::LocationOutOfBounds { .. } => "LOCATION_OUT_OF_BOUNDS",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Provision(e) => e.status_code(),
            ApiError::MalformedRequest(_)
            | ApiError::MalformedPath(_)
            | ApiError::LocationOutOfBounds { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ErrorResponse::new(self.to_string(), self.code());

        match &self {
            ApiError::Provision(e) => {
                body.existing_account_info = e.existing_account().cloned();
                body.missing_documents = e
                    .missing_documents()
                    .map(|docs| docs.iter().map(|d| d.label()).collect());
            }
            ApiError::MalformedRequest(rejection) => {
                // Parser detail stays in the logs
                debug!(error = %rejection, "Rejected malformed request body");
                body.message = "Request body is not valid JSON for this endpoint.".to_string();
            }
            ApiError::MalformedPath(rejection) => {
                debug!(error = %rejection, "Rejected malformed path parameter");
                body.message = "Path parameter is not valid for this endpoint.".to_string();
            }
            ApiError::LocationOutOfBounds { trust_score_impact } => {
                body.trust_score_impact = Some(*trust_score_impact);
            }
        }

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ProvisionError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentKind, MissingDocuments};
    use crate::tier::UpgradeError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_evidence_body() {
        let err = ApiError::from(ProvisionError::from(UpgradeError::MissingEvidence {
            target: 2,
            missing: MissingDocuments::from_slice(&[
                DocumentKind::UtilityBill,
                DocumentKind::IdCard,
            ]),
        }));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "MISSING_EVIDENCE");
        assert_eq!(json["missingDocuments"][0], "Utility bill");
        assert_eq!(json["missingDocuments"][1], "ID card");
        assert!(json.get("existingAccountInfo").is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_generic() {
        let response = ProvisionError::StoreUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["code"], "STORE_UNAVAILABLE");
        assert_eq!(
            json["message"],
            "Account store is temporarily unavailable. Please try again."
        );
    }

    #[tokio::test]
    async fn test_location_body_carries_impact() {
        let response = ApiError::LocationOutOfBounds {
            trust_score_impact: Decimal::new(-10, 2),
        }
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["code"], "LOCATION_OUT_OF_BOUNDS");
        assert_eq!(json["trustScoreImpact"], -0.1);
    }
}
