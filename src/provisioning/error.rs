use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::{ExistingAccountInfo, IdentityType, MissingDocuments};
use crate::ledger::{DuplicateField, LedgerError};
use crate::registry::LookupError;
use crate::tier::UpgradeError;

/// Every way a KYC operation can fail.
///
/// Each variant carries a stable machine-readable [`code`](Self::code) and
/// maps to one HTTP status. Messages are safe to show to the applicant.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{0}")]
    Validation(String),

    #[error("{identity_type} not found in registry")]
    NotFound { identity_type: IdentityType },

    #[error("This NIN is inactive. Please contact NIMC.")]
    InactiveIdentity,

    #[error("An account already exists with this {}. You cannot create multiple accounts with the same identity.", describe_field(.field))]
    DuplicateAccount {
        field: DuplicateField,
        existing: Box<ExistingAccountInfo>,
    },

    #[error("Identity verification failed. Cannot create account.")]
    IdentityVerificationFailed { reason: String },

    #[error("Identity registry is temporarily unavailable. Please try again.")]
    RegistryUnavailable,

    #[error("The generated account number is already in use.")]
    AccountNumberCollision,

    #[error(transparent)]
    TierUpgrade(#[from] UpgradeError),

    #[error("No account found for this identity number.")]
    AccountNotFound,

    #[error("Tier {0} does not exist.")]
    TierNotFound(u8),

    #[error("Account store is temporarily unavailable. Please try again.")]
    StoreUnavailable,
}

fn describe_field(field: &DuplicateField) -> &'static str {
    match field {
        DuplicateField::Identity => "identity number",
        DuplicateField::Email => "email",
        DuplicateField::Phone => "phone number",
        DuplicateField::AccountNumber => "account number",
    }
}

impl ProvisionError {
    pub fn code(&self) -> &'static str {
        match self {
            ProvisionError::Validation(_) => "VALIDATION_ERROR",
            ProvisionError::NotFound { .. } => "IDENTITY_NOT_FOUND",
            ProvisionError::InactiveIdentity => "IDENTITY_INACTIVE",
            ProvisionError::DuplicateAccount { .. } => "DUPLICATE_ACCOUNT",
            ProvisionError::IdentityVerificationFailed { .. } => "IDENTITY_VERIFICATION_FAILED",
            ProvisionError::RegistryUnavailable => "REGISTRY_UNAVAILABLE",
            ProvisionError::AccountNumberCollision => "ACCOUNT_NUMBER_CONFLICT",
            ProvisionError::TierUpgrade(UpgradeError::InvalidTarget(_)) => "INVALID_TARGET_TIER",
            ProvisionError::TierUpgrade(UpgradeError::NonProgressive { .. }) => {
                "NON_PROGRESSIVE_UPGRADE"
            }
            ProvisionError::TierUpgrade(UpgradeError::MissingEvidence { .. }) => "MISSING_EVIDENCE",
            ProvisionError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ProvisionError::TierNotFound(_) => "TIER_NOT_FOUND",
            ProvisionError::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProvisionError::NotFound { .. }
            | ProvisionError::AccountNotFound
            | ProvisionError::TierNotFound(_) => StatusCode::NOT_FOUND,
            ProvisionError::DuplicateAccount { .. } | ProvisionError::AccountNumberCollision => {
                StatusCode::CONFLICT
            }
            ProvisionError::RegistryUnavailable | ProvisionError::StoreUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ProvisionError::Validation(_)
            | ProvisionError::InactiveIdentity
            | ProvisionError::IdentityVerificationFailed { .. }
            | ProvisionError::TierUpgrade(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProvisionError::RegistryUnavailable | ProvisionError::StoreUnavailable
        )
    }

    pub fn missing_documents(&self) -> Option<&MissingDocuments> {
        match self {
            ProvisionError::TierUpgrade(UpgradeError::MissingEvidence { missing, .. }) => {
                Some(missing)
            }
            _ => None,
        }
    }

    pub fn existing_account(&self) -> Option<&ExistingAccountInfo> {
        match self {
            ProvisionError::DuplicateAccount { existing, .. } => Some(&**existing),
            _ => None,
        }
    }
}

impl From<LedgerError> for ProvisionError {
    fn from(_: LedgerError) -> Self {
        ProvisionError::StoreUnavailable
    }
}

impl From<LookupError> for ProvisionError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound { identity_type } => ProvisionError::NotFound { identity_type },
            LookupError::Inactive(_) => ProvisionError::InactiveIdentity,
            LookupError::Unavailable => ProvisionError::RegistryUnavailable,
        }
    }
}
