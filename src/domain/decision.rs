use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recommendation derived from a trust score.
///
/// Ordered by how much further verification is needed, least first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Recommendation {
    /// Score is high enough to activate without a human
    AutoApprove = 0,
    /// A reviewer should look at the application
    ManualReview = 1,
    /// The applicant must supply more evidence
    AdditionalVerification = 2,
}

impl Recommendation {
    /// Human-readable recommendation text.
    pub fn describe(&self) -> &'static str {
        match self {
            Recommendation::AutoApprove => "Auto-approve",
            Recommendation::ManualReview => "Manual review recommended",
            Recommendation::AdditionalVerification => "Additional verification required",
        }
    }

    /// Account status a new account receives under this recommendation.
    #[inline]
    pub fn account_status(&self) -> AccountStatus {
        match self {
            Recommendation::AutoApprove => AccountStatus::Active,
            _ => AccountStatus::PendingReview,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::AutoApprove => write!(f, "auto-approve"),
            Recommendation::ManualReview => write!(f, "manual-review"),
            Recommendation::AdditionalVerification => write!(f, "additional-verification"),
        }
    }
}

/// Status an account is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    PendingReview,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::PendingReview => "pending_review",
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        *self == AccountStatus::Active
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "pending_review" => Ok(AccountStatus::PendingReview),
            other => Err(format!("unknown account status '{}'", other)),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
