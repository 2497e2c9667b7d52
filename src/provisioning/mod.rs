pub mod account_number;
pub mod error;
pub mod orchestrator;

pub use error::ProvisionError;
pub use orchestrator::{
    AccountApplication, ApplicantSummary, ProvisionedAccount, Provisioner, TierUpgrade,
    TrustAssessment, UpgradeRequest, VerifiedIdentity,
};
