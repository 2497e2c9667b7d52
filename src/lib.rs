pub mod api;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod observability;
pub mod provisioning;
pub mod registry;
pub mod scoring;
pub mod tier;

pub use config::Config;
pub use domain::{Account, AccountStatus, IdentityType, Recommendation};
pub use provisioning::{ProvisionError, Provisioner};
