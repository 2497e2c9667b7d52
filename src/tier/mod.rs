pub mod loader;
pub mod policy;

pub use loader::{load_tiers, parse_tiers, TierLoadError};
pub use policy::{TierDefinition, TierTable, UpgradeError, UpgradeGating};
