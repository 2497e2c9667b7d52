use async_trait::async_trait;

use crate::domain::{BvnRecord, IdentityNumber, NinRecord};

/// Source of authoritative identity records.
///
/// In production this is a registrar behind the network; implementations
/// return `Ok(None)` for unknown numbers and reserve `Err` for the backend
/// itself failing.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Fetch a NIN record by exact number.
    async fn find_nin(&self, nin: &IdentityNumber) -> anyhow::Result<Option<NinRecord>>;

    /// Fetch a BVN record by exact number.
    async fn find_bvn(&self, bvn: &IdentityNumber) -> anyhow::Result<Option<BvnRecord>>;

    /// Number of records held, for readiness reporting.
    fn record_count(&self) -> usize;
}
