use ahash::AHashMap;
use async_trait::async_trait;

use crate::domain::{BvnRecord, IdentityNumber, NinRecord};

use super::traits::IdentityRegistry;

/// Read-only registry held in memory, seeded once at startup.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    nin: AHashMap<IdentityNumber, NinRecord>,
    bvn: AHashMap<IdentityNumber, BvnRecord>,
}

impl StaticRegistry {
    pub fn new(nin_records: Vec<NinRecord>, bvn_records: Vec<BvnRecord>) -> Self {
        StaticRegistry {
            nin: nin_records
                .into_iter()
                .map(|r| (r.nin.clone(), r))
                .collect(),
            bvn: bvn_records
                .into_iter()
                .map(|r| (r.bvn.clone(), r))
                .collect(),
        }
    }

    pub fn nin_count(&self) -> usize {
        self.nin.len()
    }

    pub fn bvn_count(&self) -> usize {
        self.bvn.len()
    }
}

#[async_trait]
impl IdentityRegistry for StaticRegistry {
    async fn find_nin(&self, nin: &IdentityNumber) -> anyhow::Result<Option<NinRecord>> {
        Ok(self.nin.get(nin).cloned())
    }

    async fn find_bvn(&self, bvn: &IdentityNumber) -> anyhow::Result<Option<BvnRecord>> {
        Ok(self.bvn.get(bvn).cloned())
    }

    fn record_count(&self) -> usize {
        self.nin.len() + self.bvn.len()
    }
}
