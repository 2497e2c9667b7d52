//! Identity registry adapter.
//!
//! Wraps an [`IdentityRegistry`] backend with a lookup timeout and turns
//! backend answers into typed failures the orchestrator can act on.

pub mod loader;
pub mod masking;
pub mod memory;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{IdentityNumber, IdentityRecord, IdentityType, NinRecord};
use crate::observability::metrics;

pub use loader::{load_registry, parse_registry, RegistryLoadError};
pub use masking::{mask_by_access_level, BvnDisclosure, NinDisclosure};
pub use memory::StaticRegistry;
pub use traits::IdentityRegistry;

/// Why a lookup did not produce a usable record.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{identity_type} not found in registry")]
    NotFound { identity_type: IdentityType },

    /// The record exists but the registrar has deactivated it.
    #[error("NIN record is inactive")]
    Inactive(Box<NinRecord>),

    /// Timed out or the backend failed; the caller may retry.
    #[error("identity registry unavailable")]
    Unavailable,
}

impl LookupError {
    fn outcome(&self) -> &'static str {
        match self {
            LookupError::NotFound { .. } => "not_found",
            LookupError::Inactive(_) => "inactive",
            LookupError::Unavailable => "unavailable",
        }
    }
}

#[derive(Clone)]
pub struct RegistryAdapter {
    registry: Arc<dyn IdentityRegistry>,
    timeout: Duration,
}

impl RegistryAdapter {
    pub fn new(registry: Arc<dyn IdentityRegistry>, timeout: Duration) -> Self {
        RegistryAdapter { registry, timeout }
    }

    pub fn record_count(&self) -> usize {
        self.registry.record_count()
    }

    /// Look up an identity, rejecting unknown and inactive records.
    pub async fn lookup(
        &self,
        identity_type: IdentityType,
        number: &IdentityNumber,
    ) -> Result<IdentityRecord, LookupError> {
        let result = self.fetch(identity_type, number).await;

        let outcome = match &result {
            Ok(_) => "found",
            Err(e) => e.outcome(),
        };
        metrics::record_identity_lookup(identity_type, outcome);
        debug!(
            identity_type = %identity_type,
            identity = %number.masked(),
            outcome,
            "Registry lookup"
        );

        result
    }

    async fn fetch(
        &self,
        identity_type: IdentityType,
        number: &IdentityNumber,
    ) -> Result<IdentityRecord, LookupError> {
        let query = async {
            match identity_type {
                IdentityType::Nin => self
                    .registry
                    .find_nin(number)
                    .await
                    .map(|r| r.map(IdentityRecord::Nin)),
                IdentityType::Bvn => self
                    .registry
                    .find_bvn(number)
                    .await
                    .map(|r| r.map(IdentityRecord::Bvn)),
            }
        };

        let found = match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(error = %e, identity_type = %identity_type, "Registry backend error");
                return Err(LookupError::Unavailable);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    identity_type = %identity_type,
                    "Registry lookup timed out"
                );
                return Err(LookupError::Unavailable);
            }
        };

        match found {
            None => Err(LookupError::NotFound { identity_type }),
            Some(IdentityRecord::Nin(record)) if !record.is_active() => {
                Err(LookupError::Inactive(Box::new(record)))
            }
            Some(record) => Ok(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BvnRecord;
    use async_trait::async_trait;

    struct SlowRegistry(Duration);

    #[async_trait]
    impl IdentityRegistry for SlowRegistry {
        async fn find_nin(&self, _nin: &IdentityNumber) -> anyhow::Result<Option<NinRecord>> {
            tokio::time::sleep(self.0).await;
            Ok(None)
        }

        async fn find_bvn(&self, _bvn: &IdentityNumber) -> anyhow::Result<Option<BvnRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }

        fn record_count(&self) -> usize {
            0
        }
    }

    fn demo_adapter() -> RegistryAdapter {
        RegistryAdapter::new(
            Arc::new(loader::demo_registry()),
            Duration::from_millis(500),
        )
    }

    fn number(raw: &str) -> IdentityNumber {
        IdentityNumber::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_active_nin() {
        let adapter = demo_adapter();

        let record = adapter
            .lookup(IdentityType::Nin, &number("12345678901"))
            .await
            .unwrap();

        assert_eq!(record.identity_type(), IdentityType::Nin);
        assert_eq!(record.number().as_str(), "12345678901");
        assert_eq!(
            record.dob(),
            chrono::NaiveDate::from_ymd_opt(1995, 3, 15)
        );
    }

    #[tokio::test]
    async fn test_lookup_is_idempotent() {
        let adapter = demo_adapter();
        let nin = number("23456789012");

        let first = adapter.lookup(IdentityType::Nin, &nin).await.unwrap();
        let second = adapter.lookup(IdentityType::Nin, &nin).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_inactive_nin_is_rejected() {
        let adapter = demo_adapter();

        let err = adapter
            .lookup(IdentityType::Nin, &number("45678901234"))
            .await
            .unwrap_err();

        match err {
            LookupError::Inactive(record) => {
                assert_eq!(record.demographics.last_name, "Doe");
            }
            other => panic!("expected Inactive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_numbers_are_not_found() {
        let adapter = demo_adapter();

        let err = adapter
            .lookup(IdentityType::Nin, &number("99999999999"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LookupError::NotFound {
                identity_type: IdentityType::Nin
            }
        ));

        // A NIN presented as a BVN is looked up in the BVN table only
        let err = adapter
            .lookup(IdentityType::Bvn, &number("12345678901"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bvn_lookup() {
        let adapter = demo_adapter();

        let record = adapter
            .lookup(IdentityType::Bvn, &number("42345678901"))
            .await
            .unwrap();

        match record {
            IdentityRecord::Bvn(bvn) => assert_eq!(bvn.bank_name, "GTBank"),
            other => panic!("expected BVN record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_unavailable() {
        let adapter = RegistryAdapter::new(
            Arc::new(SlowRegistry(Duration::from_secs(5))),
            Duration::from_millis(20),
        );

        let err = adapter
            .lookup(IdentityType::Nin, &number("12345678901"))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Unavailable));
    }

    #[tokio::test]
    async fn test_backend_error_maps_to_unavailable() {
        let adapter = RegistryAdapter::new(
            Arc::new(SlowRegistry(Duration::ZERO)),
            Duration::from_millis(100),
        );

        let err = adapter
            .lookup(IdentityType::Bvn, &number("22345678901"))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Unavailable));
    }
}
