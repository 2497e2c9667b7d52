use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DocumentKind, EvidenceSet, MissingDocuments};

/// Errors returned when an upgrade request cannot be granted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpgradeError {
    #[error("Invalid target tier {0}")]
    InvalidTarget(u8),

    #[error("Target tier {target} must be higher than current tier {current}")]
    NonProgressive { current: u8, target: u8 },

    #[error("Tier {target} requires {}", join_labels(.missing))]
    MissingEvidence {
        target: u8,
        missing: MissingDocuments,
    },
}

fn join_labels(missing: &MissingDocuments) -> String {
    missing
        .iter()
        .map(|d| d.label())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// How much evidence an upgrade that skips tiers must supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpgradeGating {
    /// Only the target tier's own documents are checked.
    #[default]
    TargetOnly,
    /// Every tier between current (exclusive) and target (inclusive) is checked.
    Cumulative,
}

/// One row of the tier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct TierDefinition {
    pub tier: u8,
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub required_evidence: Vec<DocumentKind>,
    /// Daily limit in naira; `None` means unlimited.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub transaction_limit: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

impl TierDefinition {
    pub fn is_unlimited(&self) -> bool {
        self.transaction_limit.is_none()
    }
}

/// Ordered, immutable table of KYC tiers numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    tiers: Vec<TierDefinition>,
}

impl TierTable {
    /// Build a table from already-validated definitions.
    pub(crate) fn from_definitions(mut tiers: Vec<TierDefinition>) -> Self {
        tiers.sort_by_key(|t| t.tier);
        TierTable { tiers }
    }

    /// The built-in Basic / Standard / Premium table.
    pub fn standard() -> Self {
        let tier = |tier: u8,
                    name: &str,
                    requirements: &[&str],
                    required_evidence: &[DocumentKind],
                    limit: Option<i64>,
                    description: &str| TierDefinition {
            tier,
            name: name.to_string(),
            requirements: requirements.iter().map(|r| r.to_string()).collect(),
            required_evidence: required_evidence.to_vec(),
            transaction_limit: limit.map(|l| Decimal::new(l, 0)),
            description: description.to_string(),
        };

        TierTable::from_definitions(vec![
            tier(
                1,
                "Basic",
                &["Email verification", "NIN verification"],
                &[],
                Some(50_000),
                "₦50,000/day limit",
            ),
            tier(
                2,
                "Standard",
                &["Tier 1 requirements", "Utility bill", "ID card upload"],
                &[DocumentKind::UtilityBill, DocumentKind::IdCard],
                Some(500_000),
                "₦500,000/day limit",
            ),
            tier(
                3,
                "Premium",
                &["Tier 2 requirements", "Proof of address", "Bank statement"],
                &[DocumentKind::ProofOfAddress, DocumentKind::BankStatement],
                None,
                "Unlimited transactions",
            ),
        ])
    }

    pub fn tier_info(&self, tier: u8) -> Option<&TierDefinition> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn tiers(&self) -> &[TierDefinition] {
        &self.tiers
    }

    pub fn highest(&self) -> u8 {
        self.tiers.last().map(|t| t.tier).unwrap_or(0)
    }

    /// Check whether an account at `current` may move to `target` with the
    /// supplied evidence.
    pub fn upgrade(
        &self,
        current: u8,
        target: u8,
        evidence: &EvidenceSet,
        gating: UpgradeGating,
    ) -> Result<&TierDefinition, UpgradeError> {
        let definition = self
            .tier_info(target)
            .ok_or(UpgradeError::InvalidTarget(target))?;

        if target <= current {
            return Err(UpgradeError::NonProgressive { current, target });
        }

        let missing = match gating {
            UpgradeGating::TargetOnly => evidence.missing(&definition.required_evidence),
            UpgradeGating::Cumulative => evidence.missing(
                self.tiers
                    .iter()
                    .filter(|t| t.tier > current && t.tier <= target)
                    .flat_map(|t| t.required_evidence.iter()),
            ),
        };

        if !missing.is_empty() {
            return Err(UpgradeError::MissingEvidence { target, missing });
        }

        Ok(definition)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        TierTable::standard()
    }
}
