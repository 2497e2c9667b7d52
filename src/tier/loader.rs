use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::policy::{TierDefinition, TierTable};

/// Errors that can occur while loading a tier table.
#[derive(Error, Debug)]
pub enum TierLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize)]
struct TierFile {
    tiers: Vec<TierDefinition>,
}

/// Load a tier table from a YAML file.
pub fn load_tiers(path: impl AsRef<Path>) -> Result<TierTable, TierLoadError> {
    let content = fs::read_to_string(path)?;
    parse_tiers(&content)
}

/// Parse and validate a tier table from YAML text.
pub fn parse_tiers(content: &str) -> Result<TierTable, TierLoadError> {
    let file: TierFile = serde_yaml::from_str(content)?;

    validate_tiers(&file.tiers)?;

    Ok(TierTable::from_definitions(file.tiers))
}

/// Tiers must be 1..N with no gaps or repeats, and every tier needs a name.
fn validate_tiers(tiers: &[TierDefinition]) -> Result<(), TierLoadError> {
    if tiers.is_empty() {
        return Err(TierLoadError::Validation(
            "Tier table cannot be empty".to_string(),
        ));
    }

    let mut numbers: Vec<u8> = tiers.iter().map(|t| t.tier).collect();
    numbers.sort_unstable();

    for (expected, actual) in (1u8..).zip(numbers.iter().copied()) {
        if actual < expected {
            return Err(TierLoadError::Validation(format!(
                "Duplicate tier number: {}",
                actual
            )));
        }
        if actual > expected {
            return Err(TierLoadError::Validation(format!(
                "Tiers must be numbered contiguously from 1, missing tier {}",
                expected
            )));
        }
    }

    if let Some(unnamed) = tiers.iter().find(|t| t.name.trim().is_empty()) {
        return Err(TierLoadError::Validation(format!(
            "Tier {} has no name",
            unnamed.tier
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentKind;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bundled_table_matches_standard() {
        let table = parse_tiers(include_str!("../../data/tiers.yaml")).unwrap();

        assert_eq!(table, TierTable::standard());
    }

    #[test]
    fn test_load_tiers_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
tiers:
  - tier: 2
    name: Plus
    required_evidence: [id_card]
    transaction_limit: 250000.50
  - tier: 1
    name: Starter
    transaction_limit: 10000
"#
        )
        .unwrap();

        let table = load_tiers(file.path()).unwrap();

        assert_eq!(table.tiers()[0].name, "Starter");
        let plus = table.tier_info(2).unwrap();
        assert_eq!(plus.required_evidence, vec![DocumentKind::IdCard]);
        assert_eq!(plus.transaction_limit, Some(Decimal::new(25_000_050, 2)));
    }

    #[test]
    fn test_rejects_gaps() {
        let result = parse_tiers(
            r#"
tiers:
  - tier: 1
    name: Basic
  - tier: 3
    name: Premium
"#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("missing tier 2"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = parse_tiers(
            r#"
tiers:
  - tier: 1
    name: Basic
  - tier: 1
    name: Again
"#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_rejects_unnamed_and_empty() {
        let unnamed = parse_tiers(
            r#"
tiers:
  - tier: 1
    name: "  "
"#,
        );
        assert!(unnamed.unwrap_err().to_string().contains("no name"));

        let empty = parse_tiers("tiers: []");
        assert!(matches!(empty, Err(TierLoadError::Validation(_))));
    }

    #[test]
    fn test_rejects_unknown_document() {
        let result = parse_tiers(
            r#"
tiers:
  - tier: 1
    name: Basic
    required_evidence: [passport]
"#,
        );

        assert!(matches!(result, Err(TierLoadError::Yaml(_))));
    }
}
