use ahash::AHashSet;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::domain::{BvnRecord, NinRecord};

use super::memory::StaticRegistry;

/// Errors that can occur while loading the identity registry seed.
#[derive(Error, Debug)]
pub enum RegistryLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// On-disk shape of the registry seed file.
#[derive(Debug, Default, Deserialize)]
struct RegistrySeed {
    #[serde(default)]
    nin_records: Vec<NinRecord>,
    #[serde(default)]
    bvn_records: Vec<BvnRecord>,
}

/// Load a registry from a YAML seed file.
pub fn load_registry(path: impl AsRef<Path>) -> Result<StaticRegistry, RegistryLoadError> {
    let content = fs::read_to_string(path)?;
    parse_registry(&content)
}

/// Parse a registry from YAML text.
pub fn parse_registry(content: &str) -> Result<StaticRegistry, RegistryLoadError> {
    let seed: RegistrySeed = serde_yaml::from_str(content)?;

    validate_seed(&seed)?;

    Ok(StaticRegistry::new(seed.nin_records, seed.bvn_records))
}

fn validate_seed(seed: &RegistrySeed) -> Result<(), RegistryLoadError> {
    let mut seen = AHashSet::new();
    for record in &seed.nin_records {
        if !seen.insert(record.nin.as_str()) {
            return Err(RegistryLoadError::Validation(format!(
                "Duplicate NIN record: {}",
                record.nin.masked()
            )));
        }
        if record.demographics.first_name.trim().is_empty() {
            return Err(RegistryLoadError::Validation(format!(
                "NIN record {} has no first name",
                record.nin.masked()
            )));
        }
    }

    seen.clear();
    for record in &seed.bvn_records {
        if !seen.insert(record.bvn.as_str()) {
            return Err(RegistryLoadError::Validation(format!(
                "Duplicate BVN record: {}",
                record.bvn.masked()
            )));
        }
    }

    Ok(())
}

/// The bundled demo registry.
#[cfg(test)]
pub fn demo_registry() -> StaticRegistry {
    parse_registry(include_str!("../../data/registry.yaml")).unwrap()
}
