//! Duplicate-prevention ledger.
//!
//! The ledger is the only writer of accounts. Callers see absence as `None`;
//! backend failures surface as [`LedgerError::Backend`].

pub mod journal;
pub mod memory;
pub mod postgres;
pub mod traits;

use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::domain::account::{normalize_email, normalize_phone};
use crate::domain::{Account, IdentityNumber};

pub use journal::{JournalError, JournaledStore, ReplayStats};
pub use memory::MemoryAccountStore;
pub use postgres::PostgresAccountStore;
pub use traits::{AccountStore, DuplicateField, InsertOutcome, TierUpdate};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account store unavailable")]
    Backend(#[source] anyhow::Error),
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %e, "Account store failure");
        LedgerError::Backend(e)
    }
}

#[derive(Clone)]
pub struct AccountLedger {
    store: Arc<dyn AccountStore>,
}

impl AccountLedger {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        AccountLedger { store }
    }

    /// Ledger over a fresh in-memory store.
    pub fn in_memory() -> Self {
        AccountLedger::new(Arc::new(MemoryAccountStore::new()))
    }

    pub async fn exists(&self, identity: &IdentityNumber) -> Result<Option<Account>, LedgerError> {
        Ok(self.store.get(identity).await?)
    }

    /// Match on the trimmed, lowercased email.
    pub async fn exists_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.store.find_by_email(&normalize_email(email)).await?)
    }

    /// Match on the phone with whitespace, hyphens and parentheses removed.
    pub async fn exists_by_phone(&self, phone: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.store.find_by_phone(&normalize_phone(phone)).await?)
    }

    /// Upsert by identity number.
    pub async fn store(&self, account: &Account) -> Result<(), LedgerError> {
        Ok(self.store.set(account).await?)
    }

    pub async fn insert_unique(&self, account: &Account) -> Result<InsertOutcome, LedgerError> {
        Ok(self.store.compare_and_insert(account).await?)
    }

    /// Persist a new KYC tier if the stored tier is still `expected`. The
    /// check and the write are one atomic step in every store.
    pub async fn set_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> Result<TierUpdate, LedgerError> {
        Ok(self.store.compare_and_set_tier(identity, expected, tier).await?)
    }

    pub async fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.store.count().await?)
    }
}
