use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::domain::{Account, AccountNumber, IdentityNumber};

/// Which unique key an insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateField {
    Identity,
    Email,
    Phone,
    AccountNumber,
}

impl DuplicateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateField::Identity => "identity",
            DuplicateField::Email => "email",
            DuplicateField::Phone => "phone",
            DuplicateField::AccountNumber => "account_number",
        }
    }
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of an atomic compare-and-insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    Conflict {
        field: DuplicateField,
        existing: Box<Account>,
    },
}

/// Result of an atomic compare-and-set of an account's KYC tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierUpdate {
    Updated(Account),
    /// The stored tier no longer matched; carries the tier actually stored.
    Stale(u8),
    Missing,
}

/// Storage for provisioned accounts.
///
/// Accounts are keyed by identity number. Email lookups take the normalized
/// email key and phone lookups the normalized phone.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, identity: &IdentityNumber) -> anyhow::Result<Option<Account>>;
    async fn find_by_email(&self, email_key: &str) -> anyhow::Result<Option<Account>>;
    async fn find_by_phone(&self, phone_key: &str) -> anyhow::Result<Option<Account>>;
    async fn find_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> anyhow::Result<Option<Account>>;

    /// Insert or overwrite the account for its identity number.
    async fn set(&self, account: &Account) -> anyhow::Result<()>;

    /// Remove an account. Returns whether one existed.
    async fn delete(&self, identity: &IdentityNumber) -> anyhow::Result<bool>;

    /// Insert only if no existing account shares the identity number, email,
    /// phone or account number. The check and the write are one atomic step.
    async fn compare_and_insert(&self, account: &Account) -> anyhow::Result<InsertOutcome>;

    /// Set the KYC tier to `tier` only if the stored tier is still `expected`.
    async fn compare_and_set_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> anyhow::Result<TierUpdate>;

    async fn count(&self) -> anyhow::Result<usize>;
}
