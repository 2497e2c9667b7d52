use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Account, AccountNumber, IdentityNumber};

use super::traits::{AccountStore, DuplicateField, InsertOutcome, TierUpdate};

/// Accounts plus secondary indexes. Every index maps back to the identity
/// number, and all four are updated together.
#[derive(Debug, Default)]
pub(crate) struct AccountIndex {
    by_identity: AHashMap<IdentityNumber, Account>,
    by_email: AHashMap<String, IdentityNumber>,
    by_phone: AHashMap<String, IdentityNumber>,
    by_number: AHashMap<AccountNumber, IdentityNumber>,
}

impl AccountIndex {
    pub(crate) fn get(&self, identity: &IdentityNumber) -> Option<&Account> {
        self.by_identity.get(identity)
    }

    pub(crate) fn find_by_email(&self, email_key: &str) -> Option<&Account> {
        self.by_email
            .get(email_key)
            .and_then(|id| self.by_identity.get(id))
    }

    pub(crate) fn find_by_phone(&self, phone_key: &str) -> Option<&Account> {
        self.by_phone
            .get(phone_key)
            .and_then(|id| self.by_identity.get(id))
    }

    pub(crate) fn find_by_account_number(&self, number: &AccountNumber) -> Option<&Account> {
        self.by_number
            .get(number)
            .and_then(|id| self.by_identity.get(id))
    }

    /// First unique key `account` would collide on, checked in the order
    /// identity, email, phone, account number.
    pub(crate) fn conflict(&self, account: &Account) -> Option<(DuplicateField, &Account)> {
        if let Some(existing) = self.get(&account.identity_number) {
            return Some((DuplicateField::Identity, existing));
        }
        if let Some(existing) = self.find_by_email(&account.email_key()) {
            return Some((DuplicateField::Email, existing));
        }
        if let Some(existing) = self.find_by_phone(&account.phone_key()) {
            return Some((DuplicateField::Phone, existing));
        }
        if let Some(existing) = self.find_by_account_number(&account.account_number) {
            return Some((DuplicateField::AccountNumber, existing));
        }
        None
    }

    /// Upsert by identity number, replacing any stale secondary keys.
    pub(crate) fn upsert(&mut self, account: Account) {
        self.remove(&account.identity_number);

        let id = account.identity_number.clone();
        self.by_email.insert(account.email_key(), id.clone());
        self.by_phone.insert(account.phone_key(), id.clone());
        self.by_number
            .insert(account.account_number.clone(), id.clone());
        self.by_identity.insert(id, account);
    }

    pub(crate) fn remove(&mut self, identity: &IdentityNumber) -> Option<Account> {
        let account = self.by_identity.remove(identity)?;

        // Only drop index entries that still point at this identity
        if self.by_email.get(&account.email_key()) == Some(identity) {
            self.by_email.remove(&account.email_key());
        }
        if self.by_phone.get(&account.phone_key()) == Some(identity) {
            self.by_phone.remove(&account.phone_key());
        }
        if self.by_number.get(&account.account_number) == Some(identity) {
            self.by_number.remove(&account.account_number);
        }

        Some(account)
    }

    pub(crate) fn insert_if_unique(&mut self, account: &Account) -> InsertOutcome {
        if let Some((field, existing)) = self.conflict(account) {
            return InsertOutcome::Conflict {
                field,
                existing: Box::new(existing.clone()),
            };
        }
        self.upsert(account.clone());
        InsertOutcome::Inserted
    }

    /// Apply a tier change if the stored tier equals `expected`.
    pub(crate) fn update_tier(
        &mut self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> TierUpdate {
        match self.prepare_tier(identity, expected, tier) {
            TierUpdate::Updated(account) => {
                self.upsert(account.clone());
                TierUpdate::Updated(account)
            }
            other => other,
        }
    }

    /// The account as it would look after a tier change, without applying it.
    pub(crate) fn prepare_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> TierUpdate {
        match self.get(identity) {
            None => TierUpdate::Missing,
            Some(existing) if existing.kyc_tier != expected => TierUpdate::Stale(existing.kyc_tier),
            Some(existing) => {
                let mut account = existing.clone();
                account.kyc_tier = tier;
                account.updated_at = chrono::Utc::now();
                TierUpdate::Updated(account)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_identity.len()
    }
}

/// In-memory account store. Lookups never fail.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: RwLock<AccountIndex>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, identity: &IdentityNumber) -> anyhow::Result<Option<Account>> {
        Ok(self.inner.read().get(identity).cloned())
    }

    async fn find_by_email(&self, email_key: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.inner.read().find_by_email(email_key).cloned())
    }

    async fn find_by_phone(&self, phone_key: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.inner.read().find_by_phone(phone_key).cloned())
    }

    async fn find_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self.inner.read().find_by_account_number(number).cloned())
    }

    async fn set(&self, account: &Account) -> anyhow::Result<()> {
        self.inner.write().upsert(account.clone());
        Ok(())
    }

    async fn delete(&self, identity: &IdentityNumber) -> anyhow::Result<bool> {
        Ok(self.inner.write().remove(identity).is_some())
    }

    async fn compare_and_insert(&self, account: &Account) -> anyhow::Result<InsertOutcome> {
        Ok(self.inner.write().insert_if_unique(account))
    }

    async fn compare_and_set_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> anyhow::Result<TierUpdate> {
        Ok(self.inner.write().update_tier(identity, expected, tier))
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.inner.read().len())
    }
}
