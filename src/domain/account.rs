use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::decision::AccountStatus;
use super::identity::{IdentityNumber, IdentityType};

/// Twelve-digit account number issued at provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(pub String);

impl AccountNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup key for email uniqueness: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lookup key for phone uniqueness: whitespace, hyphens and parentheses removed.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Mask an email for display to someone who may not own it (`ch***@example.com`).
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{}***@{}", visible, domain)
        }
        None => "***".to_string(),
    }
}

/// Mask a phone number, keeping the last four digits.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

/// A provisioned account. Keyed by identity number in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub identity_type: IdentityType,
    pub identity_number: IdentityNumber,
    pub email: String,
    /// Stored in normalized form
    pub phone: String,
    pub status: AccountStatus,
    pub kyc_tier: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new tier-1 account stamped with the current time.
    pub fn new(
        account_number: AccountNumber,
        identity_type: IdentityType,
        identity_number: IdentityNumber,
        email: impl Into<String>,
        phone: &str,
        status: AccountStatus,
    ) -> Self {
        let now = Utc::now();
        Account {
            account_number,
            identity_type,
            identity_number,
            email: email.into().trim().to_string(),
            phone: normalize_phone(phone),
            status,
            kyc_tier: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn phone_key(&self) -> String {
        normalize_phone(&self.phone)
    }

    /// Public view disclosed on duplicate or existence checks.
    pub fn public_info(&self) -> ExistingAccountInfo {
        ExistingAccountInfo {
            account_number: self.account_number.clone(),
            email: mask_email(&self.email),
            phone: mask_phone(&self.phone),
            kyc_tier: self.kyc_tier,
            created_at: self.created_at,
        }
    }
}

/// Enough of an existing account to let its owner recognise it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAccountInfo {
    pub account_number: AccountNumber,
    pub email: String,
    pub phone: String,
    pub kyc_tier: u8,
    pub created_at: DateTime<Utc>,
}
