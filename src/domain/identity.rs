use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of digits in a NIN or BVN.
pub const IDENTITY_NUMBER_LEN: usize = 11;

/// Errors raised while parsing identity input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("identity number must be exactly {IDENTITY_NUMBER_LEN} digits")]
    InvalidNumber,

    #[error("unknown identity type '{0}', expected NIN or BVN")]
    UnknownType(String),
}

/// Kind of identity credential presented by an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityType {
    /// National Identification Number
    #[serde(rename = "NIN")]
    Nin,
    /// Bank Verification Number
    #[serde(rename = "BVN")]
    Bvn,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Nin => "NIN",
            IdentityType::Bvn => "BVN",
        }
    }
}

impl FromStr for IdentityType {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NIN" => Ok(IdentityType::Nin),
            "BVN" => Ok(IdentityType::Bvn),
            _ => Err(IdentityParseError::UnknownType(s.to_string())),
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An 11-digit NIN or BVN.
///
/// Construction goes through [`IdentityNumber::parse`], so holding one is
/// proof that the format check already passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityNumber(String);

impl IdentityNumber {
    /// Parse an identity number, rejecting anything but 11 ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, IdentityParseError> {
        let raw = raw.trim();
        if raw.len() != IDENTITY_NUMBER_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentityParseError::InvalidNumber);
        }
        Ok(IdentityNumber(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing four digits, used in account numbers and masked output.
    pub fn last4(&self) -> &str {
        &self.0[IDENTITY_NUMBER_LEN - 4..]
    }

    /// Masked form safe for logs and responses (`***8901`).
    pub fn masked(&self) -> String {
        format!("***{}", self.last4())
    }
}

impl TryFrom<String> for IdentityNumber {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        IdentityNumber::parse(&value)
    }
}

impl From<IdentityNumber> for String {
    fn from(value: IdentityNumber) -> Self {
        value.0
    }
}

impl fmt::Display for IdentityNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry status of a NIN record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

/// Sensitivity tier of a NIN record (1-5), controls disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AccessLevel(u8);

impl AccessLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(AccessLevel(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AccessLevel::new(value).ok_or_else(|| {
            format!(
                "access level {} outside {}..={}",
                value,
                AccessLevel::MIN,
                AccessLevel::MAX
            )
        })
    }
}

impl From<AccessLevel> for u8 {
    fn from(value: AccessLevel) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Demographic block of a NIN record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    pub sex: Sex,
    pub nationality: String,
    #[serde(default)]
    pub place_of_birth: String,
    #[serde(default)]
    pub current_address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub residential_lga: String,
    pub residential_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub fingerprint_status: String,
    #[serde(default)]
    pub face_photo_url: String,
    #[serde(default)]
    pub signature: String,
}

/// Electronic ID card details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EIdDetails {
    #[serde(default)]
    pub card_number: String,
    pub status: String,
    #[serde(default)]
    pub issue_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Low,
    Medium,
    High,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Low => "low",
            DataQuality::Medium => "medium",
            DataQuality::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolmentMetadata {
    pub centre: String,
    pub timestamp: String,
    pub data_quality: DataQuality,
}

/// Reference record held by the national identity registrar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NinRecord {
    pub nin: IdentityNumber,
    pub access_level: AccessLevel,
    pub status: RecordStatus,
    pub demographics: Demographics,
    pub biometrics: Biometrics,
    pub e_id_details: EIdDetails,
    pub enrolment_metadata: EnrolmentMetadata,
}

impl NinRecord {
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Reference record held by the bank verification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BvnRecord {
    pub bvn: IdentityNumber,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub phone_number: String,
    pub bank_name: String,
    /// Linked bank account. Never disclosed outside the registry adapter.
    #[serde(default)]
    pub account_number: String,
}

/// A verified identity, tagged by credential type.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityRecord {
    Nin(NinRecord),
    Bvn(BvnRecord),
}

impl IdentityRecord {
    pub fn identity_type(&self) -> IdentityType {
        match self {
            IdentityRecord::Nin(_) => IdentityType::Nin,
            IdentityRecord::Bvn(_) => IdentityType::Bvn,
        }
    }

    pub fn number(&self) -> &IdentityNumber {
        match self {
            IdentityRecord::Nin(r) => &r.nin,
            IdentityRecord::Bvn(r) => &r.bvn,
        }
    }

    /// Date of birth held by the registry, if it has one.
    pub fn dob(&self) -> Option<NaiveDate> {
        match self {
            IdentityRecord::Nin(r) => r.demographics.dob,
            IdentityRecord::Bvn(r) => r.dob,
        }
    }
}
