pub mod account;
pub mod decision;
pub mod evidence;
pub mod identity;

pub use account::{Account, AccountNumber, ExistingAccountInfo};
pub use decision::{AccountStatus, Recommendation};
pub use evidence::{DocumentKind, EvidenceSet, MissingDocuments};
pub use identity::{
    AccessLevel, BvnRecord, IdentityNumber, IdentityRecord, IdentityType, NinRecord, RecordStatus, Sex,
};
