use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A supporting document an applicant can upload for a tier upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    UtilityBill,
    IdCard,
    ProofOfAddress,
    BankStatement,
}

impl DocumentKind {
    /// Label shown to the applicant when the document is missing.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::UtilityBill => "Utility bill",
            DocumentKind::IdCard => "ID card",
            DocumentKind::ProofOfAddress => "Proof of address",
            DocumentKind::BankStatement => "Bank statement",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ordered list of missing documents; rarely more than four.
pub type MissingDocuments = SmallVec<[DocumentKind; 4]>;

/// Documents supplied with an upgrade request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvidenceSet {
    pub utility_bill: bool,
    pub id_card: bool,
    pub proof_of_address: bool,
    pub bank_statement: bool,
}

impl EvidenceSet {
    /// Evidence set with every document present.
    pub fn complete() -> Self {
        EvidenceSet {
            utility_bill: true,
            id_card: true,
            proof_of_address: true,
            bank_statement: true,
        }
    }

    pub fn has(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::UtilityBill => self.utility_bill,
            DocumentKind::IdCard => self.id_card,
            DocumentKind::ProofOfAddress => self.proof_of_address,
            DocumentKind::BankStatement => self.bank_statement,
        }
    }

    /// Documents from `required` that this set does not contain, in order.
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a DocumentKind>) -> MissingDocuments {
        let mut missing = MissingDocuments::new();
        for kind in required {
            if !self.has(*kind) && !missing.contains(kind) {
                missing.push(*kind);
            }
        }
        missing
    }
}
