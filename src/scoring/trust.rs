use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::Recommendation;

/// Independent verification signals feeding the trust score.
///
/// Absent fields deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustFactors {
    pub nin_verified: bool,
    pub bvn_verified: bool,
    pub address_verified: bool,
    pub face_matched: bool,
    pub gps_valid: bool,
    pub documents_complete: bool,
}

/// Weight of each factor in the trust score.
#[derive(Debug, Clone, Copy)]
pub struct TrustWeights {
    pub nin_verified: Decimal,
    pub bvn_verified: Decimal,
    pub address_verified: Decimal,
    pub face_matched: Decimal,
    pub gps_valid: Decimal,
    pub documents_complete: Decimal,
}

/// The canonical rubric. Weights sum past 1.0 only if both NIN and BVN are
/// verified, which a single application never does; no renormalization.
pub const RUBRIC: TrustWeights = TrustWeights {
    nin_verified: Decimal::from_parts(25, 0, 0, false, 2),
    bvn_verified: Decimal::from_parts(20, 0, 0, false, 2),
    address_verified: Decimal::from_parts(15, 0, 0, false, 2),
    face_matched: Decimal::from_parts(20, 0, 0, false, 2),
    gps_valid: Decimal::from_parts(10, 0, 0, false, 2),
    documents_complete: Decimal::from_parts(10, 0, 0, false, 2),
};

/// Scores strictly above this are auto-approved.
pub const AUTO_APPROVE_THRESHOLD: Decimal = Decimal::from_parts(70, 0, 0, false, 2);

/// Scores strictly above this (and not auto-approved) go to manual review.
pub const MANUAL_REVIEW_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Compute the trust score for a set of factors.
///
/// Result is in [0, 1], rounded to 2 decimal places half-up.
pub fn compute_score(factors: &TrustFactors) -> Decimal {
    let w = &RUBRIC;
    let mut score = Decimal::ZERO;

    if factors.nin_verified {
        score += w.nin_verified;
    }
    if factors.bvn_verified {
        score += w.bvn_verified;
    }
    if factors.address_verified {
        score += w.address_verified;
    }
    if factors.face_matched {
        score += w.face_matched;
    }
    if factors.gps_valid {
        score += w.gps_valid;
    }
    if factors.documents_complete {
        score += w.documents_complete;
    }

    score
        .min(Decimal::ONE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Map a trust score to a recommendation.
pub fn recommend(score: Decimal) -> Recommendation {
    if score > AUTO_APPROVE_THRESHOLD {
        Recommendation::AutoApprove
    } else if score > MANUAL_REVIEW_THRESHOLD {
        Recommendation::ManualReview
    } else {
        Recommendation::AdditionalVerification
    }
}
