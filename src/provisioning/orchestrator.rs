use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::account::normalize_phone;
use crate::domain::{
    Account, AccountStatus, EvidenceSet, ExistingAccountInfo, IdentityNumber, IdentityRecord,
    IdentityType, Recommendation,
};
use crate::ledger::{AccountLedger, DuplicateField, InsertOutcome, TierUpdate};
use crate::observability::metrics::{self, TimingGuard};
use crate::registry::{
    mask_by_access_level, BvnDisclosure, LookupError, NinDisclosure, RegistryAdapter,
};
use crate::scoring::{compute_score, recommend, GeoFence, LocationVerdict, TrustFactors};
use crate::tier::{TierDefinition, TierTable, UpgradeGating};

use super::account_number;
use super::error::ProvisionError;

/// Raw account-creation input as submitted by the applicant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountApplication {
    pub identity_type: Option<String>,
    pub identity_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub face_verified: bool,
    pub documents_uploaded: bool,
}

/// An application that passed input validation.
#[derive(Debug, Clone)]
struct ValidApplication {
    identity_type: IdentityType,
    identity_number: IdentityNumber,
    first_name: String,
    last_name: String,
    dob: NaiveDate,
    email: String,
    phone: String,
    address: Option<String>,
    coordinates: Option<(f64, f64)>,
    face_verified: bool,
    documents_uploaded: bool,
}

/// Applicant details echoed back after provisioning, identity masked.
#[derive(Debug, Clone)]
pub struct ApplicantSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub dob: NaiveDate,
    pub identity_type: IdentityType,
    pub identity_number: String,
}

#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    pub attempt_id: Uuid,
    pub account: Account,
    pub trust_score: Decimal,
    pub recommendation: Recommendation,
    pub tier: TierDefinition,
    pub applicant: ApplicantSummary,
}

/// Result of a successful identity check.
#[derive(Debug, Clone)]
pub enum VerifiedIdentity {
    Nin(NinDisclosure),
    Bvn(BvnDisclosure),
}

#[derive(Debug, Clone)]
pub struct TrustAssessment {
    pub trust_score: Decimal,
    pub recommendation: Recommendation,
    pub factors: TrustFactors,
}

/// Input to a tier upgrade. With an identity number the account's stored
/// tier is authoritative and the result is persisted.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    pub identity_number: Option<String>,
    pub current_tier: Option<u8>,
    pub target_tier: Option<u8>,
    pub evidence: EvidenceSet,
}

#[derive(Debug, Clone)]
pub struct TierUpgrade {
    pub previous_tier: u8,
    pub tier: TierDefinition,
    pub persisted: bool,
    pub upgraded_at: DateTime<Utc>,
}

/// Runs verification, scoring and account provisioning.
#[derive(Clone)]
pub struct Provisioner {
    registry: RegistryAdapter,
    ledger: AccountLedger,
    tiers: Arc<TierTable>,
    geofence: GeoFence,
    gating: UpgradeGating,
}

impl Provisioner {
    pub fn new(registry: RegistryAdapter, ledger: AccountLedger, tiers: Arc<TierTable>) -> Self {
        Provisioner {
            registry,
            ledger,
            tiers,
            geofence: GeoFence::default(),
            gating: UpgradeGating::default(),
        }
    }

    pub fn with_geofence(mut self, geofence: GeoFence) -> Self {
        self.geofence = geofence;
        self
    }

    pub fn with_gating(mut self, gating: UpgradeGating) -> Self {
        self.gating = gating;
        self
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn registry(&self) -> &RegistryAdapter {
        &self.registry
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub async fn verify_nin(&self, nin: Option<&str>) -> Result<NinDisclosure, ProvisionError> {
        let nin = parse_identity_number(nin, "NIN")?;

        match self.registry.lookup(IdentityType::Nin, &nin).await? {
            IdentityRecord::Nin(record) => Ok(mask_by_access_level(&record)),
            IdentityRecord::Bvn(_) => Err(ProvisionError::NotFound {
                identity_type: IdentityType::Nin,
            }),
        }
    }

    pub async fn verify_bvn(&self, bvn: Option<&str>) -> Result<BvnDisclosure, ProvisionError> {
        let bvn = parse_identity_number(bvn, "BVN")?;

        match self.registry.lookup(IdentityType::Bvn, &bvn).await? {
            IdentityRecord::Bvn(record) => Ok(BvnDisclosure::from(&record)),
            IdentityRecord::Nin(_) => Err(ProvisionError::NotFound {
                identity_type: IdentityType::Bvn,
            }),
        }
    }

    /// Dispatch to NIN or BVN verification by identity type.
    pub async fn verify_identity(
        &self,
        identity_type: Option<&str>,
        identity_number: Option<&str>,
    ) -> Result<VerifiedIdentity, ProvisionError> {
        let (Some(identity_type), Some(identity_number)) = (
            identity_type.filter(|s| !s.trim().is_empty()),
            identity_number.filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(ProvisionError::Validation(
                "Identity type and identity number are required.".to_string(),
            ));
        };

        let identity_type: IdentityType = identity_type
            .parse()
            .map_err(|e: crate::domain::identity::IdentityParseError| {
                ProvisionError::Validation(e.to_string())
            })?;

        match identity_type {
            IdentityType::Nin => self
                .verify_nin(Some(identity_number))
                .await
                .map(VerifiedIdentity::Nin),
            IdentityType::Bvn => self
                .verify_bvn(Some(identity_number))
                .await
                .map(VerifiedIdentity::Bvn),
        }
    }

    /// Check coordinates against the configured geofence.
    pub fn verify_location(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<LocationVerdict, ProvisionError> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(ProvisionError::Validation(
                "Latitude and longitude are required.".to_string(),
            ));
        };

        let verdict = self.geofence.check(latitude, longitude);
        metrics::record_location_check(verdict.within_bounds);

        Ok(verdict)
    }

    /// Public information about an existing account, if one exists.
    pub async fn check_existing(
        &self,
        identity_number: Option<&str>,
    ) -> Result<Option<ExistingAccountInfo>, ProvisionError> {
        let identity = parse_identity_number(identity_number, "Identity number")?;

        Ok(self
            .ledger
            .exists(&identity)
            .await?
            .map(|account| account.public_info()))
    }

    pub fn trust_score(&self, factors: &TrustFactors) -> TrustAssessment {
        let trust_score = compute_score(factors);
        TrustAssessment {
            trust_score,
            recommendation: recommend(trust_score),
            factors: *factors,
        }
    }

    /// Verify an applicant and open their account.
    ///
    /// The ledger insert is the only mutation; every failure is detected
    /// before it.
    pub async fn create_account(
        &self,
        application: AccountApplication,
    ) -> Result<ProvisionedAccount, ProvisionError> {
        let timer = TimingGuard::new();
        let attempt_id = Uuid::new_v4();

        let result = self.provision(attempt_id, application).await;

        match &result {
            Ok(provisioned) => metrics::record_provisioning(provisioned.account.status.as_str()),
            Err(e) => {
                debug!(
                    attempt = %attempt_id,
                    code = e.code(),
                    latency_ms = timer.elapsed_ms(),
                    "Provisioning rejected"
                );
                metrics::record_provisioning(e.code());
            }
        }

        result
    }

    async fn provision(
        &self,
        attempt_id: Uuid,
        application: AccountApplication,
    ) -> Result<ProvisionedAccount, ProvisionError> {
        let app = validate_application(application)?;

        if let Some(existing) = self.ledger.exists(&app.identity_number).await? {
            return Err(duplicate(DuplicateField::Identity, &existing));
        }
        if let Some(existing) = self.ledger.exists_by_email(&app.email).await? {
            return Err(duplicate(DuplicateField::Email, &existing));
        }
        if let Some(existing) = self.ledger.exists_by_phone(&app.phone).await? {
            return Err(duplicate(DuplicateField::Phone, &existing));
        }

        let record = self
            .registry
            .lookup(app.identity_type, &app.identity_number)
            .await
            .map_err(|e| match e {
                LookupError::Unavailable => ProvisionError::RegistryUnavailable,
                other => ProvisionError::IdentityVerificationFailed {
                    reason: other.to_string(),
                },
            })?;

        let dob = record.dob().unwrap_or(app.dob);
        let number = account_number::generate(dob, &app.identity_number);

        let gps_valid = app
            .coordinates
            .is_some_and(|(lat, lng)| self.geofence.contains(lat, lng));
        let factors = TrustFactors {
            nin_verified: record.identity_type() == IdentityType::Nin,
            bvn_verified: record.identity_type() == IdentityType::Bvn,
            address_verified: app.address.is_some() && gps_valid,
            face_matched: app.face_verified,
            gps_valid,
            documents_complete: app.documents_uploaded,
        };
        let trust_score = compute_score(&factors);
        let recommendation = recommend(trust_score);
        let status: AccountStatus = recommendation.account_status();

        let tier = self
            .tiers
            .tier_info(1)
            .cloned()
            .ok_or(ProvisionError::TierNotFound(1))?;

        let account = Account::new(
            number,
            app.identity_type,
            app.identity_number.clone(),
            app.email.clone(),
            &app.phone,
            status,
        );

        match self.ledger.insert_unique(&account).await? {
            InsertOutcome::Inserted => {}
            InsertOutcome::Conflict {
                field: DuplicateField::AccountNumber,
                ..
            } => {
                warn!(
                    attempt = %attempt_id,
                    identity = %app.identity_number.masked(),
                    "Generated account number already issued"
                );
                return Err(ProvisionError::AccountNumberCollision);
            }
            InsertOutcome::Conflict { field, existing } => {
                return Err(duplicate(field, &existing));
            }
        }

        info!(
            attempt = %attempt_id,
            account_number = %account.account_number,
            identity_type = %app.identity_type,
            identity = %app.identity_number.masked(),
            status = %account.status,
            trust_score = %trust_score,
            "Account created"
        );

        Ok(ProvisionedAccount {
            attempt_id,
            applicant: ApplicantSummary {
                first_name: app.first_name,
                last_name: app.last_name,
                email: account.email.clone(),
                phone: account.phone.clone(),
                address: app.address,
                dob: app.dob,
                identity_type: app.identity_type,
                identity_number: app.identity_number.masked(),
            },
            account,
            trust_score,
            recommendation,
            tier,
        })
    }

    /// Move an account, or a hypothetical one at `current_tier`, to a higher
    /// tier if the evidence allows.
    pub async fn upgrade_tier(&self, request: UpgradeRequest) -> Result<TierUpgrade, ProvisionError> {
        let result = self.evaluate_upgrade(request).await;

        match &result {
            Ok(_) => metrics::record_tier_upgrade("granted"),
            Err(e) => metrics::record_tier_upgrade(e.code()),
        }

        result
    }

    async fn evaluate_upgrade(&self, request: UpgradeRequest) -> Result<TierUpgrade, ProvisionError> {
        let identity = match request.identity_number.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                Some(parse_identity_number(Some(raw), "Identity number")?)
            }
            _ => None,
        };

        let (current, tier, persisted) = match &identity {
            Some(identity) => {
                let (current, tier) = self.upgrade_stored(identity, &request).await?;
                (current, tier, true)
            }
            None => {
                let current = request.current_tier.ok_or_else(tiers_required)?;
                let target = request.target_tier.ok_or_else(tiers_required)?;
                let tier = self
                    .tiers
                    .upgrade(current, target, &request.evidence, self.gating)?
                    .clone();
                (current, tier, false)
            }
        };

        info!(
            from = current,
            to = tier.tier,
            persisted,
            "KYC tier upgraded"
        );

        Ok(TierUpgrade {
            previous_tier: current,
            tier,
            persisted,
            upgraded_at: Utc::now(),
        })
    }

    /// Gate and persist an upgrade against the stored tier. The write only
    /// lands if the tier is unchanged since it was read; otherwise the
    /// request is gated again against the newer tier.
    async fn upgrade_stored(
        &self,
        identity: &IdentityNumber,
        request: &UpgradeRequest,
    ) -> Result<(u8, TierDefinition), ProvisionError> {
        let account = self
            .ledger
            .exists(identity)
            .await?
            .ok_or(ProvisionError::AccountNotFound)?;
        if request.current_tier.is_some_and(|t| t != account.kyc_tier) {
            debug!(
                identity = %identity.masked(),
                claimed = request.current_tier,
                stored = account.kyc_tier,
                "Ignoring claimed current tier"
            );
        }

        let target = request.target_tier.ok_or_else(tiers_required)?;
        let mut current = account.kyc_tier;

        loop {
            let tier = self
                .tiers
                .upgrade(current, target, &request.evidence, self.gating)?
                .clone();

            match self.ledger.set_tier(identity, current, tier.tier).await? {
                TierUpdate::Updated(_) => return Ok((current, tier)),
                TierUpdate::Stale(stored) => {
                    debug!(
                        identity = %identity.masked(),
                        expected = current,
                        stored,
                        "Tier changed during upgrade, re-evaluating"
                    );
                    current = stored;
                }
                TierUpdate::Missing => return Err(ProvisionError::AccountNotFound),
            }
        }
    }
}

fn tiers_required() -> ProvisionError {
    ProvisionError::Validation("Current tier and target tier are required.".to_string())
}

fn duplicate(field: DuplicateField, existing: &Account) -> ProvisionError {
    ProvisionError::DuplicateAccount {
        field,
        existing: Box::new(existing.public_info()),
    }
}

fn parse_identity_number(raw: Option<&str>, label: &str) -> Result<IdentityNumber, ProvisionError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        ProvisionError::Validation(format!("{} is required.", label))
    })?;

    IdentityNumber::parse(raw)
        .map_err(|_| ProvisionError::Validation(format!("{} must be exactly 11 digits.", label)))
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn validate_application(app: AccountApplication) -> Result<ValidApplication, ProvisionError> {
    let required = [
        ("identityType", &app.identity_type),
        ("identityNumber", &app.identity_number),
        ("firstName", &app.first_name),
        ("lastName", &app.last_name),
        ("dob", &app.dob),
        ("email", &app.email),
        ("phone", &app.phone),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ProvisionError::Validation(format!(
            "Missing required fields for account creation: {}.",
            missing.join(", ")
        )));
    }

    let identity_type: IdentityType = present(&app.identity_type)
        .unwrap_or_default()
        .parse()
        .map_err(|e: crate::domain::identity::IdentityParseError| {
            ProvisionError::Validation(e.to_string())
        })?;
    let identity_number =
        parse_identity_number(app.identity_number.as_deref(), "Identity number")?;

    let dob = NaiveDate::parse_from_str(present(&app.dob).unwrap_or_default(), "%Y-%m-%d")
        .map_err(|_| {
            ProvisionError::Validation("Date of birth must be in YYYY-MM-DD format.".to_string())
        })?;

    let email = present(&app.email).unwrap_or_default().to_string();
    if !email.contains('@') {
        return Err(ProvisionError::Validation(
            "Email address is invalid.".to_string(),
        ));
    }

    let phone = normalize_phone(present(&app.phone).unwrap_or_default());
    if phone.is_empty() {
        return Err(ProvisionError::Validation(
            "Phone number is invalid.".to_string(),
        ));
    }

    let coordinates = match (app.latitude, app.longitude) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };

    Ok(ValidApplication {
        identity_type,
        identity_number,
        first_name: present(&app.first_name).unwrap_or_default().to_string(),
        last_name: present(&app.last_name).unwrap_or_default().to_string(),
        dob,
        email,
        phone,
        address: present(&app.address).map(str::to_string),
        coordinates,
        face_verified: app.face_verified,
        documents_uploaded: app.documents_uploaded,
    })
}

/// Provisioner over the bundled demo registry and an empty in-memory ledger.
#[cfg(test)]
pub(crate) fn demo_provisioner() -> Provisioner {
    Provisioner::new(
        RegistryAdapter::new(
            Arc::new(crate::registry::loader::demo_registry()),
            std::time::Duration::from_millis(500),
        ),
        AccountLedger::in_memory(),
        Arc::new(TierTable::standard()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aisha() -> AccountApplication {
        AccountApplication {
            identity_type: Some("NIN".to_string()),
            identity_number: Some("12345678901".to_string()),
            first_name: Some("Aisha".to_string()),
            last_name: Some("Mohammed".to_string()),
            dob: Some("1995-03-15".to_string()),
            email: Some("aisha@example.com".to_string()),
            phone: Some("08012345678".to_string()),
            address: Some("123 Main St, Ikeja, Lagos".to_string()),
            latitude: Some(6.6),
            longitude: Some(3.35),
            face_verified: true,
            documents_uploaded: true,
        }
    }

    #[tokio::test]
    async fn test_full_nin_application_is_activated() {
        let provisioner = demo_provisioner();

        let provisioned = provisioner.create_account(aisha()).await.unwrap();

        assert_eq!(provisioned.account.account_number.as_str(), "428901950315");
        assert_eq!(provisioned.account.status, AccountStatus::Active);
        assert_eq!(provisioned.account.kyc_tier, 1);
        assert_eq!(provisioned.trust_score, Decimal::new(80, 2));
        assert_eq!(provisioned.recommendation, Recommendation::AutoApprove);
        assert_eq!(provisioned.tier.name, "Basic");
        assert_eq!(provisioned.applicant.identity_number, "***8901");
        assert_eq!(provisioner.ledger().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_registry_dob_takes_precedence() {
        let provisioner = demo_provisioner();
        let mut application = aisha();
        application.dob = Some("2000-01-01".to_string());

        let provisioned = provisioner.create_account(application).await.unwrap();

        assert_eq!(provisioned.account.account_number.as_str(), "428901950315");
        assert_eq!(
            provisioned.applicant.dob,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_weak_application_goes_to_review() {
        let provisioner = demo_provisioner();
        let application = AccountApplication {
            latitude: None,
            longitude: None,
            face_verified: false,
            ..aisha()
        };

        let provisioned = provisioner.create_account(application).await.unwrap();

        // Only the NIN factor holds
        assert_eq!(provisioned.trust_score, Decimal::new(35, 2));
        assert_eq!(provisioned.account.status, AccountStatus::PendingReview);
        assert_eq!(
            provisioned.recommendation,
            Recommendation::AdditionalVerification
        );
    }

    #[tokio::test]
    async fn test_location_outside_fence_drops_gps_and_address() {
        let provisioner = demo_provisioner();
        let application = AccountApplication {
            latitude: Some(51.5),
            longitude: Some(-0.12),
            ..aisha()
        };

        let provisioned = provisioner.create_account(application).await.unwrap();

        assert_eq!(provisioned.trust_score, Decimal::new(55, 2));
        assert_eq!(provisioned.account.status, AccountStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_bvn_path() {
        let provisioner = demo_provisioner();
        let application = AccountApplication {
            identity_type: Some("BVN".to_string()),
            identity_number: Some("22345678901".to_string()),
            first_name: Some("Kessy".to_string()),
            last_name: Some("Umeh".to_string()),
            dob: Some("1990-08-12".to_string()),
            email: Some("kessy@example.com".to_string()),
            phone: Some("08022222222".to_string()),
            ..aisha()
        };

        let provisioned = provisioner.create_account(application).await.unwrap();

        assert_eq!(provisioned.trust_score, Decimal::new(75, 2));
        assert_eq!(provisioned.account.status, AccountStatus::Active);
        assert_eq!(provisioned.account.account_number.as_str(), "428901900812");
        assert_eq!(provisioned.account.identity_type, IdentityType::Bvn);
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let provisioner = demo_provisioner();

        let missing = AccountApplication {
            first_name: None,
            dob: Some("  ".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(missing).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("firstName, dob"));

        for bad in [
            AccountApplication {
                identity_number: Some("1234".to_string()),
                ..aisha()
            },
            AccountApplication {
                identity_type: Some("passport".to_string()),
                ..aisha()
            },
            AccountApplication {
                dob: Some("15/03/1995".to_string()),
                ..aisha()
            },
            AccountApplication {
                email: Some("aisha.example.com".to_string()),
                ..aisha()
            },
            AccountApplication {
                phone: Some(" - ( ) ".to_string()),
                ..aisha()
            },
        ] {
            let err = provisioner.create_account(bad).await.unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }

        assert_eq!(provisioner.ledger().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unverifiable_identities_are_rejected() {
        let provisioner = demo_provisioner();

        let inactive = AccountApplication {
            identity_number: Some("45678901234".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(inactive).await.unwrap_err();
        assert_eq!(err.code(), "IDENTITY_VERIFICATION_FAILED");

        let unknown = AccountApplication {
            identity_number: Some("99999999999".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(unknown).await.unwrap_err();
        match err {
            ProvisionError::IdentityVerificationFailed { reason } => {
                assert!(reason.contains("not found"));
            }
            other => panic!("expected verification failure, got {:?}", other),
        }

        assert_eq!(provisioner.ledger().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected_per_field() {
        let provisioner = demo_provisioner();
        provisioner.create_account(aisha()).await.unwrap();

        let same_identity = AccountApplication {
            email: Some("other@example.com".to_string()),
            phone: Some("08099999999".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(same_identity).await.unwrap_err();
        match &err {
            ProvisionError::DuplicateAccount { field, existing } => {
                assert_eq!(*field, DuplicateField::Identity);
                assert_eq!(existing.account_number.as_str(), "428901950315");
                assert_eq!(existing.email, "ai***@example.com");
                assert_eq!(existing.phone, "*******5678");
            }
            other => panic!("expected duplicate, got {:?}", other),
        }

        let same_email = AccountApplication {
            identity_number: Some("23456789012".to_string()),
            email: Some(" AISHA@example.com".to_string()),
            phone: Some("08099999999".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(same_email).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::DuplicateAccount {
                field: DuplicateField::Email,
                ..
            }
        ));

        let same_phone = AccountApplication {
            identity_number: Some("23456789012".to_string()),
            email: Some("emeka@example.com".to_string()),
            phone: Some("0801 234 5678".to_string()),
            ..aisha()
        };
        let err = provisioner.create_account(same_phone).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::DuplicateAccount {
                field: DuplicateField::Phone,
                ..
            }
        ));

        assert_eq!(provisioner.ledger().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_account_number_collision() {
        let provisioner = demo_provisioner();

        // Occupy the number Aisha's application will generate
        let squatter = Account::new(
            crate::domain::AccountNumber("428901950315".to_string()),
            IdentityType::Nin,
            IdentityNumber::parse("77777778901").unwrap(),
            "squatter@example.com",
            "08077777777",
            AccountStatus::Active,
        );
        provisioner.ledger().store(&squatter).await.unwrap();

        let err = provisioner.create_account(aisha()).await.unwrap_err();

        assert_eq!(err.code(), "ACCOUNT_NUMBER_CONFLICT");
        assert_eq!(provisioner.ledger().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applications_create_one_account() {
        let provisioner = demo_provisioner();

        let mut handles = Vec::new();
        for i in 0..16 {
            let provisioner = provisioner.clone();
            let application = AccountApplication {
                email: Some(format!("aisha{}@example.com", i)),
                phone: Some(format!("080000000{:02}", i)),
                ..aisha()
            };
            handles.push(tokio::spawn(async move {
                provisioner.create_account(application).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e.code(), "DUPLICATE_ACCOUNT"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(provisioner.ledger().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shared_email_creates_one_account() {
        let provisioner = demo_provisioner();
        let identities = ["12345678901", "23456789012", "34567890123", "56789012345"];

        let mut handles = Vec::new();
        for (i, nin) in identities.iter().enumerate() {
            let provisioner = provisioner.clone();
            let application = AccountApplication {
                identity_number: Some(nin.to_string()),
                email: Some("shared@example.com".to_string()),
                phone: Some(format!("0810000000{}", i)),
                ..aisha()
            };
            handles.push(tokio::spawn(async move {
                provisioner.create_account(application).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_verify_operations() {
        let provisioner = demo_provisioner();

        let nin = provisioner.verify_nin(Some("12345678901")).await.unwrap();
        assert_eq!(nin.demographics.dob, "****-**-**");

        let err = provisioner.verify_nin(Some("45678901234")).await.unwrap_err();
        assert_eq!(err.code(), "IDENTITY_INACTIVE");

        let err = provisioner.verify_nin(None).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = provisioner.verify_bvn(Some("99999999999")).await.unwrap_err();
        assert_eq!(err.code(), "IDENTITY_NOT_FOUND");

        match provisioner
            .verify_identity(Some("bvn"), Some("62345678901"))
            .await
            .unwrap()
        {
            VerifiedIdentity::Bvn(bvn) => assert_eq!(bvn.bank_name, "Zenith Bank"),
            other => panic!("expected BVN, got {:?}", other),
        }

        let err = provisioner
            .verify_identity(Some("passport"), Some("62345678901"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_verify_location() {
        let provisioner = demo_provisioner();

        let inside = provisioner.verify_location(Some(9.07), Some(7.49)).unwrap();
        assert!(inside.within_bounds);

        let outside = provisioner.verify_location(Some(0.0), Some(0.0)).unwrap();
        assert!(!outside.within_bounds);
        assert_eq!(outside.trust_score_impact, Decimal::new(-10, 2));

        assert!(provisioner.verify_location(Some(9.07), None).is_err());
    }

    #[tokio::test]
    async fn test_check_existing() {
        let provisioner = demo_provisioner();

        assert!(provisioner
            .check_existing(Some("12345678901"))
            .await
            .unwrap()
            .is_none());

        provisioner.create_account(aisha()).await.unwrap();

        let info = provisioner
            .check_existing(Some("12345678901"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.account_number.as_str(), "428901950315");
        assert_eq!(info.kyc_tier, 1);
    }

    #[tokio::test]
    async fn test_upgrade_persists_for_known_account() {
        let provisioner = demo_provisioner();
        provisioner.create_account(aisha()).await.unwrap();

        let upgrade = provisioner
            .upgrade_tier(UpgradeRequest {
                identity_number: Some("12345678901".to_string()),
                // Claimed tier is ignored in favour of the stored one
                current_tier: Some(3),
                target_tier: Some(2),
                evidence: EvidenceSet {
                    utility_bill: true,
                    id_card: true,
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(upgrade.previous_tier, 1);
        assert_eq!(upgrade.tier.tier, 2);
        assert!(upgrade.persisted);

        let info = provisioner
            .check_existing(Some("12345678901"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.kyc_tier, 2);

        // The stored tier now blocks a repeat
        let err = provisioner
            .upgrade_tier(UpgradeRequest {
                identity_number: Some("12345678901".to_string()),
                target_tier: Some(2),
                evidence: EvidenceSet::complete(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NON_PROGRESSIVE_UPGRADE");
    }

    /// Memory store whose reads lag, widening the gap between reading an
    /// account's tier and writing the new one.
    struct SlowReadStore(crate::ledger::MemoryAccountStore);

    #[async_trait::async_trait]
    impl crate::ledger::AccountStore for SlowReadStore {
        async fn get(&self, identity: &IdentityNumber) -> anyhow::Result<Option<Account>> {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            self.0.get(identity).await
        }
        async fn find_by_email(&self, email_key: &str) -> anyhow::Result<Option<Account>> {
            self.0.find_by_email(email_key).await
        }
        async fn find_by_phone(&self, phone_key: &str) -> anyhow::Result<Option<Account>> {
            self.0.find_by_phone(phone_key).await
        }
        async fn find_by_account_number(
            &self,
            number: &crate::domain::AccountNumber,
        ) -> anyhow::Result<Option<Account>> {
            self.0.find_by_account_number(number).await
        }
        async fn set(&self, account: &Account) -> anyhow::Result<()> {
            self.0.set(account).await
        }
        async fn delete(&self, identity: &IdentityNumber) -> anyhow::Result<bool> {
            self.0.delete(identity).await
        }
        async fn compare_and_insert(&self, account: &Account) -> anyhow::Result<InsertOutcome> {
            self.0.compare_and_insert(account).await
        }
        async fn compare_and_set_tier(
            &self,
            identity: &IdentityNumber,
            expected: u8,
            tier: u8,
        ) -> anyhow::Result<TierUpdate> {
            self.0.compare_and_set_tier(identity, expected, tier).await
        }
        async fn count(&self) -> anyhow::Result<usize> {
            self.0.count().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upgrades_never_lower_the_tier() {
        for _ in 0..4 {
            let provisioner = Provisioner::new(
                RegistryAdapter::new(
                    Arc::new(crate::registry::loader::demo_registry()),
                    std::time::Duration::from_millis(500),
                ),
                AccountLedger::new(Arc::new(SlowReadStore(
                    crate::ledger::MemoryAccountStore::new(),
                ))),
                Arc::new(TierTable::standard()),
            );
            provisioner.create_account(aisha()).await.unwrap();

            let upgrade_to = |target: u8| {
                let provisioner = provisioner.clone();
                tokio::spawn(async move {
                    provisioner
                        .upgrade_tier(UpgradeRequest {
                            identity_number: Some("12345678901".to_string()),
                            target_tier: Some(target),
                            evidence: EvidenceSet::complete(),
                            ..Default::default()
                        })
                        .await
                })
            };
            let to_three = upgrade_to(3);
            let to_two = upgrade_to(2);

            let to_three = to_three.await.unwrap().unwrap();
            assert_eq!(to_three.tier.tier, 3);

            // Tier 2 either landed first or lost to tier 3 and was re-gated
            match to_two.await.unwrap() {
                Ok(upgrade) => {
                    assert_eq!(upgrade.previous_tier, 1);
                    assert_eq!(to_three.previous_tier, 2);
                }
                Err(e) => {
                    assert_eq!(e.code(), "NON_PROGRESSIVE_UPGRADE");
                    assert_eq!(to_three.previous_tier, 1);
                }
            }

            let info = provisioner
                .check_existing(Some("12345678901"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(info.kyc_tier, 3);
        }
    }

    #[tokio::test]
    async fn test_stateless_upgrade_and_errors() {
        let provisioner = demo_provisioner();

        let upgrade = provisioner
            .upgrade_tier(UpgradeRequest {
                current_tier: Some(1),
                target_tier: Some(3),
                evidence: EvidenceSet {
                    proof_of_address: true,
                    bank_statement: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(upgrade.tier.name, "Premium");
        assert!(!upgrade.persisted);

        let err = provisioner
            .upgrade_tier(UpgradeRequest {
                target_tier: Some(2),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = provisioner
            .upgrade_tier(UpgradeRequest {
                identity_number: Some("23456789012".to_string()),
                target_tier: Some(2),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");

        let err = provisioner
            .upgrade_tier(UpgradeRequest {
                current_tier: Some(1),
                target_tier: Some(2),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.missing_documents().map(|m| m.len()),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_cumulative_gating() {
        let provisioner = demo_provisioner().with_gating(UpgradeGating::Cumulative);

        let err = provisioner
            .upgrade_tier(UpgradeRequest {
                current_tier: Some(1),
                target_tier: Some(3),
                evidence: EvidenceSet {
                    proof_of_address: true,
                    bank_statement: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "MISSING_EVIDENCE");
    }

    #[test]
    fn test_trust_score_assessment() {
        let provisioner = demo_provisioner();
        let assessment = provisioner.trust_score(&TrustFactors {
            nin_verified: true,
            face_matched: true,
            gps_valid: true,
            ..Default::default()
        });

        assert_eq!(assessment.trust_score, Decimal::new(55, 2));
        assert_eq!(assessment.recommendation, Recommendation::ManualReview);
    }
}
