use serde::Serialize;

use crate::domain::{BvnRecord, NinRecord, RecordStatus, Sex};

const HIDDEN: &str = "***";
const HIDDEN_DOB: &str = "****-**-**";
const RESTRICTED: &str = "restricted";
const MASKED_PHONE: &str = "Masked";
const MASKED_ADDRESS: &str = "Masked Address";
const NOT_AVAILABLE: &str = "not_available";

/// Demographic fields as disclosed over the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsView {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub dob: String,
    pub sex: Sex,
    pub nationality: String,
    pub place_of_birth: String,
    pub current_address: String,
    pub phone_number: String,
    pub residential_lga: String,
    pub residential_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricsView {
    pub fingerprint_status: String,
    pub face_photo_url: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EIdView {
    pub card_number: String,
    pub status: String,
    pub issue_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolmentView {
    pub centre: String,
    pub timestamp: String,
    pub data_quality: String,
}

/// A NIN record with fields hidden according to its access level.
///
/// This is the only form of NIN data that leaves the registry adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NinDisclosure {
    pub nin: String,
    pub access_level: u8,
    pub status: RecordStatus,
    pub demographics: DemographicsView,
    pub biometrics: BiometricsView,
    pub e_id_details: EIdView,
    pub enrolment_metadata: EnrolmentView,
}

/// Build the disclosure for a record.
///
/// Level 1 exposes names, sex, nationality, state and enrolment data only.
/// Level 2 exposes demographics with the phone and address masked and no
/// biometrics. Level 3 and above expose everything.
pub fn mask_by_access_level(record: &NinRecord) -> NinDisclosure {
    let mut view = full_disclosure(record);

    match record.access_level.get() {
        1 => {
            let d = &mut view.demographics;
            d.middle_name = String::new();
            d.dob = HIDDEN_DOB.to_string();
            d.place_of_birth = HIDDEN.to_string();
            d.current_address = HIDDEN.to_string();
            d.phone_number = HIDDEN.to_string();
            d.residential_lga = HIDDEN.to_string();

            view.biometrics = BiometricsView {
                fingerprint_status: RESTRICTED.to_string(),
                face_photo_url: String::new(),
                signature: String::new(),
            };
            view.e_id_details = EIdView {
                card_number: String::new(),
                status: RESTRICTED.to_string(),
                issue_date: String::new(),
            };
        }
        2 => {
            view.demographics.phone_number = MASKED_PHONE.to_string();
            view.demographics.current_address = MASKED_ADDRESS.to_string();
            view.biometrics = BiometricsView {
                fingerprint_status: NOT_AVAILABLE.to_string(),
                face_photo_url: String::new(),
                signature: String::new(),
            };
        }
        _ => {}
    }

    view
}

/// A BVN record without its linked bank account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BvnDisclosure {
    pub bvn: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub phone_number: String,
    pub bank_name: String,
}

impl From<&BvnRecord> for BvnDisclosure {
    fn from(record: &BvnRecord) -> Self {
        BvnDisclosure {
            bvn: record.bvn.to_string(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            dob: record
                .dob
                .map(|dob| dob.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            phone_number: record.phone_number.clone(),
            bank_name: record.bank_name.clone(),
        }
    }
}

fn full_disclosure(record: &NinRecord) -> NinDisclosure {
    let d = &record.demographics;
    let e = &record.enrolment_metadata;

    NinDisclosure {
        nin: record.nin.to_string(),
        access_level: record.access_level.get(),
        status: record.status,
        demographics: DemographicsView {
            first_name: d.first_name.clone(),
            middle_name: d.middle_name.clone(),
            last_name: d.last_name.clone(),
            dob: d
                .dob
                .map(|dob| dob.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            sex: d.sex,
            nationality: d.nationality.clone(),
            place_of_birth: d.place_of_birth.clone(),
            current_address: d.current_address.clone(),
            phone_number: d.phone_number.clone(),
            residential_lga: d.residential_lga.clone(),
            residential_state: d.residential_state.clone(),
        },
        biometrics: BiometricsView {
            fingerprint_status: record.biometrics.fingerprint_status.clone(),
            face_photo_url: record.biometrics.face_photo_url.clone(),
            signature: record.biometrics.signature.clone(),
        },
        e_id_details: EIdView {
            card_number: record.e_id_details.card_number.clone(),
            status: record.e_id_details.status.clone(),
            issue_date: record.e_id_details.issue_date.clone(),
        },
        enrolment_metadata: EnrolmentView {
            centre: e.centre.clone(),
            timestamp: e.timestamp.clone(),
            data_quality: e.data_quality.as_str().to_string(),
        },
    }
}
