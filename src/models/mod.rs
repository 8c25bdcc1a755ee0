//! Entity records stored in the document store, plus their insert inputs.
//!
//! Records double as GraphQL output/input objects. Serde names are the
//! stored document field names; GraphQL exposes them as camelCase.

use async_graphql::{InputObject, SimpleObject};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Collection names, one per entity family.
pub const PATIENTS: &str = "patients";
pub const DOCTORS: &str = "doctors";
pub const CASES: &str = "cases";
pub const ACCOUNTS: &str = "accounts";
pub const REFRESH_TOKENS: &str = "refresh_tokens";
pub const REVOKED_TOKENS: &str = "revoked_tokens";

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Patient {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub firstname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    pub birthdate: NaiveDate,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, InputObject)]
pub struct PatientInput {
    pub name: String,
    pub firstname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    pub birthdate: NaiveDate,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Doctor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub firstname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, InputObject)]
pub struct DoctorInput {
    pub name: String,
    pub firstname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    pub specialization: String,
}

/// A surgical case. `case_no` is caller-supplied and unique per patient;
/// `patient_id` must reference an existing patient, `surgeon_id` and
/// `first_assist_id` (when present) existing doctors. The store does not
/// enforce any of this — the case resolver does.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct Case {
    #[serde(rename = "_id")]
    pub id: String,
    pub case_no: i64,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surgeon_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_assist_id: Option<String>,
    pub pre_diagnosis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biopsy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, InputObject)]
pub struct CaseInput {
    pub case_no: i64,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surgeon_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_assist_id: Option<String>,
    pub pre_diagnosis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biopsy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

/// A credential record. `username`/`password_hash` stay unset until
/// credentials are attached, so an account can exist before it can log in.
/// Never exposed through GraphQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub name: String,
    pub firstname: String,
}
