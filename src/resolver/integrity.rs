//! Cross-collection referential integrity checks.
//!
//! The store has no foreign keys, so case mutations verify references at
//! write time. Checks are read-only and fail safe: an identifier that
//! cannot be parsed into the store's id representation simply "does not
//! exist" — a malformed id is a failed validation, never a process fault.

use thiserror::Error;
use uuid::Uuid;

use crate::db::{DocumentStore, Filter, StoreError};

/// A violated referential invariant. Distinct from [`StoreError`] so the
/// boundary layer can map domain errors and infrastructure faults to
/// different outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("Referenced patient does not exist")]
    UnknownPatient,

    #[error("Case id already exists for this patient")]
    DuplicateCaseNo,

    #[error("Referenced surgeon does not exist")]
    UnknownSurgeon,

    #[error("Referenced first assist does not exist")]
    UnknownFirstAssist,

    #[error("Field '{0}' is required and cannot be removed")]
    RequiredField(String),
}

#[derive(Clone)]
pub struct IntegrityChecker {
    store: DocumentStore,
}

impl IntegrityChecker {
    pub fn new(store: DocumentStore) -> Self {
        IntegrityChecker { store }
    }

    /// True iff a document with this id exists in the named collection.
    pub async fn exists_by_id(&self, id: &str, collection: &str) -> Result<bool, StoreError> {
        // Normalize to the canonical id form; unparseable ids cannot match.
        let Ok(parsed) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let filter = Filter::eq("_id", parsed.to_string());
        Ok(self.store.collection(collection).count(&filter)? > 0)
    }

    /// True iff a case with this (case_no, patient_id) pair already exists.
    /// The patient id is compared in its canonical spelling, the same way
    /// [`Self::exists_by_id`] matches.
    pub async fn case_no_taken(
        &self,
        case_no: i64,
        patient_id: &str,
        collection: &str,
    ) -> Result<bool, StoreError> {
        let filter = Filter::and(vec![
            Filter::eq("case_no", case_no),
            Filter::eq("patient_id", canonical_id(patient_id)),
        ]);
        Ok(self.store.collection(collection).count(&filter)? > 0)
    }
}

/// Canonical spelling of a store id. Unparseable input is returned as-is;
/// it cannot match a store-generated id anyway.
pub fn canonical_id(id: &str) -> String {
    Uuid::parse_str(id)
        .map(|parsed| parsed.to_string())
        .unwrap_or_else(|_| id.to_string())
}
